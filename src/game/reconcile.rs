//! Predicted vs confirmed state.
//!
//! Local moves are applied immediately as predictions. The next
//! authoritative value from the server replaces them wholesale; nothing is
//! merged back.

use log::warn;
use uuid::Uuid;

/// A value the server owns, possibly shadowed by a local prediction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracked<T> {
    Confirmed(T),
    Predicted { confirmed: T, predicted: T },
}

impl<T: Default> Tracked<T> {
    /// What the player should see right now
    pub fn current(&self) -> &T {
        match self {
            Tracked::Confirmed(value) => value,
            Tracked::Predicted { predicted, .. } => predicted,
        }
    }

    pub fn confirmed(&self) -> &T {
        match self {
            Tracked::Confirmed(value) => value,
            Tracked::Predicted { confirmed, .. } => confirmed,
        }
    }

    pub fn is_predicted(&self) -> bool {
        matches!(self, Tracked::Predicted { .. })
    }

    pub fn predict(&mut self, value: T) {
        match self {
            Tracked::Confirmed(current) => {
                let confirmed = std::mem::take(current);
                *self = Tracked::Predicted {
                    confirmed,
                    predicted: value,
                };
            }
            Tracked::Predicted { predicted, .. } => *predicted = value,
        }
    }

    /// Server value wins, whatever was predicted
    pub fn confirm(&mut self, value: T) {
        *self = Tracked::Confirmed(value);
    }
}

/// How an authoritative move event identifies its slot in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKey {
    /// 1-based half-move index
    Ply(u32),
    /// Server echo of our pending move, matched by its client move id
    Next,
    /// Nothing better available: compare with the last recorded notation
    LastNotation,
}

/// What happened to the history when a server move arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Appended,
    Duplicate,
}

/// Optimistic move not yet echoed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub id: Uuid,
    pub san: String,
}

/// Move history: an append-only confirmed list plus at most one prediction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveLog {
    confirmed: Vec<String>,
    pending: Option<PendingMove>,
    /// Set once a FEN move counter disagreed with the recorded history
    counter_unreliable: bool,
}

impl MoveLog {
    pub fn from_confirmed(moves: Vec<String>) -> Self {
        Self {
            confirmed: moves,
            pending: None,
            counter_unreliable: false,
        }
    }

    /// Confirmed moves followed by the pending prediction, if any
    pub fn moves(&self) -> Vec<String> {
        let mut moves = self.confirmed.clone();
        if let Some(pending) = &self.pending {
            moves.push(pending.san.clone());
        }
        moves
    }

    pub fn confirmed(&self) -> &[String] {
        &self.confirmed
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn len(&self) -> usize {
        self.confirmed.len() + usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `id` names the pending prediction
    pub fn echoes_pending(&self, id: Uuid) -> bool {
        self.pending.as_ref().map(|p| p.id == id).unwrap_or(false)
    }

    /// Key for a move whose ply was read from a FEN move counter.
    ///
    /// The counter is only used while it agrees with the history: the next
    /// ply or beyond, or an earlier ply holding the same notation. The first
    /// disagreement (a stuck `0 1` counter, say) switches this log to
    /// last-notation comparison for the rest of the game.
    pub fn counter_key(&mut self, ply: u32, san: &str) -> MoveKey {
        if self.counter_unreliable {
            return MoveKey::LastNotation;
        }
        let index = ply as usize;
        if index > self.confirmed.len() {
            return MoveKey::Ply(ply);
        }
        if index > 0 && self.confirmed[index - 1] == san {
            return MoveKey::Ply(ply);
        }
        warn!(
            "FEN move counter says ply {} for {} but history holds {}; comparing notation instead",
            ply,
            san,
            self.confirmed.len()
        );
        self.counter_unreliable = true;
        MoveKey::LastNotation
    }

    pub fn predict(&mut self, id: Uuid, san: String) {
        self.pending = Some(PendingMove { id, san });
    }

    /// Record an authoritative move.
    ///
    /// Any pending prediction is resolved: either this move is its echo, or
    /// the server has moved on without it.
    pub fn confirm(&mut self, san: &str, key: MoveKey) -> Applied {
        let pending = self.pending.take();

        match key {
            MoveKey::Ply(ply) => {
                let ply = ply as usize;
                if ply <= self.confirmed.len() {
                    return Applied::Duplicate;
                }
                if ply > self.confirmed.len() + 1 {
                    warn!(
                        "Move {} arrived at ply {} but history holds {}; appending",
                        san,
                        ply,
                        self.confirmed.len()
                    );
                }
                self.confirmed.push(san.to_string());
                Applied::Appended
            }
            MoveKey::Next => {
                self.confirmed.push(san.to_string());
                Applied::Appended
            }
            MoveKey::LastNotation => {
                let echoes_pending = pending.as_ref().map(|p| p.san == san).unwrap_or(false);
                if !echoes_pending && self.confirmed.last().map(String::as_str) == Some(san) {
                    return Applied::Duplicate;
                }
                self.confirmed.push(san.to_string());
                Applied::Appended
            }
        }
    }
}
