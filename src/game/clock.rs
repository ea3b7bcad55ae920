use chess::Color;

/// Local prediction of both players' remaining time, in whole seconds.
///
/// Only the side to move is ticked. Server values overwrite both clocks
/// whenever they arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChessClock {
    white: u32,
    black: u32,
    /// Side whose zero-crossing has already been signalled
    flagged: Option<Color>,
}

impl ChessClock {
    pub fn new(white: u32, black: u32) -> Self {
        Self {
            white,
            black,
            flagged: None,
        }
    }

    pub fn remaining(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn resync(&mut self, white: u32, black: u32) {
        self.white = white;
        self.black = black;
        if let Some(color) = self.flagged {
            if self.remaining(color) > 0 {
                self.flagged = None;
            }
        }
    }

    /// Advance one second for `to_move`.
    ///
    /// Returns the side that ran out when the local player is the one who
    /// should report it, at most once per zero-crossing.
    pub fn tick(&mut self, to_move: Color, local: Color) -> Option<Color> {
        let remaining = match to_move {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        *remaining = remaining.saturating_sub(1);

        if *remaining == 0 && to_move != local && self.flagged != Some(to_move) {
            self.flagged = Some(to_move);
            return Some(to_move);
        }
        None
    }
}
