use chess::Color;

use crate::game::clock::ChessClock;
use crate::game::reconcile::{MoveLog, Tracked};
use crate::models::messages::PlayerDetails;

/// Where the matchmaking request currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchmakingStatus {
    Idle,
    Searching,
    Error(String),
}

/// Outstanding request for an opponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchmakingRequest {
    pub time_control: u32,
    pub elapsed: u32,
    pub status: MatchmakingStatus,
    /// Guards `find_game` so it goes out once per connection
    pub request_sent: bool,
}

impl MatchmakingRequest {
    pub fn new(time_control: u32) -> Self {
        Self {
            time_control,
            elapsed: 0,
            status: MatchmakingStatus::Idle,
            request_sent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawNegotiation {
    pub offered_by_me: bool,
    pub offered_by_opponent: bool,
}

impl DrawNegotiation {
    pub fn clear(&mut self) {
        self.offered_by_me = false;
        self.offered_by_opponent = false;
    }
}

/// Command waiting for the server to end the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAck {
    Resign,
    Abort,
}

/// A game in progress, as seen by this client
#[derive(Debug, Clone)]
pub struct ActiveGame {
    pub game_id: String,
    pub color: Color,
    pub white_id: Option<String>,
    pub black_id: Option<String>,
    pub position: Tracked<String>,
    pub moves: MoveLog,
    /// Ply of the position the move history starts from, when the FEN says
    pub base_ply: Option<u32>,
    pub clock: ChessClock,
    pub opponent: PlayerDetails,
    pub draw: DrawNegotiation,
    pub pending_ack: Option<PendingAck>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
    Draw,
    Aborted,
}

impl Outcome {
    pub fn title(&self) -> &'static str {
        match self {
            Outcome::Victory => "Victory!",
            Outcome::Defeat => "Defeat",
            Outcome::Draw => "Draw",
            Outcome::Aborted => "Game Over",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    Checkmate,
    Resignation,
    Timeout,
    Agreement,
    Stalemate,
    InsufficientMaterial,
    FiftyMove,
    Repetition,
    Aborted,
    Other(String),
}

impl EndReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "checkmate" => EndReason::Checkmate,
            "resignation" | "resign" => EndReason::Resignation,
            "timeout" => EndReason::Timeout,
            "agreement" => EndReason::Agreement,
            "stalemate" => EndReason::Stalemate,
            "insufficient-material" | "insufficient_material" | "insufficient" => {
                EndReason::InsufficientMaterial
            }
            "fifty-move" | "fifty_move" | "fifty" => EndReason::FiftyMove,
            "repetition" => EndReason::Repetition,
            "aborted" | "abort" => EndReason::Aborted,
            other => EndReason::Other(other.to_string()),
        }
    }

    /// Reasons that end the game without a winner
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            EndReason::Agreement
                | EndReason::Stalemate
                | EndReason::InsufficientMaterial
                | EndReason::FiftyMove
                | EndReason::Repetition
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingChange {
    pub new_rating: Option<u32>,
    pub delta: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub outcome: Outcome,
    pub reason: EndReason,
    pub message: String,
    pub rating: Option<RatingChange>,
}

/// Lifecycle of one session; only ever moves forward
#[derive(Debug, Clone)]
pub enum Phase {
    Matchmaking(MatchmakingRequest),
    Playing(ActiveGame),
    GameOver { game: ActiveGame, result: GameResult },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Matchmaking,
    Playing,
    GameOver,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Matchmaking(_) => PhaseKind::Matchmaking,
            Phase::Playing(_) => PhaseKind::Playing,
            Phase::GameOver { .. } => PhaseKind::GameOver,
        }
    }
}
