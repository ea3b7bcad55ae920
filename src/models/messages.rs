use actix::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command sent from client to server
///
/// Serialized as `{"event": "<name>", "data": <payload>}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Time control in seconds per side
    FindGame(u32),
    CancelSearch,
    MakeMove(MovePayload),
    Resign(String),
    AbortGame(String),
    OfferDraw(String),
    AcceptDraw(String),
    DeclineDraw(String),
    Timeout(TimeoutPayload),
    LeaveGame(String),
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::FindGame(_) => "find_game",
            ClientCommand::CancelSearch => "cancel_search",
            ClientCommand::MakeMove(_) => "make_move",
            ClientCommand::Resign(_) => "resign",
            ClientCommand::AbortGame(_) => "abort_game",
            ClientCommand::OfferDraw(_) => "offer_draw",
            ClientCommand::AcceptDraw(_) => "accept_draw",
            ClientCommand::DeclineDraw(_) => "decline_draw",
            ClientCommand::Timeout(_) => "timeout",
            ClientCommand::LeaveGame(_) => "leave_game",
        }
    }
}

/// Move submitted by the local player
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub game_id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    pub client_move_id: Uuid,
}

/// Report that a side's clock ran out
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutPayload {
    pub game_id: String,
    pub color: String,
}

/// Event sent from server to client
#[derive(Serialize, Deserialize, Message, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[rtype(result = "()")]
pub enum ServerEvent {
    GameWaiting,
    GameStart(GameStartData),
    MoveMade(MoveMadeData),
    GameEnded(GameEndedData),
    MatchmakingError(String),
    DrawOffered,
    DrawDeclined,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::GameWaiting => "game_waiting",
            ServerEvent::GameStart(_) => "game_start",
            ServerEvent::MoveMade(_) => "move_made",
            ServerEvent::GameEnded(_) => "game_ended",
            ServerEvent::MatchmakingError(_) => "matchmaking_error",
            ServerEvent::DrawOffered => "draw_offered",
            ServerEvent::DrawDeclined => "draw_declined",
        }
    }
}

/// Display details for one side of a game
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlayerDetails {
    pub name: String,
    pub rating: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStartData {
    pub game_id: String,
    /// Player id of the white side
    #[serde(default)]
    pub white: Option<String>,
    /// Player id of the black side
    #[serde(default)]
    pub black: Option<String>,
    pub fen: String,
    #[serde(default)]
    pub moves: Vec<String>,
    pub is_white: bool,
    pub white_time: u32,
    pub black_time: u32,
    #[serde(default)]
    pub white_player_details: Option<PlayerDetails>,
    #[serde(default)]
    pub black_player_details: Option<PlayerDetails>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveMadeData {
    pub fen: String,
    pub san: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    pub white_time: u32,
    pub black_time: u32,
    /// Half-move index of this move, counted from the start of the game
    #[serde(default)]
    pub ply: Option<u32>,
    /// Echo of the id we attached to our own move
    #[serde(default)]
    pub client_move_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameEndedData {
    /// Winner as a color name or a player id; `None` for a draw
    #[serde(default)]
    pub winner: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub white_rating: Option<u32>,
    #[serde(default)]
    pub black_rating: Option<u32>,
    #[serde(default)]
    pub white_rating_change: Option<i32>,
    #[serde(default)]
    pub black_rating_change: Option<i32>,
}

/// Connection lifecycle reported by the transport gateway
#[derive(Message, Debug, Clone, PartialEq, Eq)]
#[rtype(result = "()")]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    ConnectError(String),
}

/// Encode a command as a single text frame
pub fn encode_command(command: &ClientCommand) -> Result<String, serde_json::Error> {
    serde_json::to_string(command)
}

/// Decode a text frame from the server
pub fn decode_event(text: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(text)
}
