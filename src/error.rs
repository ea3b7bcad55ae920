use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("WebSocket connect failed: {0}")]
    Connect(String),

    #[error("WebSocket protocol error: {0}")]
    Protocol(String),

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Invalid response body: {0}")]
    Payload(String),

    #[error("Server returned status {0}")]
    Status(u16),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not logged in")]
    NotLoggedIn,
}

/// Why a local move was refused before reaching the server
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    #[error("No game in progress")]
    NotPlaying,

    #[error("Not a board square")]
    InvalidSquare,

    #[error("No piece at that square")]
    NoPiece,

    #[error("Not your piece")]
    NotYourPiece,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Illegal move")]
    Illegal,

    #[error("Current position could not be read")]
    UnreadablePosition,
}
