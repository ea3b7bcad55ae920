pub mod api;
pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod session;
pub mod websocket;

pub use config::ClientConfig;
pub use error::{ClientError, MoveRejection};
pub use session::{GameSessionActor, SessionMachine, SessionSnapshot};
