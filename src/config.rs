//! Client configuration loaded from environment variables.
//!
//! Every setting has a default suitable for a server running locally.

use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::session::actor::SessionTimings;
use crate::websocket::gateway::GatewayConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base HTTP address of the chess server.
    /// Env: `CHESS_SERVER_URL`
    /// Default: `http://127.0.0.1:8080`
    pub server_url: String,

    /// Seconds per side requested from matchmaking.
    /// Env: `CHESS_TIME_CONTROL`
    /// Default: `600`
    pub time_control: u32,

    /// How long to wait for the server to confirm a resign or abort.
    /// Env: `CHESS_ACK_TIMEOUT_SECS`
    /// Default: `10`
    pub ack_timeout: Duration,

    /// Env: `CHESS_RECONNECT_ATTEMPTS`
    /// Default: `5`
    pub reconnect_attempts: u32,

    /// Env: `CHESS_RECONNECT_DELAY_MS`
    /// Default: `2000`
    pub reconnect_delay: Duration,

    /// Where the stored login lives.
    /// Env: `CHESS_SESSION_FILE`
    /// Default: `./chess-session.json`
    pub session_file: PathBuf,

    /// Credentials used when no stored login is found.
    /// Env: `CHESS_USER_ID`, `CHESS_TOKEN`
    pub user_id: Option<String>,
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            time_control: 600,
            ack_timeout: Duration::from_secs(10),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(2000),
            session_file: PathBuf::from("./chess-session.json"),
            user_id: None,
            token: None,
        }
    }
}

fn parse_or_warn<T: FromStr>(name: &str, value: &str) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Invalid {}={:?}, using default", name, value);
            None
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key/value source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CHESS_SERVER_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.starts_with("http://") || url.starts_with("https://") {
                config.server_url = url;
            } else {
                warn!("Invalid CHESS_SERVER_URL={:?}, using default", url);
            }
        }

        if let Some(val) = lookup("CHESS_TIME_CONTROL") {
            match parse_or_warn::<u32>("CHESS_TIME_CONTROL", &val) {
                Some(0) => warn!("CHESS_TIME_CONTROL must be positive, using default"),
                Some(seconds) => config.time_control = seconds,
                None => {}
            }
        }

        if let Some(val) = lookup("CHESS_ACK_TIMEOUT_SECS") {
            if let Some(secs) = parse_or_warn::<u64>("CHESS_ACK_TIMEOUT_SECS", &val) {
                config.ack_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(val) = lookup("CHESS_RECONNECT_ATTEMPTS") {
            if let Some(n) = parse_or_warn("CHESS_RECONNECT_ATTEMPTS", &val) {
                config.reconnect_attempts = n;
            }
        }

        if let Some(val) = lookup("CHESS_RECONNECT_DELAY_MS") {
            if let Some(ms) = parse_or_warn::<u64>("CHESS_RECONNECT_DELAY_MS", &val) {
                config.reconnect_delay = Duration::from_millis(ms);
            }
        }

        if let Some(path) = lookup("CHESS_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }

        config.user_id = lookup("CHESS_USER_ID").filter(|id| !id.is_empty());
        config.token = lookup("CHESS_TOKEN").filter(|token| !token.is_empty());

        config
    }

    /// Socket endpoint derived from the HTTP base address
    pub fn ws_url(&self) -> String {
        let rest = if let Some(rest) = self.server_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.server_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.server_url.clone()
        };
        format!("{}/ws", rest)
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            url: self.ws_url(),
            reconnect_attempts: self.reconnect_attempts,
            reconnect_delay: self.reconnect_delay,
        }
    }

    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            ack_timeout: self.ack_timeout,
            ..SessionTimings::default()
        }
    }
}
