use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::ClientError;

/// How long a stored login stays valid
pub const LOGIN_TTL_HOURS: i64 = 24;

/// Logged-in identity handed to the gateway and the session
///
/// Passed explicitly to whoever needs it; there is no process-wide login.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: String,
    pub token: String,
    pub logged_in_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            logged_in_at: Utc::now(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.logged_in_at + Duration::hours(LOGIN_TTL_HOURS)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Login persisted on disk between runs
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the stored login if it exists and has not expired.
    /// An expired file is removed.
    pub fn load(&self) -> Result<Option<AuthSession>, ClientError> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Result<Option<AuthSession>, ClientError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: AuthSession = match serde_json::from_str(&text) {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding unreadable session file {}: {}", self.path.display(), e);
                self.clear()?;
                return Ok(None);
            }
        };

        if session.is_expired(now) {
            info!("Stored login for {} expired at {}", session.user_id, session.expires_at());
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub fn save(&self, session: &AuthSession) -> Result<(), ClientError> {
        let text = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, text)?;
        info!("Saved login for {} to {}", session.user_id, self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
