use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ClientError;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Ratings {
    pub standard: Option<u32>,
    pub blitz: Option<u32>,
    pub bullet: Option<u32>,
    pub rapid: Option<u32>,
    pub classical: Option<u32>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_games: u32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub rating: Ratings,
    #[serde(default)]
    pub stats: GameStats,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordResult {
    pub winner: Option<String>,
    pub reason: Option<String>,
}

/// One finished game from the player's history
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_id: String,
    pub game_type: Option<String>,
    pub white_player: Option<String>,
    pub black_player: Option<String>,
    pub user_color: Option<String>,
    #[serde(default)]
    pub result: RecordResult,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Win,
    Loss,
    Draw,
}

impl GameRecord {
    pub fn outcome_for(&self, user_id: &str) -> RecordOutcome {
        match (&self.result.reason, &self.result.winner) {
            (Some(reason), _) if reason == "agreement" => RecordOutcome::Draw,
            (_, None) => RecordOutcome::Draw,
            (_, Some(winner)) if winner == user_id => RecordOutcome::Win,
            _ => RecordOutcome::Loss,
        }
    }
}

/// Newest first, at most `limit` records
pub fn recent(mut records: Vec<GameRecord>, limit: usize) -> Vec<GameRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(limit);
    records
}

#[derive(Deserialize)]
struct ProfileResponse {
    user: UserProfile,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    games: Vec<GameRecord>,
}

/// Read-only access to the account endpoints
pub struct ProfileClient {
    base_url: String,
    token: String,
    client: awc::Client,
}

impl ProfileClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            client: awc::Client::default(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut response = self
            .client
            .get(url.as_str())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Payload(e.to_string()))
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, ClientError> {
        let body: ProfileResponse = self.get_json(&format!("/api/auth/profile/{}", user_id)).await?;
        info!("Loaded profile for {}", body.user.name);
        Ok(body.user)
    }

    pub async fn fetch_history(&self, user_id: &str) -> Result<Vec<GameRecord>, ClientError> {
        let body: HistoryResponse = self.get_json(&format!("/api/game/history/{}", user_id)).await?;
        info!("Loaded {} past games", body.games.len());
        Ok(body.games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, winner: Option<&str>, reason: Option<&str>, created: &str) -> GameRecord {
        GameRecord {
            game_id: id.to_string(),
            game_type: Some("blitz".to_string()),
            white_player: None,
            black_player: None,
            user_color: Some("white".to_string()),
            result: RecordResult {
                winner: winner.map(str::to_string),
                reason: reason.map(str::to_string),
            },
            created_at: created.parse().ok(),
        }
    }

    #[test]
    fn parses_profile_body() {
        let body: ProfileResponse = serde_json::from_str(
            r#"{"user":{"_id":"u1","name":"alice","email":"a@b.c","gender":"Female",
                "rating":{"standard":1500,"blitz":1420},
                "stats":{"wins":3,"losses":1,"draws":2,"totalGames":6}}}"#,
        )
        .unwrap();
        assert_eq!(body.user.id, "u1");
        assert_eq!(body.user.rating.blitz, Some(1420));
        assert_eq!(body.user.rating.bullet, None);
        assert_eq!(body.user.stats.total_games, 6);
    }

    #[test]
    fn parses_history_body() {
        let body: HistoryResponse = serde_json::from_str(
            r#"{"games":[{"gameId":"g1","userColor":"black",
                "result":{"winner":null,"reason":"stalemate"},
                "createdAt":"2024-03-01T10:00:00Z","moves":40}]}"#,
        )
        .unwrap();
        assert_eq!(body.games.len(), 1);
        assert_eq!(body.games[0].outcome_for("u1"), RecordOutcome::Draw);
        assert!(body.games[0].created_at.is_some());
    }

    #[test]
    fn classifies_records() {
        assert_eq!(
            record("g", Some("u1"), Some("checkmate"), "").outcome_for("u1"),
            RecordOutcome::Win
        );
        assert_eq!(
            record("g", Some("u2"), Some("timeout"), "").outcome_for("u1"),
            RecordOutcome::Loss
        );
        assert_eq!(
            record("g", Some("u1"), Some("agreement"), "").outcome_for("u1"),
            RecordOutcome::Draw
        );
    }

    #[test]
    fn recent_sorts_newest_first() {
        let records = vec![
            record("old", None, None, "2024-01-01T00:00:00Z"),
            record("new", None, None, "2024-03-01T00:00:00Z"),
            record("mid", None, None, "2024-02-01T00:00:00Z"),
        ];
        let ids: Vec<String> = recent(records, 2).into_iter().map(|r| r.game_id).collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }
}
