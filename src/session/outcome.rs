use chess::Color;

use crate::game::utils::parse_color;
use crate::models::game_state::{ActiveGame, EndReason, GameResult, Outcome, RatingChange};
use crate::models::messages::GameEndedData;

/// Which side the server's winner field names.
///
/// The server may send a color or a player id.
fn winner_color(winner: &str, game: &ActiveGame, user_id: Option<&str>) -> Option<Color> {
    if let Some(color) = parse_color(winner) {
        return Some(color);
    }
    if user_id == Some(winner) {
        return Some(game.color);
    }
    if game.white_id.as_deref() == Some(winner) {
        return Some(Color::White);
    }
    if game.black_id.as_deref() == Some(winner) {
        return Some(Color::Black);
    }
    None
}

pub fn result_message(outcome: Outcome, reason: &EndReason) -> String {
    let text = match (outcome, reason) {
        (Outcome::Victory, EndReason::Checkmate) => "You won by checkmate!",
        (Outcome::Victory, EndReason::Resignation) => "Opponent resigned!",
        (Outcome::Victory, EndReason::Timeout) => "You won on time!",
        (Outcome::Victory, _) => "You won the game!",
        (Outcome::Defeat, EndReason::Checkmate) => "You lost by checkmate",
        (Outcome::Defeat, EndReason::Resignation) => "You resigned",
        (Outcome::Defeat, EndReason::Timeout) => "You lost on time",
        (Outcome::Defeat, _) => "You lost the game",
        (Outcome::Draw, EndReason::Agreement) => "Draw by agreement",
        (Outcome::Draw, EndReason::Stalemate) => "Draw by stalemate",
        (Outcome::Draw, EndReason::InsufficientMaterial) => "Draw by insufficient material",
        (Outcome::Draw, EndReason::FiftyMove) => "Draw by fifty-move rule",
        (Outcome::Draw, EndReason::Repetition) => "Draw by threefold repetition",
        (Outcome::Draw, _) => "The game ended in a draw",
        (Outcome::Aborted, _) => "Game aborted",
    };
    text.to_string()
}

/// Classify a `game_ended` event from the local player's point of view
pub fn classify(game: &ActiveGame, user_id: Option<&str>, data: &GameEndedData) -> GameResult {
    let reason = EndReason::parse(&data.reason);

    let outcome = if reason == EndReason::Aborted {
        Outcome::Aborted
    } else if reason.is_draw() {
        Outcome::Draw
    } else {
        match data.winner.as_deref() {
            None => Outcome::Draw,
            Some(winner) => match winner_color(winner, game, user_id) {
                Some(color) if color == game.color => Outcome::Victory,
                _ => Outcome::Defeat,
            },
        }
    };

    let (new_rating, delta) = match game.color {
        Color::White => (data.white_rating, data.white_rating_change),
        Color::Black => (data.black_rating, data.black_rating_change),
    };

    GameResult {
        outcome,
        message: result_message(outcome, &reason),
        reason,
        rating: delta.map(|delta| RatingChange { new_rating, delta }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::ChessClock;
    use crate::game::reconcile::{MoveLog, Tracked};
    use crate::game::rules::START_FEN;
    use crate::models::game_state::DrawNegotiation;
    use crate::models::messages::PlayerDetails;

    fn game(color: Color) -> ActiveGame {
        ActiveGame {
            game_id: "g1".to_string(),
            color,
            white_id: Some("alice".to_string()),
            black_id: Some("bob".to_string()),
            position: Tracked::Confirmed(START_FEN.to_string()),
            moves: MoveLog::default(),
            base_ply: Some(0),
            clock: ChessClock::new(600, 600),
            opponent: PlayerDetails {
                name: "Opponent".to_string(),
                rating: 1500,
            },
            draw: DrawNegotiation::default(),
            pending_ack: None,
            error: None,
            notice: None,
        }
    }

    fn ended(winner: Option<&str>, reason: &str) -> GameEndedData {
        GameEndedData {
            winner: winner.map(str::to_string),
            reason: reason.to_string(),
            white_rating: Some(1512),
            black_rating: Some(1488),
            white_rating_change: Some(12),
            black_rating_change: Some(-12),
        }
    }

    #[test]
    fn null_winner_agreement_is_a_draw() {
        let result = classify(&game(Color::White), Some("alice"), &ended(None, "agreement"));
        assert_eq!(result.outcome, Outcome::Draw);
        assert_eq!(result.message, "Draw by agreement");
    }

    #[test]
    fn winner_by_user_id() {
        let result = classify(&game(Color::White), Some("alice"), &ended(Some("alice"), "checkmate"));
        assert_eq!(result.outcome, Outcome::Victory);
        assert_eq!(result.message, "You won by checkmate!");
        assert_eq!(
            result.rating,
            Some(RatingChange {
                new_rating: Some(1512),
                delta: 12
            })
        );
    }

    #[test]
    fn winner_by_color_name() {
        let result = classify(&game(Color::Black), Some("bob"), &ended(Some("white"), "timeout"));
        assert_eq!(result.outcome, Outcome::Defeat);
        assert_eq!(result.message, "You lost on time");
        assert_eq!(result.rating.map(|r| r.delta), Some(-12));
    }

    #[test]
    fn winner_by_opponent_id() {
        let result = classify(&game(Color::Black), None, &ended(Some("alice"), "resignation"));
        assert_eq!(result.outcome, Outcome::Defeat);
        assert_eq!(result.message, "You resigned");
    }

    #[test]
    fn drawn_reason_overrides_winner_field() {
        let result = classify(&game(Color::White), None, &ended(Some("white"), "stalemate"));
        assert_eq!(result.outcome, Outcome::Draw);
        assert_eq!(result.message, "Draw by stalemate");
    }

    #[test]
    fn aborted_game() {
        let result = classify(&game(Color::White), None, &ended(None, "aborted"));
        assert_eq!(result.outcome, Outcome::Aborted);
        assert_eq!(result.message, "Game aborted");
    }
}
