//! Thin adapter over the `chess` crate.
//!
//! The client never decides legality itself: every question about a position
//! is answered by `chess::Board`.

use chess::{Board, ChessMove, Color, Piece, Rank, Square};
use std::fmt;
use std::str::FromStr;

use crate::error::MoveRejection;
use crate::game::notation;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A legal move checked against a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub chess_move: ChessMove,
    pub san: String,
    pub fen_after: String,
}

/// Board position parsed from a server FEN
#[derive(Clone)]
pub struct Position {
    board: Board,
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self.board)
    }
}

impl Position {
    pub fn from_fen(fen: &str) -> Option<Self> {
        Board::from_str(fen).ok().map(|board| Self { board })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Color of the piece on `square`, if any
    pub fn owner_of(&self, square: Square) -> Option<Color> {
        self.board.color_on(square)
    }

    /// Validate and apply a move, rendering its notation.
    /// A pawn reaching the last rank promotes to a queen unless told otherwise.
    pub fn try_move(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Result<AppliedMove, MoveRejection> {
        let promotion = promotion.or_else(|| default_promotion(&self.board, from, to));
        let chess_move = ChessMove::new(from, to, promotion);
        if !self.board.legal(chess_move) {
            return Err(MoveRejection::Illegal);
        }

        let san = notation::san(&self.board, chess_move);
        let fen_after = self.board.make_move_new(chess_move).to_string();
        Ok(AppliedMove {
            chess_move,
            san,
            fen_after,
        })
    }
}

pub fn parse_square(name: &str) -> Result<Square, MoveRejection> {
    Square::from_str(&name.trim().to_lowercase()).map_err(|_| MoveRejection::InvalidSquare)
}

fn default_promotion(board: &Board, from: Square, to: Square) -> Option<Piece> {
    if board.piece_on(from) != Some(Piece::Pawn) {
        return None;
    }
    let last_rank = match board.color_on(from)? {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    if to.get_rank() == last_rank {
        Some(Piece::Queen)
    } else {
        None
    }
}
