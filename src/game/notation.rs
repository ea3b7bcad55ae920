use chess::{Board, BoardStatus, ChessMove, MoveGen, Piece, Square};

fn piece_letter(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "",
        Piece::Knight => "N",
        Piece::Bishop => "B",
        Piece::Rook => "R",
        Piece::Queen => "Q",
        Piece::King => "K",
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

/// Standard algebraic notation for a move that is legal on `board`
pub fn san(board: &Board, chess_move: ChessMove) -> String {
    let from = chess_move.get_source();
    let to = chess_move.get_dest();
    let piece = match board.piece_on(from) {
        Some(piece) => piece,
        None => return chess_move.to_string(),
    };

    let mut out = String::new();
    let file_distance = (from.get_file().to_index() as i32 - to.get_file().to_index() as i32).abs();

    if piece == Piece::King && file_distance == 2 {
        out.push_str(if to.get_file().to_index() > from.get_file().to_index() {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        // En passant lands on an empty square, so pawns capture whenever the file changes
        let is_capture = board.piece_on(to).is_some() || (piece == Piece::Pawn && file_distance != 0);

        if piece == Piece::Pawn {
            if is_capture {
                out.push(file_char(from));
            }
        } else {
            out.push_str(piece_letter(piece));
            out.push_str(&disambiguation(board, piece, from, to));
        }

        if is_capture {
            out.push('x');
        }
        out.push_str(&to.to_string());

        if let Some(promotion) = chess_move.get_promotion() {
            out.push('=');
            out.push_str(piece_letter(promotion));
        }
    }

    let after = board.make_move_new(chess_move);
    if after.status() == BoardStatus::Checkmate {
        out.push('#');
    } else if after.checkers().popcnt() > 0 {
        out.push('+');
    }
    out
}

fn disambiguation(board: &Board, piece: Piece, from: Square, to: Square) -> String {
    if piece == Piece::King {
        return String::new();
    }

    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|m| m.get_dest() == to && m.get_source() != from)
        .map(|m| m.get_source())
        .filter(|source| board.piece_on(*source) == Some(piece))
        .collect();

    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|s| s.get_file() != from.get_file()) {
        file_char(from).to_string()
    } else if rivals.iter().all(|s| s.get_rank() != from.get_rank()) {
        rank_char(from).to_string()
    } else {
        format!("{}{}", file_char(from), rank_char(from))
    }
}
