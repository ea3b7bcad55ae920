use chess::{Color, Piece};

/// Convert a chess color to a string
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Parse a color name as the server spells it
pub fn parse_color(name: &str) -> Option<Color> {
    match name.to_ascii_lowercase().as_str() {
        "white" | "w" => Some(Color::White),
        "black" | "b" => Some(Color::Black),
        _ => None,
    }
}

/// Render whole seconds as `m:ss`
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Side to move, read straight from the FEN fields
pub fn fen_side_to_move(fen: &str) -> Option<Color> {
    match fen.split_whitespace().nth(1)? {
        "w" => Some(Color::White),
        "b" => Some(Color::Black),
        _ => None,
    }
}

/// Number of half-moves played before this position, from the FEN move counter
pub fn fen_ply(fen: &str) -> Option<u32> {
    let side = fen_side_to_move(fen)?;
    let fullmove: u32 = fen.split_whitespace().nth(5)?.parse().ok()?;
    let base = fullmove.checked_sub(1)? * 2;
    Some(match side {
        Color::White => base,
        Color::Black => base + 1,
    })
}

pub fn parse_promotion(piece: &str) -> Option<Piece> {
    match piece.to_ascii_lowercase().as_str() {
        "q" | "queen" => Some(Piece::Queen),
        "r" | "rook" => Some(Piece::Rook),
        "b" | "bishop" => Some(Piece::Bishop),
        "n" | "knight" => Some(Piece::Knight),
        _ => None,
    }
}

pub fn promotion_to_string(piece: Piece) -> String {
    match piece {
        Piece::Queen => "q",
        Piece::Rook => "r",
        Piece::Bishop => "b",
        Piece::Knight => "n",
        Piece::Pawn => "p",
        Piece::King => "k",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_clock_with_padded_seconds() {
        assert_eq!(format_clock(600), "10:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(0), "0:00");
    }

    #[test]
    fn reads_ply_from_fen() {
        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let after_e4 = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let after_e4_e5 = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
        assert_eq!(fen_ply(start), Some(0));
        assert_eq!(fen_ply(after_e4), Some(1));
        assert_eq!(fen_ply(after_e4_e5), Some(2));
        assert_eq!(fen_ply("not a fen"), None);
    }

    #[test]
    fn parses_colors_and_promotions() {
        assert_eq!(parse_color("White"), Some(Color::White));
        assert_eq!(parse_color("b"), Some(Color::Black));
        assert_eq!(parse_color("u123"), None);
        assert_eq!(parse_promotion("n"), Some(Piece::Knight));
        assert_eq!(parse_promotion("x"), None);
        assert_eq!(promotion_to_string(Piece::Queen), "q");
    }
}
