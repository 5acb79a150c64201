//! Text conversions between cozy-chess types and algebraic notation.

use cozy_chess::{Color, File, Piece, Rank, Square};

pub fn file_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub fn rank_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

/// Format a square as algebraic coordinates ("e4").
pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_char(sq.file()), rank_char(sq.rank()))
}

/// Lowercase piece letter, as used by UCI promotions.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

/// Uppercase piece letter, as used by SAN.
pub fn format_piece_upper(piece: Piece) -> char {
    format_piece(piece).to_ascii_uppercase()
}

pub fn format_color(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

pub fn parse_file(c: u8) -> Option<File> {
    match c {
        b'a'..=b'h' => Some(File::index((c - b'a') as usize)),
        _ => None,
    }
}

pub fn parse_rank(c: u8) -> Option<Rank> {
    match c {
        b'1'..=b'8' => Some(Rank::index((c - b'1') as usize)),
        _ => None,
    }
}

/// Parse algebraic coordinates ("e4") into a square.
pub fn parse_square(s: &str) -> Option<Square> {
    match s.as_bytes() {
        [f, r] => Some(Square::new(parse_file(*f)?, parse_rank(*r)?)),
        _ => None,
    }
}

/// Parse a promotion letter in either case. Pawns and kings are not promotion targets.
pub fn parse_promotion(c: u8) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        b'q' => Some(Piece::Queen),
        b'r' => Some(Piece::Rook),
        b'b' => Some(Piece::Bishop),
        b'n' => Some(Piece::Knight),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_round_trip() {
        let sq = parse_square("g7").unwrap();
        assert_eq!(sq, Square::new(File::G, Rank::Seventh));
        assert_eq!(format_square(sq), "g7");
    }

    #[test]
    fn test_parse_square_rejects_garbage() {
        assert_eq!(parse_square("i1"), None);
        assert_eq!(parse_square("a9"), None);
        assert_eq!(parse_square("a"), None);
        assert_eq!(parse_square("a1b"), None);
    }

    #[test]
    fn test_promotion_letters() {
        assert_eq!(parse_promotion(b'Q'), Some(Piece::Queen));
        assert_eq!(parse_promotion(b'n'), Some(Piece::Knight));
        assert_eq!(parse_promotion(b'k'), None);
        assert_eq!(format_piece_upper(Piece::Rook), 'R');
    }
}
