use cozy_chess::{Board, File, Move, Piece, Rank, Square};
use smallvec::SmallVec;

use crate::converters::{
    file_char, format_piece_upper, format_square, parse_file, parse_promotion, parse_rank,
    parse_square,
};
use crate::game::{has_legal_moves, legal_moves};

/// Parse Standard Algebraic Notation (SAN) move
///
/// Accepts the usual variations found in hand-typed notation: `0-0` castles,
/// a leading `P` on pawn moves, `:` or `-` in place of `x`, over-disambiguation
/// (`Ng1f3`), promotions with or without `=`, and trailing `+ # ! ?` or `e.p.`.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let core = strip_suffixes(san.trim());
    if core.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    match core {
        "O-O" | "0-0" => return find_castle(board, &legal, true, san),
        "O-O-O" | "0-0-0" => return find_castle(board, &legal, false, san),
        _ => {}
    }

    let pattern = SanPattern::parse(core).ok_or_else(|| SanError::InvalidFormat(san.to_string()))?;

    let candidates: SmallVec<[Move; 4]> = legal
        .iter()
        .copied()
        .filter(|&mv| pattern.matches(board, mv))
        .collect();

    match candidates.as_slice() {
        [] => Err(SanError::NoLegalMove(san.to_string())),
        [mv] => Ok(*mv),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

/// Format a move as SAN
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return crate::uci::format_uci_move(mv);
    };

    let mut san = if is_castle(board, mv) {
        if (mv.to.file() as usize) > (mv.from.file() as usize) {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        let capture = is_capture(board, mv);
        let mut s = String::new();
        if piece == Piece::Pawn {
            if capture {
                s.push(file_char(mv.from.file()));
            }
        } else {
            s.push(format_piece_upper(piece));
            s.push_str(&disambiguation(board, mv, piece));
        }
        if capture {
            s.push('x');
        }
        s.push_str(&format_square(mv.to));
        if let Some(promo) = mv.promotion {
            s.push('=');
            s.push(format_piece_upper(promo));
        }
        s
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if has_legal_moves(&after) { '+' } else { '#' });
    }
    san
}

/// Shape of a non-castling SAN move, with every optional part left open.
#[derive(Debug)]
struct SanPattern {
    piece: Piece,
    from_file: Option<File>,
    from_rank: Option<Rank>,
    capture: bool,
    to: Square,
    promotion: Option<Piece>,
}

impl SanPattern {
    fn parse(core: &str) -> Option<Self> {
        let bytes = core.as_bytes();
        let (piece, mut rest) = match bytes.first()? {
            b'N' => (Piece::Knight, &bytes[1..]),
            b'B' => (Piece::Bishop, &bytes[1..]),
            b'R' => (Piece::Rook, &bytes[1..]),
            b'Q' => (Piece::Queen, &bytes[1..]),
            b'K' => (Piece::King, &bytes[1..]),
            b'P' => (Piece::Pawn, &bytes[1..]),
            _ => (Piece::Pawn, bytes),
        };

        let mut promotion = None;
        if piece == Piece::Pawn {
            match rest {
                [head @ .., b'=', p] => {
                    promotion = Some(parse_promotion(*p)?);
                    rest = head;
                }
                [head @ .., b'1'..=b'8', p] if *p != b'b' && parse_promotion(*p).is_some() => {
                    promotion = parse_promotion(*p);
                    rest = &rest[..head.len() + 1];
                }
                _ => {}
            }
        }

        if rest.len() < 2 {
            return None;
        }
        let (body, dest) = rest.split_at(rest.len() - 2);
        let to = parse_square(std::str::from_utf8(dest).ok()?)?;

        let mut from_file = None;
        let mut from_rank = None;
        let mut capture = false;
        for &c in body {
            match c {
                b'x' | b':' => capture = true,
                b'-' => {}
                b'a'..=b'h' if from_file.is_none() && from_rank.is_none() => {
                    from_file = parse_file(c)
                }
                b'1'..=b'8' if from_rank.is_none() => from_rank = parse_rank(c),
                _ => return None,
            }
        }

        Some(Self {
            piece,
            from_file,
            from_rank,
            capture,
            to,
            promotion,
        })
    }

    fn matches(&self, board: &Board, mv: Move) -> bool {
        if board.piece_on(mv.from) != Some(self.piece) || mv.to != self.to {
            return false;
        }
        if is_castle(board, mv) || mv.promotion != self.promotion {
            return false;
        }
        if self.from_file.is_some_and(|f| mv.from.file() != f) {
            return false;
        }
        if self.from_rank.is_some_and(|r| mv.from.rank() != r) {
            return false;
        }
        // A pawn move without a source file never changes file.
        if self.piece == Piece::Pawn && self.from_file.is_none() && mv.from.file() != mv.to.file()
        {
            return false;
        }
        !self.capture || is_capture(board, mv)
    }
}

fn strip_suffixes(mut s: &str) -> &str {
    loop {
        let trimmed = s
            .trim_end_matches(['+', '#', '!', '?'])
            .trim_end();
        let trimmed = trimmed.strip_suffix("e.p.").unwrap_or(trimmed).trim_end();
        if trimmed.len() == s.len() {
            return trimmed;
        }
        s = trimmed;
    }
}

fn find_castle(board: &Board, legal: &[Move], kingside: bool, san: &str) -> Result<Move, SanError> {
    legal
        .iter()
        .copied()
        .find(|&mv| {
            is_castle(board, mv)
                && ((mv.to.file() as usize) > (mv.from.file() as usize)) == kingside
        })
        .ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

/// cozy-chess encodes castling as the king capturing its own rook.
fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

fn is_capture(board: &Board, mv: Move) -> bool {
    if is_castle(board, mv) {
        return false;
    }
    board.color_on(mv.to).is_some()
        || (board.piece_on(mv.from) == Some(Piece::Pawn) && mv.from.file() != mv.to.file())
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: SmallVec<[Square; 4]> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castle(board, *other)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let from = format_square(mv.from);
    if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        from[..1].to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        from[1..].to_string()
    } else {
        from
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    fn uci(mv: Move) -> String {
        crate::uci::format_uci_move(mv)
    }

    #[test]
    fn test_parse_simple_moves() {
        let start = Board::default();
        assert_eq!(uci(parse_san(&start, "e4").unwrap()), "e2e4");
        assert_eq!(uci(parse_san(&start, "Nf3").unwrap()), "g1f3");
        assert_eq!(uci(parse_san(&start, "Ng1-f3").unwrap()), "g1f3");
        assert_eq!(uci(parse_san(&start, "Pe4!?").unwrap()), "e2e4");
    }

    #[test]
    fn test_parse_rejects_illegal_and_garbage() {
        let start = Board::default();
        assert_eq!(
            parse_san(&start, "e5"),
            Err(SanError::NoLegalMove("e5".to_string()))
        );
        assert!(matches!(parse_san(&start, "Qh5"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&start, "hello"), Err(SanError::InvalidFormat(_))));
        assert!(matches!(parse_san(&start, "+"), Err(SanError::InvalidFormat(_))));
        // Capture marker on a quiet move
        assert!(matches!(parse_san(&start, "Nxf3"), Err(SanError::NoLegalMove(_))));
    }

    #[test]
    fn test_parse_castles() {
        let b = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(uci(parse_san(&b, "O-O").unwrap()), "e1h1");
        assert_eq!(uci(parse_san(&b, "0-0-0").unwrap()), "e1a1");
        assert!(parse_san(&Board::default(), "O-O").is_err());
    }

    #[test]
    fn test_parse_disambiguation() {
        // Knights on b1 and f1 both reach d2.
        let b = board("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        assert!(matches!(parse_san(&b, "Nd2"), Err(SanError::AmbiguousMove(_))));
        assert_eq!(uci(parse_san(&b, "Nbd2").unwrap()), "b1d2");
        assert_eq!(uci(parse_san(&b, "Nfd2").unwrap()), "f1d2");
    }

    #[test]
    fn test_parse_promotion_and_en_passant() {
        let b = board("8/4P3/8/8/8/8/k7/4K3 w - - 0 1");
        assert_eq!(uci(parse_san(&b, "e8=Q").unwrap()), "e7e8q");
        assert_eq!(uci(parse_san(&b, "e8N").unwrap()), "e7e8n");
        assert!(matches!(parse_san(&b, "e8"), Err(SanError::NoLegalMove(_))));

        let b = board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        assert_eq!(uci(parse_san(&b, "exd6").unwrap()), "e5d6");
        assert_eq!(uci(parse_san(&b, "exd6 e.p.").unwrap()), "e5d6");
    }

    #[test]
    fn test_format_san() {
        let start = Board::default();
        let nf3 = parse_san(&start, "Nf3").unwrap();
        assert_eq!(format_san(&start, nf3), "Nf3");

        let b = board("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        let mv = parse_san(&b, "Nbd2").unwrap();
        assert_eq!(format_san(&b, mv), "Nbd2");

        let b = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mv = parse_san(&b, "O-O-O").unwrap();
        assert_eq!(format_san(&b, mv), "O-O-O");

        let b = board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        let mv = parse_san(&b, "exd6").unwrap();
        assert_eq!(format_san(&b, mv), "exd6");
    }

    #[test]
    fn test_format_san_rank_disambiguation_and_mate() {
        // Rooks on a1 and a7 both reach a4.
        let b = board("4k3/R7/8/8/8/8/8/R3K3 w - - 0 1");
        let mv = parse_san(&b, "R1a4").unwrap();
        assert_eq!(format_san(&b, mv), "R1a4");

        let b = board("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        let mv = parse_san(&b, "Qh4").unwrap();
        assert_eq!(format_san(&b, mv), "Qh4#");
    }
}
