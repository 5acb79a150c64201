use cozy_chess::{Board, Color, Move, Piece, Square};
use serde::Serialize;

use crate::converters::{format_square, parse_square};
use crate::fen::{FenError, STANDARD_START_FEN};
use crate::pgn::san::{format_san, parse_san, SanError};
use crate::types::{PieceKind, PlayerSide};
use crate::uci::{convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, parse_uci_move};

/// Main game state wrapper around cozy-chess Board
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<MoveRecord>,
    /// Position hashes from the start position onwards, for repetition detection
    seen: Vec<u64>,
    pgn_tags: Vec<(String, String)>,
    start_position: StartPosition,
}

/// One ply of an accepted game history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    #[serde(skip)]
    pub mv: Move,
    pub san: String,
    pub from: String,
    pub to: String,
    pub promotion: Option<PieceKind>,
    /// FEN after this move
    pub fen: String,
}

/// Starting position of the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    Standard,
    Fen(String),
}

impl StartPosition {
    pub fn fen(&self) -> &str {
        match self {
            Self::Standard => STANDARD_START_FEN,
            Self::Fen(fen) => fen,
        }
    }

    pub fn board(&self) -> Result<Board, FenError> {
        match self {
            Self::Standard => Ok(Board::default()),
            Self::Fen(fen) => crate::fen::parse_fen(fen),
        }
    }
}

/// An ordered, validated move sequence together with the position it starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveList {
    pub start: StartPosition,
    pub moves: Vec<MoveRecord>,
}

impl MoveList {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// FEN after the last move, or the start position for an empty list.
    pub fn final_fen(&self) -> String {
        self.moves
            .last()
            .map(|m| m.fen.clone())
            .unwrap_or_else(|| self.start.fen().to_string())
    }

    /// Numbered labels as a move list shows them: `"1. e4"`, `"e5"`, `"2. Nf3"`.
    /// A list starting with Black opens with `"N... san"`.
    pub fn labels(&self) -> Vec<String> {
        let (mut number, mut side) = self
            .start
            .board()
            .map(|b| (b.fullmove_number() as u32, b.side_to_move()))
            .unwrap_or((1, Color::White));

        let mut labels = Vec::with_capacity(self.moves.len());
        for (i, record) in self.moves.iter().enumerate() {
            let label = match side {
                Color::White => format!("{}. {}", number, record.san),
                Color::Black if i == 0 => format!("{}... {}", number, record.san),
                Color::Black => record.san.clone(),
            };
            labels.push(label);
            if side == Color::Black {
                number += 1;
            }
            side = !side;
        }
        labels
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Checkmate { winner: PlayerSide },
    Stalemate,
    FiftyMoveRule,
    ThreefoldRepetition,
    InsufficientMaterial,
}

impl GameOutcome {
    pub fn is_draw(self) -> bool {
        !matches!(self, Self::Checkmate { .. })
    }

    pub fn result(self) -> GameResult {
        match self {
            Self::Checkmate {
                winner: PlayerSide::White,
            } => GameResult::WhiteWins,
            Self::Checkmate {
                winner: PlayerSide::Black,
            } => GameResult::BlackWins,
            _ => GameResult::Draw,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::Checkmate { .. } => "checkmate",
            Self::Stalemate => "stalemate",
            Self::FiftyMoveRule => "fifty-move rule",
            Self::ThreefoldRepetition => "threefold repetition",
            Self::InsufficientMaterial => "insufficient material",
        }
    }

    /// User-facing end-of-game message.
    pub fn message(self) -> String {
        match self {
            Self::Checkmate { winner } => format!("Checkmate! {} wins.", winner.title()),
            _ => "It's a draw!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameResult {
    /// PGN result token
    pub fn token(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
        }
    }
}

/// Lifecycle of a live game. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GamePhase {
    WaitingForOpponent,
    Playing {
        turn: PlayerSide,
    },
    Ended {
        result: GameResult,
        reason: GameOutcome,
    },
}

impl GamePhase {
    pub fn from_game(game: &Game) -> Self {
        match game.outcome() {
            Some(outcome) => Self::Ended {
                result: outcome.result(),
                reason: outcome,
            },
            None => Self::Playing { turn: game.turn() },
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended { .. })
    }
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        let position = Board::default();
        Self {
            seen: vec![position.hash()],
            position,
            history: Vec::new(),
            pgn_tags: Vec::new(),
            start_position: StartPosition::Standard,
        }
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let fen = fen.trim();
        if fen == STANDARD_START_FEN {
            return Ok(Self::new());
        }
        Self::from_start(StartPosition::Fen(fen.to_string()))
    }

    pub fn from_start(start: StartPosition) -> Result<Self, GameError> {
        let position = start.board()?;
        Ok(Self {
            seen: vec![position.hash()],
            position,
            history: Vec::new(),
            pgn_tags: Vec::new(),
            start_position: start,
        })
    }

    /// Replay the first `plies` moves of a list from its start position.
    pub fn replay(list: &MoveList, plies: usize) -> Result<Self, GameError> {
        let mut game = Self::from_start(list.start.clone())?;
        for record in list.moves.iter().take(plies) {
            game.make_move(record.mv)?;
        }
        Ok(game)
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get the move history
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn start_position(&self) -> &StartPosition {
        &self.start_position
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.pgn_tags
    }

    /// Set a PGN tag, replacing an existing one with the same name.
    pub fn set_tag(&mut self, name: &str, value: &str) {
        match self.pgn_tags.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.pgn_tags.push((name.to_string(), value.to_string())),
        }
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        legal_moves(&self.position)
    }

    /// Make a move on the board
    pub fn make_move(&mut self, mv: Move) -> Result<MoveRecord, GameError> {
        if !self.legal_moves().contains(&mv) {
            return Err(GameError::IllegalMove(crate::uci::format_uci_move(mv)));
        }

        let san = format_san(&self.position, mv);
        let shown = convert_cozy_castling_to_uci(&self.position, mv);

        self.position.play_unchecked(mv);
        self.seen.push(self.position.hash());

        let record = MoveRecord {
            mv,
            san,
            from: format_square(shown.from),
            to: format_square(shown.to),
            promotion: mv.promotion.map(PieceKind::from),
            fen: self.to_fen(),
        };
        self.history.push(record.clone());
        Ok(record)
    }

    /// Play a move given in Standard Algebraic Notation
    pub fn play_san(&mut self, san: &str) -> Result<MoveRecord, GameError> {
        let mv = parse_san(&self.position, san)?;
        self.make_move(mv)
    }

    /// Play a move given in coordinate form (`e2e4`, `e7e8q`, castles as `e1g1`)
    pub fn play_uci(&mut self, text: &str) -> Result<MoveRecord, GameError> {
        let mv = parse_uci_move(text).ok_or_else(|| GameError::InvalidNotation(text.to_string()))?;
        let mv = convert_uci_castling_to_cozy(mv, &self.legal_moves());
        self.make_move(mv)
    }

    /// Play a move in either coordinate or SAN form.
    pub fn play_text(&mut self, text: &str) -> Result<MoveRecord, GameError> {
        let text = text.trim();
        if parse_uci_move(text).is_some() {
            self.play_uci(text)
        } else {
            self.play_san(text)
        }
    }

    /// Play a board drop from one square to another. A pawn reaching the last
    /// rank promotes to `promotion`, or to a queen when none is given.
    pub fn play_squares(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<PieceKind>,
    ) -> Result<MoveRecord, GameError> {
        let invalid = || GameError::InvalidNotation(format!("{}{}", from, to));
        let from_sq: Square = parse_square(from).ok_or_else(invalid)?;
        let to_sq: Square = parse_square(to).ok_or_else(invalid)?;

        let promotes = self.position.piece_on(from_sq) == Some(Piece::Pawn)
            && matches!(to_sq.rank(), cozy_chess::Rank::First | cozy_chess::Rank::Eighth);
        let promotion = if promotes {
            Some(promotion.map(Piece::from).unwrap_or(Piece::Queen))
        } else {
            None
        };

        let mv = Move {
            from: from_sq,
            to: to_sq,
            promotion,
        };
        let mv = convert_uci_castling_to_cozy(mv, &self.legal_moves());
        self.make_move(mv)
    }

    /// Get the side to move
    pub fn turn(&self) -> PlayerSide {
        self.position.side_to_move().into()
    }

    /// Export position to FEN string
    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }

    /// Terminal state of the current position, if any.
    pub fn outcome(&self) -> Option<GameOutcome> {
        let has_moves = has_legal_moves(&self.position);
        if !has_moves {
            return Some(if self.position.checkers().is_empty() {
                GameOutcome::Stalemate
            } else {
                GameOutcome::Checkmate {
                    winner: self.turn().opposite(),
                }
            });
        }
        if self.position.halfmove_clock() >= 100 {
            return Some(GameOutcome::FiftyMoveRule);
        }
        let current = self.position.hash();
        if self.seen.iter().filter(|&&h| h == current).count() >= 3 {
            return Some(GameOutcome::ThreefoldRepetition);
        }
        if insufficient_material(&self.position) {
            return Some(GameOutcome::InsufficientMaterial);
        }
        None
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn result(&self) -> Option<GameResult> {
        self.outcome().map(GameOutcome::result)
    }

    /// Full PGN transcript of the game.
    pub fn to_pgn(&self) -> String {
        crate::pgn::export::write_pgn(self)
    }

    pub fn move_list(&self) -> MoveList {
        MoveList {
            start: self.start_position.clone(),
            moves: self.history.clone(),
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// All legal moves of a position, castles in cozy-chess king-takes-rook form.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// True when the side to move has at least one legal move.
pub fn has_legal_moves(board: &Board) -> bool {
    board.generate_moves(|mvs| !mvs.is_empty())
}

fn insufficient_material(board: &Board) -> bool {
    let decisive =
        board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !decisive.is_empty() {
        return false;
    }

    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if knights.len() + bishops.len() <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }

    // Bishops only: drawn when they all stand on squares of one colour.
    let light = bishops
        .into_iter()
        .filter(|sq| (sq.file() as usize + sq.rank() as usize) % 2 == 1)
        .count();
    light == 0 || light == bishops.len() as usize
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Invalid move notation: {0}")]
    InvalidNotation(String),
    #[error("SAN parse error: {0}")]
    San(#[from] SanError),
    #[error("FEN parse error: {0}")]
    Fen(#[from] FenError),
}
