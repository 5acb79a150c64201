pub mod arbiter;
pub mod converters;
pub mod fen;
pub mod game;
pub mod pgn;
pub mod replay;
pub mod rules;
pub mod types;
pub mod uci;

pub use arbiter::{GameMode, MoveDisposition};
pub use converters::*;
pub use game::{
    has_legal_moves, legal_moves, Game, GameError, GameOutcome, GamePhase, GameResult, MoveList,
    MoveRecord, StartPosition,
};
pub use pgn::{import_pgn, recover, ImportError, ParseFailure, PgnError, Recovered, RecoveryStage};
pub use replay::ReplayCursor;
pub use rules::RulesEngine;
pub use types::{PieceKind, PlayerSide};
pub use uci::{
    convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_uci_move, parse_uci_move,
};
