//! PGN support: SAN, strict loading, export, and staged recovery.

pub mod export;
pub mod loader;
pub mod recovery;
pub mod san;

pub use export::write_pgn;
pub use loader::{load_pgn, PgnError};
pub use recovery::{import_pgn, recover, ImportError, ParseFailure, Recovered, RecoveryStage};
pub use san::{format_san, parse_san, SanError};
