//! The rules-engine seam used by recovery and replay.

use crate::game::{Game, GameError, GameOutcome, MoveList};
use crate::pgn::PgnError;

/// Move validation and position bookkeeping as the PGN recovery parser
/// needs it. [`Game`] is the production implementation.
pub trait RulesEngine: Sized {
    /// A game at the standard initial position.
    fn new_game() -> Self;

    /// Strictly load a full transcript.
    fn load_pgn(text: &str) -> Result<Self, PgnError>;

    /// Apply one move in SAN or coordinate form. A rejected move leaves the
    /// game unchanged.
    fn play(&mut self, text: &str) -> Result<(), GameError>;

    fn fen(&self) -> String;

    fn pgn(&self) -> String;

    fn outcome(&self) -> Option<GameOutcome>;

    fn move_list(&self) -> MoveList;

    fn is_checkmate(&self) -> bool {
        matches!(self.outcome(), Some(GameOutcome::Checkmate { .. }))
    }

    fn is_draw(&self) -> bool {
        self.outcome().is_some_and(GameOutcome::is_draw)
    }

    fn is_game_over(&self) -> bool {
        self.outcome().is_some()
    }
}

impl RulesEngine for Game {
    fn new_game() -> Self {
        Game::new()
    }

    fn load_pgn(text: &str) -> Result<Self, PgnError> {
        crate::pgn::load_pgn(text)
    }

    fn play(&mut self, text: &str) -> Result<(), GameError> {
        self.play_text(text).map(|_| ())
    }

    fn fen(&self) -> String {
        self.to_fen()
    }

    fn pgn(&self) -> String {
        self.to_pgn()
    }

    fn outcome(&self) -> Option<GameOutcome> {
        Game::outcome(self)
    }

    fn move_list(&self) -> MoveList {
        Game::move_list(self)
    }
}
