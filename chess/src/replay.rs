//! Cursor over a validated move list.

use cozy_chess::Board;

use crate::game::{Game, GameError, MoveList, MoveRecord};
use crate::types::PlayerSide;

/// Position pointer into an immutable move list.
///
/// The cursor ranges over `-1..=N-1`, where `-1` is the start position. Every
/// transition clamps into that range and rebuilds the displayed position by
/// replaying the list from its start.
#[derive(Debug, Clone)]
pub struct ReplayCursor {
    moves: MoveList,
    cursor: isize,
    game: Game,
}

impl ReplayCursor {
    /// Validate `moves` and position the cursor on the final move.
    pub fn new(moves: MoveList) -> Result<Self, GameError> {
        let game = Game::replay(&moves, moves.len())?;
        Ok(Self {
            cursor: moves.len() as isize - 1,
            moves,
            game,
        })
    }

    pub fn cursor_index(&self) -> isize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn moves(&self) -> &MoveList {
        &self.moves
    }

    pub fn first(&mut self) {
        self.jump_to(-1);
    }

    pub fn prev(&mut self) {
        self.jump_to(self.cursor - 1);
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        self.jump_to(self.cursor + 1);
    }

    pub fn last(&mut self) {
        self.jump_to(self.moves.len() as isize - 1);
    }

    /// Move the cursor to `index`, clamped into `-1..=N-1`.
    pub fn jump_to(&mut self, index: isize) {
        let last = self.moves.len() as isize - 1;
        self.cursor = index.clamp(-1, last.max(-1));
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let plies = (self.cursor + 1) as usize;
        // The list was fully replayed in `new`, so every prefix replays too.
        match Game::replay(&self.moves, plies) {
            Ok(game) => self.game = game,
            Err(e) => tracing::error!("Replay of validated move list failed: {}", e),
        }
    }

    pub fn board(&self) -> &Board {
        self.game.position()
    }

    pub fn fen(&self) -> String {
        self.game.to_fen()
    }

    pub fn side_to_move(&self) -> PlayerSide {
        self.game.turn()
    }

    /// The move that produced the displayed position, if any.
    pub fn current_move(&self) -> Option<&MoveRecord> {
        usize::try_from(self.cursor)
            .ok()
            .and_then(|i| self.moves.moves.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::STANDARD_START_FEN;

    fn ten_plies() -> MoveList {
        let mut game = Game::new();
        for san in [
            "e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4", "Nf6", "O-O", "Be7",
        ] {
            game.play_san(san).unwrap();
        }
        game.move_list()
    }

    #[test]
    fn test_starts_at_final_position() {
        let list = ten_plies();
        let final_fen = list.final_fen();
        let cursor = ReplayCursor::new(list).unwrap();
        assert_eq!(cursor.cursor_index(), 9);
        assert_eq!(cursor.fen(), final_fen);
        assert_eq!(cursor.current_move().unwrap().san, "Be7");
    }

    #[test]
    fn test_clamped_navigation_sequence() {
        let mut cursor = ReplayCursor::new(ten_plies()).unwrap();
        cursor.last();
        cursor.prev();
        cursor.prev();
        assert_eq!(cursor.cursor_index(), 7);
        cursor.jump_to(-5);
        assert_eq!(cursor.cursor_index(), -1);
        assert_eq!(cursor.fen(), STANDARD_START_FEN);
        assert!(cursor.current_move().is_none());
    }

    #[test]
    fn test_bounds_are_idempotent() {
        let mut cursor = ReplayCursor::new(ten_plies()).unwrap();
        cursor.next();
        assert_eq!(cursor.cursor_index(), 9);
        cursor.first();
        cursor.prev();
        assert_eq!(cursor.cursor_index(), -1);
        cursor.jump_to(100);
        assert_eq!(cursor.cursor_index(), 9);
    }

    #[test]
    fn test_position_matches_prefix() {
        let list = ten_plies();
        let mut cursor = ReplayCursor::new(list.clone()).unwrap();
        cursor.jump_to(2);
        assert_eq!(cursor.fen(), list.moves[2].fen);
        assert_eq!(cursor.side_to_move(), PlayerSide::Black);
    }

    #[test]
    fn test_empty_list() {
        let mut cursor = ReplayCursor::new(Game::new().move_list()).unwrap();
        assert_eq!(cursor.cursor_index(), -1);
        cursor.next();
        cursor.last();
        assert_eq!(cursor.cursor_index(), -1);
        assert_eq!(cursor.fen(), STANDARD_START_FEN);
    }

    #[test]
    fn test_rejects_inconsistent_list() {
        let mut list = ten_plies();
        list.moves.swap(0, 1);
        assert!(ReplayCursor::new(list).is_err());
    }
}
