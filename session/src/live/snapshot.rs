use chess::{GameMode, GamePhase, MoveList, PlayerSide};
use serde::Serialize;

/// Complete, immutable snapshot of session state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub fen: String,
    pub side_to_move: PlayerSide,
    pub phase: GamePhase,
    pub mode: GameMode,
    pub moves: MoveList,
    /// Numbered move labels, `"1. e4"`, `"e5"`, ...
    pub labels: Vec<String>,
    pub pgn: String,
    pub local_seat: Option<PlayerSide>,
    pub orientation: PlayerSide,
    pub status_line: String,
    pub game_over_message: Option<String>,
    pub machine_thinking: bool,
}

impl SessionSnapshot {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn is_over(&self) -> bool {
        self.phase.is_ended()
    }
}
