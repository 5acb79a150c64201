//! Turn and ownership policy: who may move, and what follows an accepted move.

use serde::{Deserialize, Serialize};

use crate::types::PlayerSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameMode {
    /// Both sides share one board.
    Local,
    /// The human plays `human_side`, the machine the other.
    Machine { human_side: PlayerSide },
    /// Two identities paired through a shared record.
    Online,
}

/// What has to happen after a move is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveDisposition {
    pub persist_local: bool,
    pub publish_remote: bool,
    pub request_machine_move: bool,
}

/// Whether the local actor may submit a move now.
///
/// `local_seat` is the side the local actor sits on; `None` is a spectator.
/// In machine mode the seat is the human side.
pub fn can_move(
    mode: GameMode,
    turn: PlayerSide,
    local_seat: Option<PlayerSide>,
    is_game_over: bool,
) -> bool {
    if is_game_over {
        return false;
    }
    match mode {
        GameMode::Local => true,
        GameMode::Machine { human_side } => turn == human_side,
        GameMode::Online => local_seat == Some(turn),
    }
}

pub fn after_move(mode: GameMode, game_over: bool) -> MoveDisposition {
    match mode {
        GameMode::Local => MoveDisposition {
            persist_local: true,
            ..Default::default()
        },
        GameMode::Machine { .. } => MoveDisposition {
            persist_local: true,
            request_machine_move: !game_over,
            ..Default::default()
        },
        GameMode::Online => MoveDisposition {
            persist_local: true,
            publish_remote: true,
            ..Default::default()
        },
    }
}

/// Whether the machine owns the side to move and should be asked for a move.
pub fn machine_should_move(mode: GameMode, turn: PlayerSide, is_game_over: bool) -> bool {
    match mode {
        GameMode::Machine { human_side } => !is_game_over && turn != human_side,
        _ => false,
    }
}

/// Resolve the local identity against a record's seat assignments.
pub fn seat_for(
    white_id: Option<&str>,
    black_id: Option<&str>,
    local_id: &str,
) -> Option<PlayerSide> {
    if white_id == Some(local_id) {
        Some(PlayerSide::White)
    } else if black_id == Some(local_id) {
        Some(PlayerSide::Black)
    } else {
        None
    }
}

/// Side shown at the bottom of the board. A shared local board turns to face
/// the side to move.
pub fn board_orientation(
    mode: GameMode,
    local_seat: Option<PlayerSide>,
    turn: PlayerSide,
) -> PlayerSide {
    match mode {
        GameMode::Machine { human_side } => human_side,
        GameMode::Online => local_seat.unwrap_or(PlayerSide::White),
        GameMode::Local => turn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlayerSide::{Black, White};

    #[test]
    fn test_local_mode_always_moves() {
        assert!(can_move(GameMode::Local, White, None, false));
        assert!(can_move(GameMode::Local, Black, None, false));
        assert!(!can_move(GameMode::Local, Black, None, true));
    }

    #[test]
    fn test_machine_mode_gates_on_human_side() {
        let mode = GameMode::Machine { human_side: Black };
        assert!(!can_move(mode, White, Some(Black), false));
        assert!(can_move(mode, Black, Some(Black), false));
        assert!(machine_should_move(mode, White, false));
        assert!(!machine_should_move(mode, White, true));
        assert!(!machine_should_move(mode, Black, false));
        assert!(!machine_should_move(GameMode::Local, White, false));
    }

    #[test]
    fn test_online_mode_uses_seat() {
        assert!(can_move(GameMode::Online, White, Some(White), false));
        assert!(!can_move(GameMode::Online, White, Some(Black), false));
        assert!(!can_move(GameMode::Online, White, None, false));
        assert!(!can_move(GameMode::Online, White, Some(White), true));
    }

    #[test]
    fn test_after_move_dispositions() {
        let local = after_move(GameMode::Local, false);
        assert!(local.persist_local && !local.publish_remote && !local.request_machine_move);

        let machine = after_move(GameMode::Machine { human_side: White }, false);
        assert!(machine.request_machine_move && !machine.publish_remote);
        assert!(!after_move(GameMode::Machine { human_side: White }, true).request_machine_move);

        let online = after_move(GameMode::Online, false);
        assert!(online.persist_local && online.publish_remote);
    }

    #[test]
    fn test_seat_resolution() {
        assert_eq!(seat_for(Some("a"), Some("b"), "a"), Some(White));
        assert_eq!(seat_for(Some("a"), Some("b"), "b"), Some(Black));
        assert_eq!(seat_for(Some("a"), None, "c"), None);
        assert_eq!(seat_for(None, None, "c"), None);
    }

    #[test]
    fn test_orientation() {
        assert_eq!(
            board_orientation(GameMode::Machine { human_side: Black }, None, White),
            Black
        );
        assert_eq!(board_orientation(GameMode::Online, Some(Black), White), Black);
        assert_eq!(board_orientation(GameMode::Online, None, Black), White);
        assert_eq!(board_orientation(GameMode::Local, None, White), White);
        assert_eq!(board_orientation(GameMode::Local, None, Black), Black);
    }
}
