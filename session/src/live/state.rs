use chess::arbiter::{self, GameMode};
use chess::{recover, Game, GamePhase, MoveRecord, PlayerSide};
use cozy_chess::Move;
use engine::{EngineCommand, EngineError, EngineEvent, EngineHandle, GoParams};
use tokio::sync::{mpsc, watch};

use super::commands::{MoveInput, SessionError};
use super::snapshot::SessionSnapshot;
use crate::store::{GameRecord, RecordStatus};

/// Position and transcript to write back to the shared record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PositionUpdate {
    pub fen: String,
    pub pgn: String,
}

/// Link between a session and its shared record.
pub(crate) struct OnlineBinding {
    pub record_id: String,
    pub local_id: String,
    pub join_code: String,
    pub waiting: bool,
    pub feed: watch::Receiver<Option<GameRecord>>,
    pub publisher: mpsc::UnboundedSender<PositionUpdate>,
}

pub(crate) struct MachineOpponent {
    pub engine: EngineHandle,
    pub params: GoParams,
    /// FEN of the outstanding request, if any.
    pub pending: Option<String>,
    /// Consecutive requests that ended in an error or an unplayable reply.
    pub failures: u8,
}

/// Outcome of a machine reply.
#[derive(Debug)]
pub(crate) enum MachineReply {
    Applied(SessionSnapshot),
    Stale,
    Rejected(String),
}

/// Internal mutable state, owned entirely by the session actor. No locks.
pub(crate) struct SessionState {
    pub session_id: String,
    pub game: Game,
    pub phase: GamePhase,
    pub mode: GameMode,
    pub local_seat: Option<PlayerSide>,
    pub machine: Option<MachineOpponent>,
    pub online: Option<OnlineBinding>,
}

impl SessionState {
    pub fn local(session_id: String, game: Game) -> Self {
        let phase = GamePhase::from_game(&game);
        Self {
            session_id,
            game,
            phase,
            mode: GameMode::Local,
            local_seat: None,
            machine: None,
            online: None,
        }
    }

    pub fn machine(
        session_id: String,
        game: Game,
        human_side: PlayerSide,
        engine: EngineHandle,
        params: GoParams,
    ) -> Self {
        let phase = GamePhase::from_game(&game);
        Self {
            session_id,
            game,
            phase,
            mode: GameMode::Machine { human_side },
            local_seat: Some(human_side),
            machine: Some(MachineOpponent {
                engine,
                params,
                pending: None,
                failures: 0,
            }),
            online: None,
        }
    }

    pub fn online(
        session_id: String,
        record: &GameRecord,
        local_id: String,
        feed: watch::Receiver<Option<GameRecord>>,
        publisher: mpsc::UnboundedSender<PositionUpdate>,
    ) -> Result<Self, SessionError> {
        let game = game_from_record(record)?;
        let local_seat = arbiter::seat_for(
            record.white_id.as_deref(),
            record.black_id.as_deref(),
            &local_id,
        );
        let mut state = Self {
            session_id,
            phase: GamePhase::from_game(&game),
            game,
            mode: GameMode::Online,
            local_seat,
            machine: None,
            online: Some(OnlineBinding {
                record_id: record.id.clone(),
                local_id,
                join_code: record.join_code.clone(),
                waiting: record.status == RecordStatus::Waiting,
                feed,
                publisher,
            }),
        };
        state.refresh_phase();
        Ok(state)
    }

    fn refresh_phase(&mut self) {
        let waiting = self.online.as_ref().is_some_and(|o| o.waiting);
        self.phase = if waiting {
            GamePhase::WaitingForOpponent
        } else {
            GamePhase::from_game(&self.game)
        };
    }

    pub fn machine_thinking(&self) -> bool {
        self.machine.as_ref().is_some_and(|m| m.pending.is_some())
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let moves = self.game.move_list();
        let turn = self.game.turn();
        SessionSnapshot {
            session_id: self.session_id.clone(),
            fen: self.game.to_fen(),
            side_to_move: turn,
            phase: self.phase,
            mode: self.mode,
            labels: moves.labels(),
            moves,
            pgn: self.game.to_pgn(),
            local_seat: self.local_seat,
            orientation: arbiter::board_orientation(self.mode, self.local_seat, turn),
            status_line: self.status_line(),
            game_over_message: self.game.outcome().map(|o| o.message()),
            machine_thinking: self.machine_thinking(),
        }
    }

    fn status_line(&self) -> String {
        if self.mode == GameMode::Local {
            return format!("Turn: {}", self.game.turn().title());
        }
        if let Some(online) = self.online.as_ref().filter(|o| o.waiting) {
            return format!(
                "Waiting for opponent... Code: {}",
                online.join_code.to_uppercase()
            );
        }
        if self.phase.is_ended() {
            "Game Over".to_string()
        } else if self.local_may_move() {
            "Your turn".to_string()
        } else {
            "Opponent's turn".to_string()
        }
    }

    fn local_may_move(&self) -> bool {
        arbiter::can_move(
            self.mode,
            self.game.turn(),
            self.local_seat,
            self.phase.is_ended(),
        )
    }

    /// Gate and apply a move from the local player.
    pub fn submit_move(&mut self, input: &MoveInput) -> Result<SessionSnapshot, SessionError> {
        match self.phase {
            GamePhase::Ended { .. } => return Err(SessionError::GameOver),
            GamePhase::WaitingForOpponent => return Err(SessionError::WaitingForOpponent),
            GamePhase::Playing { .. } => {}
        }
        if !self.local_may_move() {
            return Err(SessionError::NotYourTurn);
        }

        let record = match input {
            MoveInput::Notation(text) => self.game.play_text(text),
            MoveInput::Squares {
                from,
                to,
                promotion,
            } => self.game.play_squares(from, to, *promotion),
        }
        .map_err(|e| SessionError::IllegalMove(e.to_string()))?;

        Ok(self.after_move(&record))
    }

    fn after_move(&mut self, record: &MoveRecord) -> SessionSnapshot {
        self.refresh_phase();
        tracing::debug!(san = %record.san, fen = %record.fen, "Move applied");

        let disposition = arbiter::after_move(self.mode, self.phase.is_ended());
        if disposition.publish_remote {
            self.publish();
        }
        self.snapshot()
    }

    fn publish(&self) {
        let Some(online) = self.online.as_ref() else {
            return;
        };
        let update = PositionUpdate {
            fen: self.game.to_fen(),
            pgn: self.game.to_pgn(),
        };
        if online.publisher.send(update).is_err() {
            tracing::warn!(record = %online.record_id, "Record publisher has stopped");
        }
    }

    pub fn should_request_machine_move(&self) -> bool {
        self.machine.as_ref().is_some_and(|m| m.pending.is_none())
            && arbiter::machine_should_move(self.mode, self.game.turn(), self.phase.is_ended())
    }

    /// Ask the engine for a move in the live position.
    pub async fn request_machine_move(&mut self) -> Result<(), EngineError> {
        let fen = self.game.to_fen();
        let Some(machine) = self.machine.as_mut() else {
            return Ok(());
        };
        tracing::debug!(fen = %fen, "Requesting machine move");
        machine.engine.request_move(&fen, machine.params).await?;
        machine.pending = Some(fen);
        Ok(())
    }

    /// Apply a machine reply computed for `fen`. Replies for any other
    /// position are stale and leave the game untouched.
    pub fn apply_machine_move(&mut self, mv: Move, fen: &str) -> MachineReply {
        if fen != self.game.to_fen() {
            return MachineReply::Stale;
        }
        if let Some(machine) = self.machine.as_mut() {
            machine.pending = None;
        }
        match self.game.make_move(mv) {
            Ok(record) => {
                if let Some(machine) = self.machine.as_mut() {
                    machine.failures = 0;
                }
                MachineReply::Applied(self.after_move(&record))
            }
            Err(e) => MachineReply::Rejected(e.to_string()),
        }
    }

    /// Drop the outstanding request after a failed reply and count the
    /// failure. Returns the number of consecutive failures.
    pub fn record_machine_failure(&mut self) -> u8 {
        let Some(machine) = self.machine.as_mut() else {
            return 0;
        };
        machine.pending = None;
        machine.failures = machine.failures.saturating_add(1);
        machine.failures
    }

    /// Abandon whatever search the engine may still be running.
    pub async fn stop_machine_search(&self) {
        let Some(machine) = self.machine.as_ref() else {
            return;
        };
        if let Err(e) = machine.engine.send(EngineCommand::Stop).await {
            tracing::warn!("Failed to stop machine search: {}", e);
        }
    }

    /// Replace local state with a remote record. Returns false when the
    /// record only echoes what this session already shows.
    pub fn apply_remote(&mut self, record: &GameRecord) -> Result<bool, SessionError> {
        let Some(online) = self.online.as_ref() else {
            return Ok(false);
        };
        let seat = arbiter::seat_for(
            record.white_id.as_deref(),
            record.black_id.as_deref(),
            &online.local_id,
        );
        let waiting = record.status == RecordStatus::Waiting;
        let same_position = record.fen == self.game.to_fen() && record.pgn == self.game.to_pgn();

        if same_position && seat == self.local_seat && waiting == online.waiting {
            tracing::trace!("Ignoring echo of own update");
            return Ok(false);
        }

        if !same_position {
            self.game = game_from_record(record)?;
        }
        self.local_seat = seat;
        if let Some(online) = self.online.as_mut() {
            online.waiting = waiting;
        }
        self.refresh_phase();
        tracing::debug!(fen = %record.fen, status = ?record.status, "Applied remote record");
        Ok(true)
    }

    /// Quit the engine once the game can no longer continue.
    pub async fn shutdown_engine_if_ended(&mut self) {
        if !self.phase.is_ended() {
            return;
        }
        if let Some(machine) = self.machine.take() {
            tracing::info!("Game ended, shutting down machine opponent");
            machine.engine.shutdown().await;
        }
    }
}

/// Try to receive the next engine event. Pends forever without an engine.
pub(crate) async fn next_engine_event(machine: &mut Option<MachineOpponent>) -> Option<EngineEvent> {
    match machine.as_mut() {
        Some(machine) => machine.engine.recv().await,
        None => std::future::pending().await,
    }
}

/// Next change of the shared record, `None` once the record is gone. Pends
/// forever for sessions without one.
pub(crate) async fn next_remote_change(online: &mut Option<OnlineBinding>) -> Option<GameRecord> {
    match online.as_mut() {
        Some(online) => match online.feed.changed().await {
            Ok(()) => online.feed.borrow_and_update().clone(),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

/// Rebuild a game from a shared record: the transcript when present, the bare
/// position otherwise.
fn game_from_record(record: &GameRecord) -> Result<Game, SessionError> {
    if !record.pgn.trim().is_empty() {
        match recover::<Game>(&record.pgn) {
            Ok(recovered) => return Ok(recovered.game),
            Err(e) => tracing::warn!(record = %record.id, "Record transcript unreadable, using FEN: {}", e),
        }
    }
    Game::from_fen(&record.fen).map_err(|e| SessionError::Internal(format!("Invalid record FEN: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::fen::STANDARD_START_FEN;

    fn record(pgn: &str, fen: &str, status: RecordStatus) -> GameRecord {
        GameRecord {
            id: "g1".to_string(),
            fen: fen.to_string(),
            pgn: pgn.to_string(),
            white_id: Some("alice".to_string()),
            black_id: Some("bob".to_string()),
            status,
            join_code: "abc123".to_string(),
        }
    }

    fn online_state(record: &GameRecord, local_id: &str) -> SessionState {
        let (_tx, feed) = watch::channel(Some(record.clone()));
        let (publisher, _rx) = mpsc::unbounded_channel();
        SessionState::online(
            "s1".to_string(),
            record,
            local_id.to_string(),
            feed,
            publisher,
        )
        .unwrap()
    }

    #[test]
    fn test_transcript_takes_precedence_over_fen() {
        let rec = record("1. e4 e5", STANDARD_START_FEN, RecordStatus::Active);
        let state = online_state(&rec, "alice");
        assert_eq!(state.game.history().len(), 2);
    }

    #[test]
    fn test_bare_fen_loads_with_empty_history() {
        let fen = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1";
        let state = online_state(&record("", fen, RecordStatus::Active), "alice");
        assert!(state.game.history().is_empty());
        assert_eq!(state.game.to_fen(), fen);
    }

    #[test]
    fn test_unreadable_transcript_falls_back_to_fen() {
        let fen = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1";
        let state = online_state(&record("e4 e5 Ke3", fen, RecordStatus::Active), "alice");
        assert_eq!(state.game.to_fen(), fen);
    }

    #[test]
    fn test_status_lines() {
        let waiting = online_state(
            &record("", STANDARD_START_FEN, RecordStatus::Waiting),
            "alice",
        );
        assert_eq!(waiting.snapshot().status_line, "Waiting for opponent... Code: ABC123");
        assert_eq!(waiting.phase, GamePhase::WaitingForOpponent);

        let white = online_state(&record("", STANDARD_START_FEN, RecordStatus::Active), "alice");
        assert_eq!(white.snapshot().status_line, "Your turn");
        let black = online_state(&record("", STANDARD_START_FEN, RecordStatus::Active), "bob");
        assert_eq!(black.snapshot().status_line, "Opponent's turn");
        assert_eq!(black.snapshot().orientation, PlayerSide::Black);

        let local = SessionState::local("s2".to_string(), Game::new());
        assert_eq!(local.snapshot().status_line, "Turn: White");
    }

    #[test]
    fn test_waiting_refuses_moves() {
        let mut state = online_state(
            &record("", STANDARD_START_FEN, RecordStatus::Waiting),
            "alice",
        );
        assert_eq!(
            state.submit_move(&MoveInput::notation("e4")).unwrap_err(),
            SessionError::WaitingForOpponent
        );
    }

    #[test]
    fn test_spectator_cannot_move() {
        let mut state = online_state(
            &record("", STANDARD_START_FEN, RecordStatus::Active),
            "carol",
        );
        assert_eq!(state.local_seat, None);
        assert_eq!(
            state.submit_move(&MoveInput::notation("e4")).unwrap_err(),
            SessionError::NotYourTurn
        );
    }

    #[test]
    fn test_echo_is_ignored() {
        let rec = record("", STANDARD_START_FEN, RecordStatus::Active);
        let mut state = online_state(&rec, "alice");
        state.submit_move(&MoveInput::notation("e4")).unwrap();

        let echo = GameRecord {
            fen: state.game.to_fen(),
            pgn: state.game.to_pgn(),
            ..rec
        };
        assert!(!state.apply_remote(&echo).unwrap());
        assert_eq!(state.game.history().len(), 1);
    }
}
