use engine::EngineEvent;
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use super::commands::*;
use super::events::*;
use super::state::{next_engine_event, next_remote_change, MachineReply, SessionState};

/// Consecutive failed machine requests after which the session gives up.
const MAX_MACHINE_FAILURES: u8 = 3;

/// The main session actor loop.
/// Owns all mutable state. Processes commands, engine events and remote
/// record changes sequentially.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let session_id = state.session_id.clone();
    run_session_actor_inner(state, cmd_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!(mode = ?state.mode, "Session actor started");

    // The machine may hold the first move.
    maybe_request_machine_move(&mut state, &event_tx).await;

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        tracing::info!("Session actor shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_command(&mut state, cmd, &event_tx).await;
                        state.shutdown_engine_if_ended().await;
                    }
                }
            }

            event = next_engine_event(&mut state.machine) => {
                let outcome = match event {
                    Some(event) => handle_engine_event(&mut state, event, &event_tx).await,
                    None => {
                        tracing::warn!("Machine opponent went away");
                        state.machine = None;
                        Err(SessionError::MachineFailed(
                            "engine stopped responding".to_string(),
                        ))
                    }
                };
                match outcome {
                    Ok(()) => state.shutdown_engine_if_ended().await,
                    Err(e) => {
                        tracing::error!("Ending session: {}", e);
                        let _ = event_tx.send(SessionEvent::Terminated(e.to_string()));
                        break;
                    }
                }
            }

            change = next_remote_change(&mut state.online) => {
                match change {
                    Some(record) => match state.apply_remote(&record) {
                        Ok(true) => {
                            let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
                        }
                        Ok(false) => {}
                        Err(e) => {
                            tracing::error!("Failed to apply remote record: {}", e);
                            let _ = event_tx.send(SessionEvent::Error(e.to_string()));
                        }
                    },
                    None => {
                        tracing::warn!("Shared game record is gone, ending session");
                        let _ = event_tx.send(SessionEvent::Terminated(
                            SessionError::RemoteRecordMissing.to_string(),
                        ));
                        break;
                    }
                }
            }
        }
    }

    if let Some(machine) = state.machine.take() {
        machine.engine.shutdown().await;
    }
    tracing::info!("Session actor exited");
}

async fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match cmd {
        SessionCommand::SubmitMove { input, reply } => {
            let result = state.submit_move(&input);
            match result {
                Ok(ref snap) => {
                    let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
                }
                Err(ref e) => tracing::debug!(input = %input, "Move refused: {}", e),
            }
            let _ = reply.send(result);
            maybe_request_machine_move(state, event_tx).await;
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        SessionCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        SessionCommand::Shutdown => unreachable!(),
    }
}

/// Ask the machine for a move if it holds the side to move.
async fn maybe_request_machine_move(
    state: &mut SessionState,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    if !state.should_request_machine_move() {
        return;
    }
    match state.request_machine_move().await {
        Ok(()) => {
            let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
        }
        Err(e) => {
            tracing::error!("Failed to request machine move: {}", e);
            let _ = event_tx.send(SessionEvent::Error(format!(
                "Machine move request failed: {}",
                e
            )));
        }
    }
}

/// Retry after a failed machine request, or give up once the failures run
/// out.
async fn retry_machine_move(
    state: &mut SessionState,
    event_tx: &broadcast::Sender<SessionEvent>,
) -> Result<(), SessionError> {
    let failures = state.record_machine_failure();
    if failures >= MAX_MACHINE_FAILURES {
        return Err(SessionError::MachineFailed(format!(
            "no playable move after {} attempts",
            failures
        )));
    }
    tracing::warn!(failures, "Retrying machine move");
    state.stop_machine_search().await;
    maybe_request_machine_move(state, event_tx).await;
    Ok(())
}

/// Apply an engine event. An error return ends the session.
async fn handle_engine_event(
    state: &mut SessionState,
    event: EngineEvent,
    event_tx: &broadcast::Sender<SessionEvent>,
) -> Result<(), SessionError> {
    match event {
        EngineEvent::BestMove { mv, fen } => match state.apply_machine_move(mv, &fen) {
            MachineReply::Applied(snapshot) => {
                let _ = event_tx.send(SessionEvent::StateChanged(snapshot));
                maybe_request_machine_move(state, event_tx).await;
            }
            MachineReply::Stale => {
                tracing::debug!(fen = %fen, "Discarding machine move for a stale position");
            }
            MachineReply::Rejected(reason) => {
                tracing::error!("Machine suggested illegal move {:?}: {}", mv, reason);
                let _ = event_tx.send(SessionEvent::Error(format!(
                    "Machine suggested illegal move: {}",
                    reason
                )));
                retry_machine_move(state, event_tx).await?;
            }
        },
        EngineEvent::Ready => {
            tracing::debug!("Machine opponent ready");
        }
        EngineEvent::Error(err) => {
            tracing::error!("Machine opponent error: {}", err);
            let _ = event_tx.send(SessionEvent::Error(format!("Engine error: {}", err)));
            retry_machine_move(state, event_tx).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::handle::SessionHandle;
    use chess::{Game, GamePhase};

    fn spawn_local(game: Game) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = broadcast::channel(100);
        let state = SessionState::local("test".to_string(), game);
        tokio::spawn(run_session_actor(state, cmd_rx, event_tx));
        (SessionHandle::new("test".to_string(), cmd_tx), event_rx)
    }

    #[tokio::test]
    async fn test_submit_move_via_actor() {
        let (handle, mut events) = spawn_local(Game::new());
        let snap = handle.submit_move(MoveInput::notation("e4")).await.unwrap();
        assert_eq!(snap.move_count(), 1);
        assert_eq!(snap.side_to_move, chess::PlayerSide::Black);
        assert_eq!(snap.status_line, "Turn: Black");

        let event = events.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::StateChanged(_)));
    }

    #[tokio::test]
    async fn test_illegal_move_is_a_no_op() {
        let (handle, _events) = spawn_local(Game::new());
        let err = handle
            .submit_move(MoveInput::squares("e2", "e5"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::IllegalMove(_)));

        let snap = handle.get_snapshot().await.unwrap();
        assert_eq!(snap.move_count(), 0);
        assert_eq!(snap.fen, chess::fen::STANDARD_START_FEN);
    }

    #[tokio::test]
    async fn test_fools_mate_ends_game() {
        let (handle, _events) = spawn_local(Game::new());
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4")] {
            handle.submit_move(MoveInput::squares(from, to)).await.unwrap();
        }
        let snap = handle
            .submit_move(MoveInput::squares("d8", "h4"))
            .await
            .unwrap();
        assert!(matches!(snap.phase, GamePhase::Ended { .. }));
        assert_eq!(snap.game_over_message.as_deref(), Some("Checkmate! Black wins."));

        // Still responsive, but refuses further moves.
        let err = handle
            .submit_move(MoveInput::notation("a3"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::GameOver);
    }

    #[tokio::test]
    async fn test_subscribe_gets_initial_snapshot() {
        let (handle, _) = spawn_local(Game::new());
        let (snapshot, _rx) = handle.subscribe().await.unwrap();
        assert_eq!(snapshot.move_count(), 0);
        assert_eq!(snapshot.orientation, chess::PlayerSide::White);
        assert!(!snapshot.machine_thinking);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (handle, _) = spawn_local(Game::new());
        handle.shutdown().await;
        let err = handle
            .submit_move(MoveInput::notation("e4"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Closed);
    }
}
