//! Opponent that answers with a uniformly random legal move after a pause.

use std::time::Duration;

use cozy_chess::Move;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{EngineCommand, EngineEvent, EngineHandle};

pub struct RandomMover;

impl RandomMover {
    /// Spawn the mover task. Each `Go` answers after `think_delay`; `Stop` or a
    /// newer `Go` cancels a pending answer.
    #[tracing::instrument(level = "debug")]
    pub fn spawn(think_delay: Duration) -> EngineHandle {
        let (command_tx, mut command_rx) = mpsc::channel::<EngineCommand>(32);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);

        tokio::spawn(async move {
            let _ = event_tx.send(EngineEvent::Ready).await;

            let mut position: Option<String> = None;
            let mut pending: Option<JoinHandle<()>> = None;

            while let Some(cmd) = command_rx.recv().await {
                tracing::trace!("Random mover command: {:?}", cmd);
                match cmd {
                    EngineCommand::SetPosition { fen } => position = Some(fen),
                    EngineCommand::Go(_) => {
                        let Some(fen) = position.clone() else {
                            let _ = event_tx
                                .send(EngineEvent::Error("go without a position".to_string()))
                                .await;
                            continue;
                        };
                        if let Some(task) = pending.take() {
                            task.abort();
                        }
                        pending = Some(tokio::spawn(think(fen, think_delay, event_tx.clone())));
                    }
                    EngineCommand::Stop => {
                        if let Some(task) = pending.take() {
                            task.abort();
                        }
                    }
                    EngineCommand::Quit => break,
                }
            }

            if let Some(task) = pending.take() {
                task.abort();
            }
            tracing::debug!("Random mover exiting");
        });

        EngineHandle {
            tx: command_tx,
            rx: event_rx,
        }
    }
}

async fn think(fen: String, delay: Duration, event_tx: mpsc::Sender<EngineEvent>) {
    tokio::time::sleep(delay).await;
    let event = match pick_move(&fen) {
        Ok(mv) => EngineEvent::BestMove { mv, fen },
        Err(e) => EngineEvent::Error(e),
    };
    let _ = event_tx.send(event).await;
}

fn pick_move(fen: &str) -> Result<Move, String> {
    let board = chess::fen::parse_fen(fen).map_err(|e| e.to_string())?;
    let moves = chess::legal_moves(&board);
    moves
        .choose(&mut rand::thread_rng())
        .copied()
        .ok_or_else(|| "no legal moves".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoParams;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[tokio::test]
    async fn test_answers_with_legal_move_for_position() {
        let mut handle = RandomMover::spawn(Duration::from_millis(1));
        assert_eq!(handle.recv().await, Some(EngineEvent::Ready));

        handle.request_move(START, GoParams::default()).await.unwrap();
        match handle.recv().await {
            Some(EngineEvent::BestMove { mv, fen }) => {
                assert_eq!(fen, START);
                assert!(chess::Game::new().legal_moves().contains(&mv));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reports_position_without_moves() {
        let mut handle = RandomMover::spawn(Duration::from_millis(1));
        handle.recv().await;

        // White is checkmated.
        let mated = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        handle.request_move(mated, GoParams::default()).await.unwrap();
        assert!(matches!(handle.recv().await, Some(EngineEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_stop_cancels_pending_answer() {
        let mut handle = RandomMover::spawn(Duration::from_millis(200));
        handle.recv().await;

        handle.request_move(START, GoParams::default()).await.unwrap();
        handle.send(EngineCommand::Stop).await.unwrap();
        let waited =
            tokio::time::timeout(Duration::from_millis(400), handle.recv()).await;
        assert!(waited.is_err(), "stopped search still answered");
    }
}
