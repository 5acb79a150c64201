//! `justchess play`: a local or machine-opponent game over stdin.

use std::time::Duration;

use anyhow::Context;
use chess::{Game, PlayerSide};
use engine::{EngineHandle, GoParams, RandomMover, StockfishConfig, StockfishEngine};
use session::{MoveInput, SessionEvent, SessionHandle, SessionManager, SessionSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::config::{self, EngineKind};

pub struct PlayOptions {
    pub vs_machine: bool,
    pub side: PlayerSide,
    pub skill: u8,
    pub engine: EngineKind,
}

async fn spawn_engine(options: &PlayOptions) -> anyhow::Result<EngineHandle> {
    match options.engine {
        EngineKind::Random => Ok(RandomMover::spawn(Duration::from_millis(
            config::get_think_delay_ms(),
        ))),
        EngineKind::Stockfish => StockfishEngine::spawn(StockfishConfig {
            path: config::get_stockfish_path(),
            skill_level: Some(options.skill),
        })
        .await
        .context("failed to start the engine"),
    }
}

fn render(snapshot: &SessionSnapshot) -> String {
    let moves = if snapshot.labels.is_empty() {
        "No moves yet.".to_string()
    } else {
        snapshot.labels.join(" ")
    };
    format!(
        "{}\n{}\nFEN: {}",
        moves, snapshot.status_line, snapshot.fen
    )
}

/// Wait until the machine has answered and the human may move again.
async fn wait_for_turn(
    events: &mut broadcast::Receiver<SessionEvent>,
    human: PlayerSide,
) -> anyhow::Result<()> {
    loop {
        match events.recv().await {
            Ok(SessionEvent::StateChanged(snap)) => {
                if snap.is_over() || (snap.side_to_move == human && !snap.machine_thinking) {
                    println!("{}", render(&snap));
                    return Ok(());
                }
            }
            // The session retries the machine on its own.
            Ok(SessionEvent::Error(message)) => println!("{}", message),
            Ok(SessionEvent::Terminated(reason)) => anyhow::bail!(reason),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!("Skipped {} session events", n);
            }
            Err(broadcast::error::RecvError::Closed) => anyhow::bail!("session closed"),
        }
    }
}

async fn finish(manager: &SessionManager, session: &SessionHandle) -> anyhow::Result<()> {
    if let Some(transcript) = manager.close(session.id()).await? {
        println!("{}", transcript);
    }
    Ok(())
}

pub async fn run(options: PlayOptions) -> anyhow::Result<()> {
    let manager = SessionManager::new();
    let session = if options.vs_machine {
        let engine = spawn_engine(&options).await?;
        manager
            .create_machine(
                Game::new(),
                options.side,
                engine,
                GoParams::for_skill(options.skill),
            )
            .await
    } else {
        manager.create_local(Game::new()).await
    };

    let (snapshot, mut events) = session.subscribe().await?;
    if options.vs_machine && snapshot.side_to_move != options.side {
        println!("Machine is thinking...");
        wait_for_turn(&mut events, options.side).await?;
    } else {
        println!("{}", render(&snapshot));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "q" => break,
            "pgn" => {
                let snap = session.get_snapshot().await?;
                if snap.pgn.is_empty() {
                    println!("No moves yet.");
                } else {
                    println!("{}", snap.pgn);
                }
                continue;
            }
            _ => {}
        }

        let snap = match session.submit_move(MoveInput::notation(line)).await {
            Ok(snap) => snap,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if options.vs_machine && !snap.is_over() {
            wait_for_turn(&mut events, options.side).await?;
        } else {
            println!("{}", render(&snap));
        }

        let latest = session.get_snapshot().await?;
        if let Some(message) = latest.game_over_message {
            println!("{}", message);
            break;
        }
    }

    finish(&manager, &session).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_snapshot() {
        let manager = SessionManager::new();
        let session = manager.create_local(Game::new()).await;
        let snap = session.get_snapshot().await.unwrap();
        assert_eq!(
            render(&snap),
            format!("No moves yet.\nTurn: White\nFEN: {}", chess::fen::STANDARD_START_FEN)
        );

        let snap = session
            .submit_move(MoveInput::notation("d4"))
            .await
            .unwrap();
        assert!(render(&snap).starts_with("1. d4\nTurn: Black"));
    }

    #[tokio::test]
    async fn test_wait_for_turn_returns_after_machine_reply() {
        let manager = SessionManager::new();
        let engine = RandomMover::spawn(Duration::from_millis(1));
        let session = manager
            .create_machine(Game::new(), PlayerSide::White, engine, GoParams::default())
            .await;
        let (_, mut events) = session.subscribe().await.unwrap();

        session.submit_move(MoveInput::notation("e4")).await.unwrap();
        tokio::time::timeout(
            Duration::from_secs(2),
            wait_for_turn(&mut events, PlayerSide::White),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(session.get_snapshot().await.unwrap().move_count(), 2);
    }
}
