use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chess::{convert_uci_castling_to_cozy, legal_moves};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::mpsc;

use crate::uci::{format_go, parse_uci_message, UciMessage};
use crate::{EngineCommand, EngineError, EngineEvent, EngineHandle};

/// Stockfish (or any UCI engine) running as a child process.
pub struct StockfishEngine;

/// Configuration for the spawned engine.
#[derive(Debug, Clone, Default)]
pub struct StockfishConfig {
    /// Explicit binary path; common install locations are searched otherwise.
    pub path: Option<PathBuf>,
    pub skill_level: Option<u8>,
}

impl StockfishEngine {
    /// Spawn the engine, complete the UCI handshake, and return its handle.
    #[tracing::instrument(level = "info")]
    pub async fn spawn(config: StockfishConfig) -> Result<EngineHandle, EngineError> {
        let path = match config.path.clone() {
            Some(path) => path,
            None => find_stockfish_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!("Found Stockfish at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn Stockfish: {}", e);
                EngineError::Spawn(e.to_string())
            })?;

        let mut stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("no stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("no stdout".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        // Initialize UCI
        write_line(&mut stdin, "uci\n").await?;
        tokio::time::timeout(Duration::from_secs(10), wait_for(&mut lines, UciMessage::UciOk))
            .await
            .map_err(|_| {
                tracing::error!("Timeout waiting for uciok");
                EngineError::Timeout
            })??;
        tracing::debug!("Received uciok, engine ready");

        if let Some(level) = config.skill_level {
            tracing::info!("Setting skill level to {}", level);
            write_line(
                &mut stdin,
                &format!("setoption name Skill Level value {}\n", level.min(20)),
            )
            .await?;
        }
        write_line(&mut stdin, "isready\n").await?;

        let (command_tx, command_rx) = mpsc::channel::<EngineCommand>(32);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);
        // FENs of started searches, oldest first; one is consumed per bestmove.
        let (search_tx, search_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(read_output(lines, search_rx, event_tx));
        tokio::spawn(process_commands(stdin, command_rx, search_tx));
        tokio::spawn(async move {
            match process.wait().await {
                Ok(status) => tracing::info!("Stockfish exited: {}", status),
                Err(e) => tracing::error!("Failed to wait for Stockfish: {}", e),
            }
        });

        tracing::info!("Stockfish engine spawned and initialized successfully");
        Ok(EngineHandle {
            tx: command_tx,
            rx: event_rx,
        })
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> Result<(), EngineError> {
    tracing::trace!("UCI >> {}", line.trim());
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await?;
    Ok(())
}

async fn wait_for(
    lines: &mut tokio::io::Lines<BufReader<ChildStdout>>,
    expected: UciMessage,
) -> Result<(), EngineError> {
    while let Some(line) = lines.next_line().await? {
        tracing::trace!("UCI << {}", line.trim());
        if parse_uci_message(&line).ok().as_ref() == Some(&expected) {
            return Ok(());
        }
    }
    Err(EngineError::Spawn(
        "engine closed during handshake".to_string(),
    ))
}

async fn process_commands(
    mut stdin: ChildStdin,
    mut command_rx: mpsc::Receiver<EngineCommand>,
    search_tx: mpsc::UnboundedSender<String>,
) {
    let mut position: Option<String> = None;

    while let Some(cmd) = command_rx.recv().await {
        tracing::debug!("Processing engine command: {:?}", cmd);
        let line = match cmd {
            EngineCommand::SetPosition { fen } => {
                let line = format!("position fen {}\n", fen);
                position = Some(fen);
                line
            }
            EngineCommand::Go(params) => {
                let Some(fen) = position.clone() else {
                    tracing::warn!("Ignoring go without a position");
                    continue;
                };
                let _ = search_tx.send(fen);
                format_go(&params)
            }
            EngineCommand::Stop => "stop\n".to_string(),
            EngineCommand::Quit => {
                let _ = write_line(&mut stdin, "quit\n").await;
                break;
            }
        };

        if let Err(e) = write_line(&mut stdin, &line).await {
            tracing::error!("Failed to write to Stockfish: {}", e);
            break;
        }
    }
    tracing::info!("Command processor task exiting");
}

async fn read_output(
    mut lines: tokio::io::Lines<BufReader<ChildStdout>>,
    mut search_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::warn!("Stockfish stdout EOF - engine closed");
                break;
            }
            Err(e) => {
                tracing::error!("Error reading from Stockfish stdout: {}", e);
                let _ = event_tx.send(EngineEvent::Error(e.to_string())).await;
                break;
            }
        };
        tracing::trace!("UCI << {}", line.trim());

        let event = match parse_uci_message(&line) {
            Ok(UciMessage::ReadyOk) => EngineEvent::Ready,
            Ok(UciMessage::BestMove { mv, .. }) => {
                let Ok(fen) = search_rx.try_recv() else {
                    tracing::warn!("bestmove without a pending search: {}", line);
                    continue;
                };
                match mv {
                    Some(mv) => match bestmove_to_cozy(&fen, mv) {
                        Some(mv) => EngineEvent::BestMove { mv, fen },
                        None => EngineEvent::Error(format!("unplayable bestmove in {}", fen)),
                    },
                    None => EngineEvent::Error(format!("engine found no move in {}", fen)),
                }
            }
            Ok(UciMessage::UciOk) => continue,
            Err(e) => {
                tracing::trace!("Ignoring UCI line: {}", e);
                continue;
            }
        };

        if event_tx.send(event).await.is_err() {
            break;
        }
    }
    tracing::info!("Output reader task exiting");
}

/// Convert an engine move to cozy-chess form for the position it was searched in.
fn bestmove_to_cozy(fen: &str, mv: cozy_chess::Move) -> Option<cozy_chess::Move> {
    let board = chess::fen::parse_fen(fen).ok()?;
    let legal = legal_moves(&board);
    let mv = convert_uci_castling_to_cozy(mv, &legal);
    legal.contains(&mv).then_some(mv)
}

/// Find Stockfish executable in common locations
fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in paths {
        let path = Path::new(path_str);
        if (path.exists() || path_str == "stockfish")
            && std::process::Command::new(path_str)
                .arg("--help")
                .output()
                .is_ok()
        {
            return Some(PathBuf::from(path_str));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::parse_uci_move;

    #[test]
    fn test_bestmove_castling_converted() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let mv = bestmove_to_cozy(fen, parse_uci_move("e1g1").unwrap()).unwrap();
        assert_eq!(chess::format_uci_move(mv), "e1h1");
    }

    #[test]
    fn test_bestmove_rejects_illegal() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        assert!(bestmove_to_cozy(fen, parse_uci_move("e2e5").unwrap()).is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let result = StockfishEngine::spawn(StockfishConfig {
            path: Some(PathBuf::from("/nonexistent/stockfish")),
            skill_level: None,
        })
        .await;
        assert!(matches!(result, Err(EngineError::Spawn(_))));
    }
}
