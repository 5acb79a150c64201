//! Machine opponents behind a per-session command/event channel pair.

pub mod random;
pub mod stockfish;
pub mod uci;

pub use random::RandomMover;
pub use stockfish::{StockfishConfig, StockfishEngine};
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;
use tokio::sync::mpsc;

/// Handle for communicating with a chess engine
pub struct EngineHandle {
    pub tx: mpsc::Sender<EngineCommand>,
    pub rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        tracing::debug!("Queueing engine command: {:?}", cmd);
        self.tx.send(cmd).await.map_err(|_| EngineError::Closed)
    }

    /// Receive the next engine event. `None` once the engine has gone away.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }

    /// Ask for a move in `fen`. The answer arrives as [`EngineEvent::BestMove`]
    /// carrying the same FEN.
    pub async fn request_move(&self, fen: &str, params: GoParams) -> Result<(), EngineError> {
        self.send(EngineCommand::SetPosition {
            fen: fen.to_string(),
        })
        .await?;
        self.send(EngineCommand::Go(params)).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(EngineCommand::Quit).await;
    }
}

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    SetPosition { fen: String },
    Go(GoParams),
    /// Abandon the running search, if any.
    Stop,
    Quit,
}

/// Parameters for the "go" command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoParams {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub depth: Option<u8>,     // Search depth
}

impl GoParams {
    /// Search limits for a 0-20 skill level.
    pub fn for_skill(skill: u8) -> Self {
        match skill {
            0..=3 => Self {
                depth: Some(4),
                ..Default::default()
            },
            4..=7 => Self {
                depth: Some(8),
                ..Default::default()
            },
            8..=12 => Self {
                movetime: Some(500),
                ..Default::default()
            },
            13..=17 => Self {
                movetime: Some(1000),
                ..Default::default()
            },
            _ => Self {
                movetime: Some(2000),
                ..Default::default()
            },
        }
    }
}

/// Events received from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Ready,
    /// Best move in cozy-chess form, with the FEN it was searched from.
    BestMove { mv: Move, fen: String },
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine channel closed")]
    Closed,
    #[error("Stockfish not found")]
    NotFound,
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),
    #[error("Timeout waiting for engine to respond")]
    Timeout,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
