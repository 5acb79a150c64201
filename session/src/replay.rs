//! Replay views: a [`ReplayCursor`] owned by an actor so that navigation from
//! several sources (buttons, keys, a move list click) is applied in order.

use chess::{MoveList, MoveRecord, ReplayCursor};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use crate::live::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayNav {
    First,
    Prev,
    Next,
    Last,
    JumpTo(isize),
}

/// Keyboard input as a replay view receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    ArrowLeft,
    ArrowRight,
    Other,
}

impl KeyInput {
    pub fn nav(self) -> Option<ReplayNav> {
        match self {
            Self::ArrowLeft => Some(ReplayNav::Prev),
            Self::ArrowRight => Some(ReplayNav::Next),
            Self::Other => None,
        }
    }
}

/// What a replay view displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayView {
    /// `-1` is the start position.
    pub cursor: isize,
    pub fen: String,
    pub labels: Vec<String>,
    /// Move that produced the displayed position.
    pub current: Option<MoveRecord>,
}

enum ReplayCommand {
    Navigate {
        nav: ReplayNav,
        reply: oneshot::Sender<ReplayView>,
    },
    View {
        reply: oneshot::Sender<ReplayView>,
    },
}

#[derive(Clone)]
pub struct ReplayHandle {
    cmd_tx: mpsc::Sender<ReplayCommand>,
}

impl ReplayHandle {
    pub async fn navigate(&self, nav: ReplayNav) -> Result<ReplayView, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(ReplayCommand::Navigate { nav, reply: tx })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Apply a key press. Keys without a binding leave the view unchanged.
    pub async fn key(&self, key: KeyInput) -> Result<ReplayView, SessionError> {
        match key.nav() {
            Some(nav) => self.navigate(nav).await,
            None => self.view().await,
        }
    }

    pub async fn view(&self) -> Result<ReplayView, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(ReplayCommand::View { reply: tx })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}

/// Validate `moves` and spawn a replay actor positioned on the final move.
/// The actor stops when every handle is dropped.
pub fn spawn_replay(moves: MoveList) -> Result<ReplayHandle, SessionError> {
    let cursor = ReplayCursor::new(moves).map_err(|e| SessionError::IllegalMove(e.to_string()))?;
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    tokio::spawn(
        run_replay_actor(cursor, cmd_rx).instrument(tracing::debug_span!("replay")),
    );
    Ok(ReplayHandle { cmd_tx })
}

async fn run_replay_actor(mut cursor: ReplayCursor, mut cmd_rx: mpsc::Receiver<ReplayCommand>) {
    let labels = cursor.moves().labels();
    tracing::debug!(plies = cursor.len(), "Replay actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            ReplayCommand::Navigate { nav, reply } => {
                match nav {
                    ReplayNav::First => cursor.first(),
                    ReplayNav::Prev => cursor.prev(),
                    ReplayNav::Next => cursor.next(),
                    ReplayNav::Last => cursor.last(),
                    ReplayNav::JumpTo(index) => cursor.jump_to(index),
                }
                tracing::trace!(?nav, cursor = cursor.cursor_index(), "Replay navigated");
                let _ = reply.send(view(&cursor, &labels));
            }
            ReplayCommand::View { reply } => {
                let _ = reply.send(view(&cursor, &labels));
            }
        }
    }
    tracing::debug!("Replay actor exited");
}

fn view(cursor: &ReplayCursor, labels: &[String]) -> ReplayView {
    ReplayView {
        cursor: cursor.cursor_index(),
        fen: cursor.fen(),
        labels: labels.to_vec(),
        current: cursor.current_move().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::fen::STANDARD_START_FEN;
    use chess::Game;

    fn game_moves(sans: &[&str]) -> MoveList {
        let mut game = Game::new();
        for san in sans {
            game.play_san(san).unwrap();
        }
        game.move_list()
    }

    #[tokio::test]
    async fn test_starts_on_final_move() {
        let handle = spawn_replay(game_moves(&["e4", "e5", "Nf3"])).unwrap();
        let view = handle.view().await.unwrap();
        assert_eq!(view.cursor, 2);
        assert_eq!(view.labels, vec!["1. e4", "e5", "2. Nf3"]);
        assert_eq!(view.current.map(|m| m.san), Some("Nf3".to_string()));
    }

    #[tokio::test]
    async fn test_keys_step_and_clamp() {
        let handle = spawn_replay(game_moves(&["e4", "e5"])).unwrap();
        assert_eq!(handle.key(KeyInput::ArrowRight).await.unwrap().cursor, 1);
        assert_eq!(handle.key(KeyInput::ArrowLeft).await.unwrap().cursor, 0);
        assert_eq!(handle.key(KeyInput::ArrowLeft).await.unwrap().cursor, -1);
        let view = handle.key(KeyInput::ArrowLeft).await.unwrap();
        assert_eq!(view.cursor, -1);
        assert_eq!(view.fen, STANDARD_START_FEN);
        assert_eq!(handle.key(KeyInput::Other).await.unwrap().cursor, -1);
    }

    #[tokio::test]
    async fn test_concurrent_navigation_is_serialized() {
        let handle = spawn_replay(game_moves(&["d4", "d5", "c4", "e6", "Nc3", "Nf6"])).unwrap();
        handle.navigate(ReplayNav::First).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.navigate(ReplayNav::Next).await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let view = handle.view().await.unwrap();
        assert_eq!(view.cursor, 3);
        assert_eq!(view.current.map(|m| m.san), Some("e6".to_string()));
    }

    #[test]
    fn test_rejects_inconsistent_list() {
        let mut list = game_moves(&["e4", "e5"]);
        list.moves.swap(0, 1);
        assert!(spawn_replay(list).is_err());
    }
}
