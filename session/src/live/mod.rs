//! Live games: one actor per session, reached through a [`SessionHandle`].

mod actor;
mod commands;
mod events;
mod handle;
mod snapshot;
mod state;

use std::collections::HashMap;

use chess::{Game, PlayerSide};
use engine::{EngineHandle, GoParams};
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::store::GameStore;
use actor::run_session_actor;
pub use commands::{MoveInput, SessionError};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use snapshot::SessionSnapshot;
use state::{PositionUpdate, SessionState};

/// Manages all active sessions. Spawns an actor task per session.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two players sharing one board.
    pub async fn create_local(&self, game: Game) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let state = SessionState::local(id, game);
        self.spawn(state).await
    }

    /// A human against a machine opponent. The machine moves at once if it
    /// holds the side to move.
    pub async fn create_machine(
        &self,
        game: Game,
        human_side: PlayerSide,
        engine: EngineHandle,
        params: GoParams,
    ) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let state = SessionState::machine(id, game, human_side, engine, params);
        self.spawn(state).await
    }

    /// Follow the shared record `record_id` as `local_id`. Moves made here are
    /// written back to the store; changes from the other side replace local
    /// state.
    pub async fn open_online<S: GameStore>(
        &self,
        store: &S,
        record_id: &str,
        local_id: &str,
    ) -> Result<SessionHandle, SessionError> {
        let mut feed = store
            .subscribe(record_id)
            .await
            .map_err(|_| SessionError::RemoteRecordMissing)?;
        let record = feed
            .borrow_and_update()
            .clone()
            .ok_or(SessionError::RemoteRecordMissing)?;

        let (publisher, publish_rx) = mpsc::unbounded_channel();
        tokio::spawn(publish_positions(
            store.clone(),
            record.id.clone(),
            publish_rx,
        ));

        let id = Uuid::new_v4().to_string();
        let state = SessionState::online(id, &record, local_id.to_string(), feed, publisher)?;
        Ok(self.spawn(state).await)
    }

    async fn spawn(&self, state: SessionState) -> SessionHandle {
        let session_id = state.session_id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(100);
        tokio::spawn(run_session_actor(state, cmd_rx, event_tx));

        let handle = SessionHandle::new(session_id.clone(), cmd_tx);
        self.sessions.write().await.insert(session_id, handle.clone());
        handle
    }

    pub async fn get_handle(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Close a session. If its game ended, the transcript is returned so the
    /// caller can open it for analysis.
    pub async fn close(&self, session_id: &str) -> Result<Option<String>, SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let transcript = match handle.get_snapshot().await {
            Ok(snapshot) if snapshot.is_over() => Some(snapshot.pgn),
            _ => None,
        };
        handle.shutdown().await;
        tracing::info!(id = session_id, ended = transcript.is_some(), "Session closed");
        Ok(transcript)
    }
}

/// Write positions to the shared record in the order they were played.
async fn publish_positions<S: GameStore>(
    store: S,
    record_id: String,
    mut updates: mpsc::UnboundedReceiver<PositionUpdate>,
) {
    while let Some(update) = updates.recv().await {
        if let Err(e) = store
            .update_position(&record_id, &update.fen, &update.pgn)
            .await
        {
            tracing::warn!(record = %record_id, "Failed to publish position: {}", e);
        }
    }
    tracing::debug!(record = %record_id, "Record publisher exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_and_close() {
        let manager = SessionManager::new();
        let handle = manager.create_local(Game::new()).await;
        let found = manager.get_handle(handle.id()).await.unwrap();
        assert_eq!(found.id(), handle.id());

        assert_eq!(manager.close(handle.id()).await.unwrap(), None);
        assert!(matches!(
            manager.get_handle(handle.id()).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(manager.close(handle.id()).await.is_err());
    }

    #[tokio::test]
    async fn test_closing_ended_game_returns_transcript() {
        let manager = SessionManager::new();
        let handle = manager.create_local(Game::new()).await;
        for san in ["f3", "e5", "g4", "Qh4#"] {
            handle.submit_move(MoveInput::notation(san)).await.unwrap();
        }
        let transcript = manager.close(handle.id()).await.unwrap().unwrap();
        assert_eq!(transcript, "1. f3 e5 2. g4 Qh4# 0-1");
    }
}
