//! Shared game records for online play.
//!
//! Records are the only state two players share: each participant's session
//! publishes its position with [`GameStore::update_position`] and follows the
//! other side through [`GameStore::subscribe`]. Methods return
//! `impl Future + Send` so that stores can be used from spawned actors through
//! static dispatch.

mod memory;

pub use memory::MemoryStore;

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// One online game as stored in the shared document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub fen: String,
    /// Transcript; empty until the first move.
    pub pgn: String,
    #[serde(rename = "playerWhite")]
    pub white_id: Option<String>,
    #[serde(rename = "playerBlack")]
    pub black_id: Option<String>,
    pub status: RecordStatus,
    /// Lowercase join code.
    #[serde(rename = "shortCode")]
    pub join_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Waiting,
    Active,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Game record not found: {0}")]
    NotFound(String),
    #[error("Game record already exists: {0}")]
    Conflict(String),
}

/// Repository for shared game records.
pub trait GameStore: Clone + Send + Sync + 'static {
    /// Insert a new record. An empty `id` is replaced by a generated one;
    /// the stored record is returned.
    fn create(
        &self,
        record: GameRecord,
    ) -> impl Future<Output = Result<GameRecord, StoreError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<GameRecord, StoreError>> + Send;

    /// First waiting record whose join code matches `code`, ignoring case.
    fn find_waiting_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<GameRecord>, StoreError>> + Send;

    /// Replace a whole record.
    fn update(&self, record: GameRecord) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Publish a new position and transcript for an existing record.
    fn update_position(
        &self,
        id: &str,
        fen: &str,
        pgn: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Follow a record. The receiver holds the current value and sees every
    /// later change; `None` means the record was deleted.
    fn subscribe(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<watch::Receiver<Option<GameRecord>>, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_uses_shared_document_field_names() {
        let record = GameRecord {
            id: "g1".to_string(),
            fen: chess::fen::STANDARD_START_FEN.to_string(),
            pgn: String::new(),
            white_id: Some("alice".to_string()),
            black_id: None,
            status: RecordStatus::Waiting,
            join_code: "abc123".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["playerWhite"], "alice");
        assert!(json["playerBlack"].is_null());
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["shortCode"], "abc123");

        let back: GameRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
