use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use super::{GameRecord, GameStore, RecordStatus, StoreError};

/// In-process store. Every record lives in a watch channel so subscribers see
/// each write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, watch::Sender<Option<GameRecord>>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryStore {
    async fn create(&self, mut record: GameRecord) -> Result<GameRecord, StoreError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Conflict(record.id));
        }
        tracing::debug!(id = %record.id, code = %record.join_code, "Created game record");
        let (tx, _) = watch::channel(Some(record.clone()));
        records.insert(record.id.clone(), tx);
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<GameRecord, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .and_then(|tx| tx.borrow().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_waiting_by_code(&self, code: &str) -> Result<Option<GameRecord>, StoreError> {
        let records = self.records.read().await;
        let found = records
            .values()
            .filter_map(|tx| tx.borrow().clone())
            .find(|r| r.status == RecordStatus::Waiting && r.join_code.eq_ignore_ascii_case(code));
        Ok(found)
    }

    async fn update(&self, record: GameRecord) -> Result<(), StoreError> {
        let records = self.records.read().await;
        let tx = records
            .get(&record.id)
            .ok_or_else(|| StoreError::NotFound(record.id.clone()))?;
        tx.send_replace(Some(record));
        Ok(())
    }

    async fn update_position(&self, id: &str, fen: &str, pgn: &str) -> Result<(), StoreError> {
        let records = self.records.read().await;
        let tx = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut record = tx
            .borrow()
            .clone()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.fen = fen.to_string();
        record.pgn = pgn.to_string();
        tracing::trace!(id, fen, "Record position updated");
        tx.send_replace(Some(record));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let tx = self
            .records
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        tx.send_replace(None);
        tracing::debug!(id, "Deleted game record");
        Ok(())
    }

    async fn subscribe(
        &self,
        id: &str,
    ) -> Result<watch::Receiver<Option<GameRecord>>, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .map(watch::Sender::subscribe)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
