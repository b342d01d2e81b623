//! Mock LogStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LogStats, LogStore, NewLogRecord, Result, StorageError, StoredLogRecord};

/// Mock log store that keeps records in memory, newest last.
#[derive(Default)]
pub struct MockLogStore {
    records: RwLock<Vec<StoredLogRecord>>,
    fail_on_put: RwLock<bool>,
}

impl MockLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail as if the store were down.
    pub async fn set_fail_on_put(&self, fail: bool) {
        *self.fail_on_put.write().await = fail;
    }

    /// Snapshot of everything stored, oldest first.
    pub async fn dump(&self) -> Vec<StoredLogRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl LogStore for MockLogStore {
    async fn put(&self, record: NewLogRecord) -> Result<StoredLogRecord> {
        if *self.fail_on_put.read().await {
            return Err(StorageError::Unavailable);
        }

        let stored = StoredLogRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            service: record.service,
            level: record.level,
            message: record.message,
            host: record.host,
            metadata: record.metadata,
        };
        self.records.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<StoredLogRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn by_service(&self, service: &str, limit: u32) -> Result<Vec<StoredLogRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.service == service)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn by_level(&self, level: &str, limit: u32) -> Result<Vec<StoredLogRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.level == level)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<LogStats> {
        let window = self.recent(1000).await?;
        let mut by_level: HashMap<String, u64> = HashMap::new();
        let mut by_service: HashMap<String, u64> = HashMap::new();
        for record in &window {
            *by_level.entry(record.level.clone()).or_default() += 1;
            *by_service.entry(record.service.clone()).or_default() += 1;
        }
        Ok(LogStats {
            total: self.records.read().await.len() as u64,
            by_level,
            by_service,
            last: window.into_iter().next(),
        })
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}
