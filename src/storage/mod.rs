//! Durable store adapter.
//!
//! The pipeline writes every decoded event (and every dead letter) through
//! the [`LogStore`] trait. The production implementation is ClickHouse; an
//! in-memory mock backs the tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

pub mod clickhouse;
pub mod mock;

pub use clickhouse::ClickHouseLogStore;
pub use mock::MockLogStore;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying store never came up or went away; operations degrade.
    #[error("store not available")]
    Unavailable,

    #[error("clickhouse error: {0}")]
    Backend(#[from] ::clickhouse::error::Error),
}

/// A record handed to the store for insertion.
///
/// The store assigns identity: `put` generates the row id and timestamp.
#[derive(Debug, Clone, Default)]
pub struct NewLogRecord {
    pub service: String,
    pub level: String,
    pub message: String,
    pub host: String,
    pub metadata: HashMap<String, String>,
}

/// The saved representation returned by `put` and by the read paths.
#[derive(Debug, Clone)]
pub struct StoredLogRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub level: String,
    pub message: String,
    pub host: String,
    pub metadata: HashMap<String, String>,
}

/// Aggregate counters over the store.
///
/// `by_level` and `by_service` are computed over a bounded window of the
/// most recent records, not the full table: an approximation by design.
#[derive(Debug, Clone, Default)]
pub struct LogStats {
    pub total: u64,
    pub by_level: HashMap<String, u64>,
    pub by_service: HashMap<String, u64>,
    pub last: Option<StoredLogRecord>,
}

/// Interface to the durable log store.
///
/// Read paths return records in store-defined order; most recently inserted
/// records tend to surface first, but callers must not rely on strict
/// recency ordering.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert a record under a generated id and a now() timestamp.
    async fn put(&self, record: NewLogRecord) -> Result<StoredLogRecord>;

    /// Up to `limit` records, newest-first by convention.
    async fn recent(&self, limit: u32) -> Result<Vec<StoredLogRecord>>;

    /// Up to `limit` records for one service (indexed lookup).
    async fn by_service(&self, service: &str, limit: u32) -> Result<Vec<StoredLogRecord>>;

    /// Up to `limit` records for one level. Full scan with a filter; there
    /// is no index on `level`.
    async fn by_level(&self, level: &str, limit: u32) -> Result<Vec<StoredLogRecord>>;

    /// Total count plus windowed per-level and per-service counts.
    async fn stats(&self) -> Result<LogStats>;

    /// Remove every stored record.
    async fn clear(&self) -> Result<()>;
}

/// ClickHouse connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// ClickHouse server URL.
    pub url: String,
    /// Database name.
    pub database: String,
    /// Table name for log records.
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "logsleuth".to_string(),
            table: "logs".to_string(),
        }
    }
}
