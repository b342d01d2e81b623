//! ClickHouse implementation of the durable log store.
//!
//! One `logs` table on a MergeTree engine, ordered so that recent inserts
//! surface first, with a bloom-filter skipping index on `service`. Lookups
//! by `level` are plain scan-filters; there is no index for them.
//!
//! The client is a process-wide shared handle, created once at startup and
//! used concurrently by every consumer invocation. If the server cannot be
//! reached (or the schema cannot be bootstrapped) at startup, the store is
//! marked unavailable and every operation degrades to a logged no-op or
//! empty result instead of raising.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{LogStats, LogStore, NewLogRecord, Result, StorageConfig, StorageError, StoredLogRecord};

/// Window of recent rows scanned by `stats`. Counting over this window
/// instead of the full table is a deliberate approximation.
const STATS_WINDOW: u32 = 1000;

/// Row structure matching the ClickHouse logs table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
struct LogRow {
    id: String,
    timestamp: i64, // DateTime64(3) stored as Unix milliseconds
    service: String,
    level: String,
    message: String,
    host: String,
    metadata: Vec<(String, String)>, // Map(String, String)
}

impl LogRow {
    fn into_record(self) -> StoredLogRecord {
        StoredLogRecord {
            id: Uuid::parse_str(&self.id).unwrap_or(Uuid::nil()),
            timestamp: DateTime::from_timestamp_millis(self.timestamp)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            service: self.service,
            level: self.level,
            message: self.message,
            host: self.host,
            metadata: self.metadata.into_iter().collect(),
        }
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
             id String, \
             timestamp DateTime64(3), \
             service String, \
             level String, \
             message String, \
             host String, \
             metadata Map(String, String), \
             INDEX idx_service service TYPE bloom_filter GRANULARITY 4\
         ) ENGINE = MergeTree \
         ORDER BY (timestamp, id)"
    )
}

/// ClickHouse-backed log store.
pub struct ClickHouseLogStore {
    /// `None` when startup connectivity or schema bootstrap failed.
    client: Option<Client>,
    config: StorageConfig,
}

impl ClickHouseLogStore {
    /// Connect and bootstrap the schema.
    ///
    /// Never fails: on any startup error the store comes up unavailable and
    /// each operation degrades with a logged warning.
    pub async fn connect(config: StorageConfig) -> Self {
        match Self::bootstrap(&config).await {
            Ok(client) => {
                info!(
                    url = %config.url,
                    database = %config.database,
                    table = %config.table,
                    "connected to ClickHouse"
                );
                Self {
                    client: Some(client),
                    config,
                }
            }
            Err(e) => {
                error!(
                    url = %config.url,
                    error = %e,
                    "ClickHouse unavailable, store operations will degrade"
                );
                Self {
                    client: None,
                    config,
                }
            }
        }
    }

    async fn bootstrap(config: &StorageConfig) -> Result<Client> {
        // The database may not exist yet, so create it through a client
        // without a database context.
        let admin = Client::default().with_url(&config.url);
        admin
            .query(&format!(
                "CREATE DATABASE IF NOT EXISTS {}",
                config.database
            ))
            .execute()
            .await?;

        let client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        client
            .query(&create_table_sql(&config.table))
            .execute()
            .await?;

        let one: u8 = client.query("SELECT 1").fetch_one().await?;
        if one != 1 {
            return Err(StorageError::Unavailable);
        }

        Ok(client)
    }

    /// Check if the server is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        let Some(client) = &self.client else {
            return Ok(false);
        };
        let result: u8 = client.query("SELECT 1").fetch_one().await?;
        Ok(result == 1)
    }

    async fn fetch(&self, sql: &str, binds: Vec<&str>, limit: u32) -> Result<Vec<StoredLogRecord>> {
        let Some(client) = &self.client else {
            warn!("ClickHouse not available, returning no rows");
            return Ok(Vec::new());
        };

        let mut query = client.query(sql);
        for bind in binds {
            query = query.bind(bind);
        }
        let rows = query.bind(limit).fetch_all::<LogRow>().await?;
        Ok(rows.into_iter().map(LogRow::into_record).collect())
    }
}

#[async_trait]
impl LogStore for ClickHouseLogStore {
    async fn put(&self, record: NewLogRecord) -> Result<StoredLogRecord> {
        let Some(client) = &self.client else {
            warn!("ClickHouse not available, dropping log record");
            return Err(StorageError::Unavailable);
        };

        let id = Uuid::new_v4();
        let timestamp = Utc::now();

        let row = LogRow {
            id: id.to_string(),
            timestamp: timestamp.timestamp_millis(),
            service: record.service.clone(),
            level: record.level.clone(),
            message: record.message.clone(),
            host: record.host.clone(),
            metadata: record
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        let mut insert = client.insert(&self.config.table)?;
        insert.write(&row).await?;
        insert.end().await?;

        debug!(service = %record.service, level = %record.level, "log saved");

        Ok(StoredLogRecord {
            id,
            timestamp,
            service: record.service,
            level: record.level,
            message: record.message,
            host: record.host,
            metadata: record.metadata,
        })
    }

    async fn recent(&self, limit: u32) -> Result<Vec<StoredLogRecord>> {
        let sql = format!(
            "SELECT ?fields FROM {} ORDER BY timestamp DESC LIMIT ?",
            self.config.table
        );
        self.fetch(&sql, Vec::new(), limit).await
    }

    async fn by_service(&self, service: &str, limit: u32) -> Result<Vec<StoredLogRecord>> {
        let sql = format!(
            "SELECT ?fields FROM {} WHERE service = ? ORDER BY timestamp DESC LIMIT ?",
            self.config.table
        );
        self.fetch(&sql, vec![service], limit).await
    }

    async fn by_level(&self, level: &str, limit: u32) -> Result<Vec<StoredLogRecord>> {
        // Scan-filter: `level` has no skipping index.
        let sql = format!(
            "SELECT ?fields FROM {} WHERE level = ? ORDER BY timestamp DESC LIMIT ?",
            self.config.table
        );
        self.fetch(&sql, vec![level], limit).await
    }

    async fn stats(&self) -> Result<LogStats> {
        let Some(client) = &self.client else {
            warn!("ClickHouse not available, returning empty stats");
            return Ok(LogStats::default());
        };

        let total: u64 = client
            .query(&format!("SELECT count() FROM {}", self.config.table))
            .fetch_one()
            .await?;

        // Grouped counts come from a bounded recent window, not the full
        // table; see STATS_WINDOW.
        let window = self.recent(STATS_WINDOW).await?;
        let mut by_level: HashMap<String, u64> = HashMap::new();
        let mut by_service: HashMap<String, u64> = HashMap::new();
        for record in &window {
            *by_level.entry(record.level.clone()).or_default() += 1;
            *by_service.entry(record.service.clone()).or_default() += 1;
        }

        Ok(LogStats {
            total,
            by_level,
            by_service,
            last: window.into_iter().next(),
        })
    }

    async fn clear(&self) -> Result<()> {
        let Some(client) = &self.client else {
            warn!("ClickHouse not available, nothing to clear");
            return Ok(());
        };

        client
            .query(&format!("TRUNCATE TABLE {}", self.config.table))
            .execute()
            .await?;

        info!("all logs cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_record_conversion() {
        let row = LogRow {
            id: "6b9f1a30-8a2f-4f6e-9d4f-0f1e2d3c4b5a".to_string(),
            timestamp: 1_700_000_000_500,
            service: "auth".to_string(),
            level: "INFO".to_string(),
            message: "login ok".to_string(),
            host: "h1".to_string(),
            metadata: vec![("region".to_string(), "eu".to_string())],
        };

        let record = row.into_record();
        assert_eq!(
            record.id.to_string(),
            "6b9f1a30-8a2f-4f6e-9d4f-0f1e2d3c4b5a"
        );
        assert_eq!(record.timestamp.timestamp_millis(), 1_700_000_000_500);
        assert_eq!(record.metadata.get("region").map(String::as_str), Some("eu"));
    }

    #[test]
    fn test_schema_sql() {
        let sql = create_table_sql("logs");
        assert!(sql.contains("ENGINE = MergeTree"));
        assert!(sql.contains("Map(String, String)"));
        assert!(sql.contains("INDEX idx_service service TYPE bloom_filter"));
    }

    // Integration tests would require a running ClickHouse instance
}
