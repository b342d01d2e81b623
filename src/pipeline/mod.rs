//! Consume-side processing pipeline.
//!
//! Each raw payload runs through a fixed sequence: decode, enrich, write to
//! the durable store, mirror into the search index. The two writes are
//! independent best-effort operations; a failure in one never blocks the
//! other, and the payload is consumed exactly once either way. Payloads that
//! cannot be decoded at all are recorded as dead-letter rows in the store.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, warn};

use crate::model::{DecodeError, LogEvent};
use crate::search::{LogDocument, SearchIndex};
use crate::storage::{LogStore, NewLogRecord};

/// Version tag stamped into each processed event's metadata.
pub const CONSUMER_VERSION: &str = "2.0";

/// Synthetic identity of dead-letter records.
pub const DLQ_SERVICE: &str = "kafka-dlq";
pub const DLQ_HOST: &str = "kafka-consumer";
pub const DLQ_MESSAGE: &str = "Failed to process Kafka message";

/// Maximum number of characters of the raw payload preserved in a
/// dead-letter record.
const RAW_PAYLOAD_CAP: usize = 500;

/// Decode, enrich and fan out one payload at a time.
pub struct LogPipeline {
    store: Arc<dyn LogStore>,
    index: Arc<dyn SearchIndex>,
}

impl LogPipeline {
    pub fn new(store: Arc<dyn LogStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    /// Process a single raw payload. Never returns an error: every failure
    /// mode ends in a log line, so the caller can commit the offset
    /// unconditionally.
    pub async fn handle_raw(&self, payload: &str) {
        match LogEvent::decode(payload) {
            Ok(mut event) => {
                event.enrich_processing_metadata(CONSUMER_VERSION);
                self.persist(&event).await;
                self.mirror(&event).await;
            }
            Err(e) => {
                warn!(error = %e, "could not decode payload, dead-lettering");
                self.dead_letter(payload, &e).await;
            }
        }
    }

    async fn persist(&self, event: &LogEvent) {
        let record = NewLogRecord {
            service: event.service.clone().unwrap_or_default(),
            level: event.level.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
            host: event.host.clone().unwrap_or_default(),
            metadata: event.metadata.clone().unwrap_or_default(),
        };

        match self.store.put(record).await {
            Ok(stored) => {
                info!(id = %stored.id, service = %stored.service, "log saved to store");
            }
            Err(e) => {
                error!(error = %e, "failed to save log to store");
            }
        }
    }

    async fn mirror(&self, event: &LogEvent) {
        if !self.index.is_available().await {
            warn!("search index not available, skipping indexing");
            return;
        }

        let document = LogDocument::from_event(event);
        match self.index.upsert(&document).await {
            Ok(()) => debug!(id = ?document.id, "log indexed"),
            Err(e) => error!(error = %e, "failed to index log"),
        }
    }

    /// Record an undecodable payload as a dead-letter row. The original
    /// payload is preserved in metadata, truncated so a single oversized
    /// message cannot bloat the row.
    async fn dead_letter(&self, payload: &str, cause: &DecodeError) {
        let metadata = [
            ("error".to_string(), cause.to_string()),
            (
                "failed_at".to_string(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (
                "original_message".to_string(),
                payload.chars().take(RAW_PAYLOAD_CAP).collect(),
            ),
        ]
        .into_iter()
        .collect();

        let record = NewLogRecord {
            service: DLQ_SERVICE.to_string(),
            level: "ERROR".to_string(),
            message: DLQ_MESSAGE.to_string(),
            host: DLQ_HOST.to_string(),
            metadata,
        };

        match self.store.put(record).await {
            Ok(stored) => info!(id = %stored.id, "dead letter recorded"),
            Err(e) => error!(error = %e, "dead letter write failed, payload lost"),
        }
    }
}
