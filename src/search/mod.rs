//! Search index adapter.
//!
//! Decoded events are mirrored into a document index for text and field
//! queries. The index is strictly best-effort: the pipeline probes
//! availability before each upsert and skips silently when the index is
//! down. Query patterns over the index are out of scope here.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::LogEvent;

pub mod elastic;
pub mod mock;

pub use elastic::ElasticSearchIndex;
pub use mock::MockSearchIndex;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index rejected document: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Document mirrored into the search index.
///
/// `service`, `level` and `host` are exact-match classification fields;
/// `message` is full text.
#[derive(Debug, Clone, Serialize)]
pub struct LogDocument {
    pub id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub service: Option<String>,
    pub level: Option<String>,
    pub message: Option<String>,
    pub host: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl LogDocument {
    /// Derive a document from a decoded event. The timestamp falls back to
    /// now() when the event carries none.
    pub fn from_event(event: &LogEvent) -> Self {
        Self {
            id: event.id.clone(),
            timestamp: event.timestamp.unwrap_or_else(Utc::now),
            service: event.service.clone(),
            level: event.level.clone(),
            message: event.message.clone(),
            host: event.host.clone(),
            metadata: event.metadata.clone().unwrap_or_default(),
        }
    }
}

/// Interface to the search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Best-effort liveness probe.
    async fn is_available(&self) -> bool;

    /// Upsert a document, idempotent by document id. Callers log and
    /// swallow failures; an index error never stalls the pipeline.
    async fn upsert(&self, document: &LogDocument) -> Result<(), SearchError>;
}

/// Elasticsearch connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Elasticsearch base URL.
    pub url: String,
    /// Index name prefix; one index per day (`{prefix}-YYYY-MM-DD`).
    pub index_prefix: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index_prefix: "logs".to_string(),
            timeout_secs: 10,
        }
    }
}
