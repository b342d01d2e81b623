//! Log event model and wire codec.
//!
//! `LogEvent` is the unit of work flowing through the pipeline. It is
//! serialized once by the producer, deserialized once by the consumer
//! (with a tolerant fallback for malformed payloads), enriched once with
//! processing metadata, then treated as immutable by the storage adapters.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Errors produced while decoding a raw broker payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

/// A log event on the wire and in flight through the consumer.
///
/// Every field is optional: external producers are only required to send a
/// JSON object, and the tolerant decode tier leaves missing fields unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogEvent {
    /// Globally unique identifier; broker partition key. Immutable once set.
    pub id: Option<String>,
    pub service: Option<String>,
    pub level: Option<String>,
    pub message: Option<String>,
    pub host: Option<String>,
    /// Generation time. Defaults to ingestion time when the producer omits it.
    pub timestamp: Option<DateTime<Utc>>,
    /// Open-ended string-to-string annotations.
    pub metadata: Option<HashMap<String, String>>,
}

/// Canonical wire shape. Field order is the contract:
/// id, service, level, message, host, timestamp, metadata.
#[derive(Serialize)]
struct WireLogEvent<'a> {
    id: Option<&'a str>,
    service: Option<&'a str>,
    level: Option<&'a str>,
    message: Option<&'a str>,
    host: Option<&'a str>,
    timestamp: String,
    metadata: &'a HashMap<String, String>,
}

impl LogEvent {
    /// Create an event with generated identity and empty metadata.
    pub fn new(
        service: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            service: Some(service.into()),
            level: Some(level.into()),
            message: Some(message.into()),
            host: Some(host.into()),
            timestamp: Some(Utc::now()),
            metadata: Some(HashMap::new()),
        }
    }

    /// Fill `id` and `timestamp` if absent. Present values are never replaced.
    pub fn with_identity(mut self) -> Self {
        if self.id.is_none() {
            self.id = Some(Uuid::new_v4().to_string());
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
        self
    }

    /// Canonical JSON encoding.
    ///
    /// `timestamp` is always rendered as an ISO-8601 string (now() if unset)
    /// and `metadata` is always rendered as an object, even when absent.
    pub fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        let empty = HashMap::new();
        let wire = WireLogEvent {
            id: self.id.as_deref(),
            service: self.service.as_deref(),
            level: self.level.as_deref(),
            message: self.message.as_deref(),
            host: self.host.as_deref(),
            timestamp: self
                .timestamp
                .unwrap_or_else(Utc::now)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata: self.metadata.as_ref().unwrap_or(&empty),
        };
        serde_json::to_string(&wire)
    }

    /// Two-tier decode of a raw broker payload.
    ///
    /// Tier one is a strict typed deserialization. When that fails (wrong
    /// types, unknown fields), tier two re-reads the payload as a generic
    /// JSON tree and extracts each field individually, leaving missing
    /// fields unset. Payloads that are not JSON objects fail both tiers.
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        match serde_json::from_str::<LogEvent>(payload) {
            Ok(event) => Ok(event),
            Err(strict_err) => {
                debug!(error = %strict_err, "strict decode failed, trying tolerant decode");
                Self::decode_lenient(payload)
            }
        }
    }

    /// Field-by-field extraction from a generic JSON tree.
    fn decode_lenient(payload: &str) -> Result<Self, DecodeError> {
        let root: serde_json::Value = serde_json::from_str(payload)?;
        let obj = root.as_object().ok_or(DecodeError::NotAnObject)?;

        let text = |key: &str| -> Option<String> {
            obj.get(key).and_then(|v| v.as_str()).map(str::to_string)
        };

        let timestamp = match obj.get("timestamp") {
            Some(node) => Self::parse_timestamp(node)?,
            None => None,
        };

        let metadata = obj
            .get("metadata")
            .and_then(|v| v.as_object())
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| {
                        let value = v
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| v.to_string());
                        (k.clone(), value)
                    })
                    .collect::<HashMap<String, String>>()
            });

        Ok(Self {
            id: text("id"),
            service: text("service"),
            level: text("level"),
            message: text("message"),
            host: text("host"),
            timestamp,
            metadata,
        })
    }

    /// Accept either an ISO-8601 string or numeric epoch seconds with an
    /// optional fraction (converted to seconds plus nanosecond remainder).
    /// Any other node type (null, bool, object) leaves the timestamp unset;
    /// only strings and numbers that claim to be timestamps can fail.
    fn parse_timestamp(node: &serde_json::Value) -> Result<Option<DateTime<Utc>>, DecodeError> {
        if let Some(text) = node.as_str() {
            return DateTime::parse_from_rfc3339(text)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| DecodeError::Timestamp(format!("{text}: {e}")));
        }
        if let Some(seconds) = node.as_f64() {
            let sec = seconds as i64;
            let nanos = ((seconds - sec as f64) * 1_000_000_000.0).round() as u32;
            return DateTime::from_timestamp(sec, nanos)
                .map(Some)
                .ok_or_else(|| DecodeError::Timestamp(format!("epoch out of range: {seconds}")));
        }
        Ok(None)
    }

    /// Append processing provenance after a successful decode.
    ///
    /// Inserts `kafka_processed`, `processed_at` and `consumer_version`,
    /// creating the metadata map if absent. Idempotent under redelivery:
    /// existing keys are overwritten, never duplicated.
    pub fn enrich_processing_metadata(&mut self, consumer_version: &str) {
        let metadata = self.metadata.get_or_insert_with(HashMap::new);
        metadata.insert("kafka_processed".to_string(), "true".to_string());
        metadata.insert(
            "processed_at".to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        metadata.insert(
            "consumer_version".to_string(),
            consumer_version.to_string(),
        );
    }
}
