//! Message bus layer.
//!
//! Raw log events travel through a single Kafka topic as JSON payloads,
//! keyed by event id so redeliveries of the same event land on the same
//! partition.

pub mod kafka;

pub use kafka::{KafkaBusConfig, LogConsumer, LogProducer};

/// Errors that can occur in bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),
}

pub type Result<T> = std::result::Result<T, BusError>;
