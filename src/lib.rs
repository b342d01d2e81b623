//! Asynchronous log ingestion pipeline.
//!
//! Log events enter through a Kafka topic as JSON, are decoded with a
//! strict-then-tolerant two-tier scheme, enriched with processing
//! metadata, and fanned out best-effort to a ClickHouse column store and
//! an Elasticsearch index. Payloads that cannot be decoded become
//! dead-letter rows in the store.

pub mod bus;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod search;
pub mod storage;
pub mod utils;
