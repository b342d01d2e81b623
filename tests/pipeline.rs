//! End-to-end pipeline tests over the public API, using the in-memory
//! store and index.

use std::sync::Arc;

use chrono::Utc;

use logsleuth::model::LogEvent;
use logsleuth::pipeline::LogPipeline;
use logsleuth::search::MockSearchIndex;
use logsleuth::storage::{LogStore, MockLogStore};

fn pipeline() -> (Arc<MockLogStore>, Arc<MockSearchIndex>, LogPipeline) {
    let store = Arc::new(MockLogStore::new());
    let index = Arc::new(MockSearchIndex::new());
    let pipeline = LogPipeline::new(store.clone(), index.clone());
    (store, index, pipeline)
}

#[tokio::test]
async fn valid_event_flows_to_both_sinks() {
    let (store, index, pipeline) = pipeline();

    let before = Utc::now();
    pipeline
        .handle_raw(r#"{"service":"auth","level":"INFO","message":"login ok","host":"h1"}"#)
        .await;

    let records = store.dump().await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.service, "auth");
    assert_eq!(record.level, "INFO");
    assert_eq!(record.message, "login ok");
    assert_eq!(record.host, "h1");
    // Row identity is generated at write time.
    assert!(!record.id.is_nil());
    assert!(record.timestamp >= before);
    assert_eq!(
        record.metadata.get("kafka_processed").map(String::as_str),
        Some("true")
    );
    assert_eq!(
        record.metadata.get("consumer_version").map(String::as_str),
        Some("2.0")
    );

    let documents = index.dump().await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].service.as_deref(), Some("auth"));
}

#[tokio::test]
async fn producer_shaped_payload_round_trips() {
    let (store, index, pipeline) = pipeline();

    let event = LogEvent::new("billing", "WARN", "slow invoice", "h9");
    let payload = event.to_wire_json().unwrap();
    pipeline.handle_raw(&payload).await;

    let records = store.dump().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].service, "billing");

    let documents = index.dump().await;
    assert_eq!(documents[0].id, event.id);
}

#[tokio::test]
async fn garbage_payload_lands_in_dead_letter_queue() {
    let (store, index, pipeline) = pipeline();

    pipeline.handle_raw("}{ definitely not json").await;

    let records = store.dump().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].service, "kafka-dlq");
    assert_eq!(records[0].level, "ERROR");
    assert_eq!(records[0].host, "kafka-consumer");
    assert_eq!(
        records[0]
            .metadata
            .get("original_message")
            .map(String::as_str),
        Some("}{ definitely not json")
    );
    assert!(index.dump().await.is_empty());

    // Dead letters show up in level queries like any other record.
    let errors = store.by_level("ERROR", 10).await.unwrap();
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn query_paths_see_ingested_records() {
    let (store, _index, pipeline) = pipeline();

    for i in 0..5 {
        pipeline
            .handle_raw(&format!(
                r#"{{"service":"svc-{}","level":"INFO","message":"m{}","host":"h"}}"#,
                i % 2,
                i
            ))
            .await;
    }

    let recent = store.recent(3).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].message, "m4");

    let svc0 = store.by_service("svc-0", 10).await.unwrap();
    assert_eq!(svc0.len(), 3);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.by_level.get("INFO"), Some(&5));
    assert_eq!(stats.by_service.get("svc-1"), Some(&2));
}

#[tokio::test]
async fn each_delivery_writes_its_own_row() {
    let (store, _index, pipeline) = pipeline();

    let payload = r#"{"id":"evt-7","service":"s","level":"L","message":"m","host":"h"}"#;
    pipeline.handle_raw(payload).await;
    pipeline.handle_raw(payload).await;
    pipeline.handle_raw(payload).await;

    let records = store.dump().await;
    assert_eq!(records.len(), 3);
    let mut ids: Vec<_> = records.iter().map(|r| r.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}
