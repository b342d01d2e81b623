//! Kafka transport for log events.
//!
//! One topic carries all raw events as JSON. Message key: the event id,
//! so redeliveries of an event land on the same partition. Publishing is
//! fire-and-forget; delivery failures are logged, never surfaced to the
//! producing caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::{BusError, Result};
use crate::model::LogEvent;
use crate::pipeline::LogPipeline;

/// Configuration for Kafka connections.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct KafkaBusConfig {
    /// Kafka bootstrap servers (comma-separated).
    pub bootstrap_servers: String,
    /// Topic carrying raw log events.
    pub topic: String,
    /// Consumer group ID (required for subscribing).
    pub group_id: Option<String>,
    /// SASL username (optional, for authenticated clusters).
    pub sasl_username: Option<String>,
    /// SASL password (optional, for authenticated clusters).
    pub sasl_password: Option<String>,
    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512).
    pub sasl_mechanism: Option<String>,
    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL).
    pub security_protocol: Option<String>,
    /// SSL CA certificate path (for SSL connections).
    pub ssl_ca_location: Option<String>,
}

impl Default for KafkaBusConfig {
    fn default() -> Self {
        Self::publisher("localhost:9092")
    }
}

impl KafkaBusConfig {
    /// Create config for publishing only.
    pub fn publisher(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            topic: "raw-logs".to_string(),
            group_id: None,
            sasl_username: None,
            sasl_password: None,
            sasl_mechanism: None,
            security_protocol: None,
            ssl_ca_location: None,
        }
    }

    /// Create config for consuming.
    pub fn subscriber(
        bootstrap_servers: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            ..Self::publisher(bootstrap_servers)
        }
    }

    /// Add SASL authentication.
    pub fn with_sasl(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        mechanism: impl Into<String>,
    ) -> Self {
        self.sasl_username = Some(username.into());
        self.sasl_password = Some(password.into());
        self.sasl_mechanism = Some(mechanism.into());
        self.security_protocol = Some("SASL_SSL".to_string());
        self
    }

    /// Set security protocol.
    pub fn with_security_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.security_protocol = Some(protocol.into());
        self
    }

    /// Set SSL CA certificate location.
    pub fn with_ssl_ca(mut self, ca_location: impl Into<String>) -> Self {
        self.ssl_ca_location = Some(ca_location.into());
        self
    }

    /// Set the topic name.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Build a ClientConfig for producers.
    fn build_producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config.set("message.timeout.ms", "5000");
        config.set("acks", "all");

        self.apply_security_config(&mut config);
        config
    }

    /// Build a ClientConfig for consumers.
    fn build_consumer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config.set("enable.auto.commit", "false");
        config.set("auto.offset.reset", "earliest");

        if let Some(ref group_id) = self.group_id {
            config.set("group.id", group_id);
        }

        self.apply_security_config(&mut config);
        config
    }

    /// Apply security settings to a ClientConfig.
    fn apply_security_config(&self, config: &mut ClientConfig) {
        if let Some(ref protocol) = self.security_protocol {
            config.set("security.protocol", protocol);
        }

        if let Some(ref mechanism) = self.sasl_mechanism {
            config.set("sasl.mechanism", mechanism);
        }

        if let Some(ref username) = self.sasl_username {
            config.set("sasl.username", username);
        }

        if let Some(ref password) = self.sasl_password {
            config.set("sasl.password", password);
        }

        if let Some(ref ca_location) = self.ssl_ca_location {
            config.set("ssl.ca.location", ca_location);
        }
    }
}

/// Publisher of raw log events.
pub struct LogProducer {
    producer: FutureProducer,
    config: KafkaBusConfig,
}

impl LogProducer {
    pub fn new(config: KafkaBusConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .build_producer_config()
            .create()
            .map_err(|e| BusError::Connection(format!("Failed to create Kafka producer: {}", e)))?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            topic = %config.topic,
            "Connected to Kafka"
        );

        Ok(Self { producer, config })
    }

    /// Publish one event, fire-and-forget. Missing identity fields are
    /// filled in before serialization so every payload on the wire carries
    /// an id and a timestamp.
    pub async fn send(&self, event: LogEvent) {
        let event = event.with_identity();
        let key = event.id.clone().unwrap_or_default();

        let payload = match event.to_wire_json() {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to serialize log event, not sent");
                return;
            }
        };

        let record = FutureRecord::to(&self.config.topic)
            .key(&key)
            .payload(&payload);

        match self.producer.send(record, Duration::from_secs(5)).await {
            Ok(_) => {
                debug!(topic = %self.config.topic, key = %key, "log event published");
            }
            Err((e, _)) => {
                error!(error = %e, key = %key, "failed to publish log event");
            }
        }
    }

    /// Build and publish an event from its four core fields.
    pub async fn send_parts(&self, service: &str, level: &str, message: &str, host: &str) {
        self.send(LogEvent::new(service, level, message, host)).await;
    }

    /// Publish a canned connectivity-check event.
    pub async fn send_test_message(&self) {
        let mut event = LogEvent::new("test-service", "INFO", "Test message from producer", "localhost");
        let metadata: &mut HashMap<String, String> = event.metadata.get_or_insert_with(HashMap::new);
        metadata.insert("test".to_string(), "true".to_string());
        metadata.insert(
            "timestamp".to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        self.send(event).await;
    }
}

/// Consumer feeding raw payloads into the processing pipeline.
///
/// Offsets are committed after every payload, processed or not: the
/// pipeline turns failures into dead-letter rows, so redelivering a
/// malformed message would only duplicate them.
pub struct LogConsumer {
    consumer: Arc<StreamConsumer>,
    pipeline: Arc<LogPipeline>,
    config: KafkaBusConfig,
}

impl LogConsumer {
    pub fn new(config: KafkaBusConfig, pipeline: Arc<LogPipeline>) -> Result<Self> {
        if config.group_id.is_none() {
            return Err(BusError::Subscribe(
                "No group_id configured. Use KafkaBusConfig::subscriber()".to_string(),
            ));
        }

        let consumer: StreamConsumer = config
            .build_consumer_config()
            .create()
            .map_err(|e| BusError::Connection(format!("Failed to create Kafka consumer: {}", e)))?;

        Ok(Self {
            consumer: Arc::new(consumer),
            pipeline,
            config,
        })
    }

    /// Subscribe and spawn the consume loop.
    pub fn start(&self) -> Result<()> {
        self.consumer
            .subscribe(&[&self.config.topic])
            .map_err(|e| BusError::Subscribe(format!("Failed to subscribe to topic: {}", e)))?;

        info!(topic = %self.config.topic, group_id = ?self.config.group_id, "Subscribed to Kafka topic");

        let consumer = self.consumer.clone();
        let pipeline = self.pipeline.clone();

        tokio::spawn(async move {
            use futures::StreamExt;
            use rdkafka::message::Message as KafkaMessage;

            let mut stream = consumer.stream();

            while let Some(result) = stream.next().await {
                match result {
                    Ok(message) => {
                        if let Some(bytes) = message.payload() {
                            let payload = String::from_utf8_lossy(bytes);

                            debug!(
                                topic = %message.topic(),
                                partition = message.partition(),
                                offset = message.offset(),
                                "received log event"
                            );

                            pipeline.handle_raw(&payload).await;
                        } else {
                            warn!("received message with no payload");
                        }

                        if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                            error!(error = %e, "failed to commit offset");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Kafka consumer error");
                    }
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests;
