use super::*;

#[test]
fn test_publisher_config_defaults() {
    let config = KafkaBusConfig::publisher("localhost:9092");
    assert_eq!(config.bootstrap_servers, "localhost:9092");
    assert_eq!(config.topic, "raw-logs");
    assert!(config.group_id.is_none());
    assert!(config.security_protocol.is_none());
}

#[test]
fn test_subscriber_config_carries_group() {
    let config = KafkaBusConfig::subscriber("broker:9092", "log-consumers");
    assert_eq!(config.bootstrap_servers, "broker:9092");
    assert_eq!(config.group_id.as_deref(), Some("log-consumers"));
    assert_eq!(config.topic, "raw-logs");
}

#[test]
fn test_with_sasl_sets_sasl_ssl() {
    let config = KafkaBusConfig::publisher("broker:9092").with_sasl("user", "pass", "PLAIN");
    assert_eq!(config.sasl_username.as_deref(), Some("user"));
    assert_eq!(config.sasl_password.as_deref(), Some("pass"));
    assert_eq!(config.sasl_mechanism.as_deref(), Some("PLAIN"));
    assert_eq!(config.security_protocol.as_deref(), Some("SASL_SSL"));
}

#[test]
fn test_with_security_protocol_override() {
    let config =
        KafkaBusConfig::publisher("broker:9092").with_security_protocol("SASL_PLAINTEXT");
    assert_eq!(config.security_protocol.as_deref(), Some("SASL_PLAINTEXT"));
}

#[test]
fn test_with_ssl_ca() {
    let config = KafkaBusConfig::publisher("broker:9092").with_ssl_ca("/etc/ssl/ca.pem");
    assert_eq!(config.ssl_ca_location.as_deref(), Some("/etc/ssl/ca.pem"));
}

#[test]
fn test_with_topic_override() {
    let config = KafkaBusConfig::publisher("broker:9092").with_topic("raw-logs-staging");
    assert_eq!(config.topic, "raw-logs-staging");
}

#[test]
fn test_default_matches_publisher() {
    let config = KafkaBusConfig::default();
    assert_eq!(config.bootstrap_servers, "localhost:9092");
    assert_eq!(config.topic, "raw-logs");
    assert!(config.group_id.is_none());
}
