//! Producer seam over the Kafka client.

use crate::config::MessageBusConfig;
use crate::error::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::info;

/// Sends raw keyed messages to a topic.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Enqueues one message and waits for the broker acknowledgment.
    async fn send(&self, topic: &str, key: &[u8], value: &[u8]) -> ConnectorResult<()>;

    /// Blocks until every queued message is delivered or has failed.
    async fn flush(&self) -> ConnectorResult<()>;
}

/// Builds the librdkafka client configuration for a SASL-over-TLS producer.
pub fn client_config(config: &MessageBusConfig) -> ClientConfig {
    let mut client = ClientConfig::new();

    client
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("security.protocol", "SASL_SSL")
        .set("sasl.mechanism", &config.sasl_mechanism)
        .set("sasl.username", &config.username)
        .set("sasl.password", &config.password)
        .set(
            "enable.ssl.certificate.verification",
            config.verify_certificates.to_string(),
        )
        .set("message.timeout.ms", config.delivery_timeout_ms.to_string());

    if !config.verify_certificates {
        client.set("ssl.endpoint.identification.algorithm", "none");
    }

    // Pass-through properties can override any of the above.
    for (key, value) in &config.properties {
        client.set(key, value);
    }

    client
}

/// [`MessageProducer`] backed by an rdkafka [`FutureProducer`].
pub struct KafkaProducer {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaProducer {
    /// Creates a producer from configuration.
    pub fn new(config: &MessageBusConfig) -> ConnectorResult<Self> {
        info!(
            bootstrap_servers = %config.bootstrap_servers,
            user = %config.username,
            topic = %config.topic,
            "Message bus sink"
        );

        let producer: FutureProducer = client_config(config)
            .create()
            .map_err(|e| ConnectorError::Config(format!("failed to create Kafka producer: {e}")))?;

        Ok(Self {
            producer,
            timeout: Duration::from_millis(config.delivery_timeout_ms),
        })
    }
}

#[async_trait]
impl MessageProducer for KafkaProducer {
    async fn send(&self, topic: &str, key: &[u8], value: &[u8]) -> ConnectorResult<()> {
        let record = FutureRecord::to(topic).key(key).payload(value);
        self.producer
            .send(record, self.timeout)
            .await
            .map_err(|(e, _)| ConnectorError::Delivery(format!("broker rejected message: {e}")))?;
        Ok(())
    }

    async fn flush(&self) -> ConnectorResult<()> {
        self.producer
            .flush(self.timeout)
            .map_err(|e| ConnectorError::Delivery(format!("flush failed: {e}")))
    }
}
