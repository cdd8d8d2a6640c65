//! Publish sinks.
//!
//! A [`Sink`] publishes one event to its backend. Two implementations exist:
//! the registry gateway ([`crate::registry::RegistryGatewaySink`]) and the
//! message bus ([`crate::bus::MessageBusSink`]).
//!
//! Delivery problems are reported through [`DeliveryOutcome`], not as
//! errors: the cycle keeps going. Only fatal conditions (credentials, schema
//! provisioning) surface as `Err`.

use crate::bus::{KafkaProducer, MessageBusSink};
use crate::config::SinkConfig;
use crate::error::ConnectorResult;
use crate::registry::RegistryGatewaySink;
use async_trait::async_trait;
use metasync_types::Event;
use std::fmt;

/// What happened to a single publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The backend confirmed the event.
    Delivered,
    /// The backend answered without confirming or rejecting (HTTP 201).
    Unconfirmed { status: u16 },
    /// The backend rejected the event or could not be reached.
    Failed { reason: String },
}

impl DeliveryOutcome {
    /// Returns true if the backend confirmed delivery.
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    /// Returns true if the attempt failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, DeliveryOutcome::Failed { .. })
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => f.write_str("delivered"),
            DeliveryOutcome::Unconfirmed { status } => write!(f, "unconfirmed (HTTP {status})"),
            DeliveryOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Publishes events to one backend.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Returns the name of the sink, for logs.
    fn name(&self) -> &'static str;

    /// Publishes a single event.
    async fn publish(&self, event: &Event) -> ConnectorResult<DeliveryOutcome>;
}

/// Builds the sink selected by configuration.
pub fn build_sink(config: &SinkConfig) -> ConnectorResult<Box<dyn Sink>> {
    let sink: Box<dyn Sink> = match config {
        SinkConfig::Registry(registry) => Box::new(RegistryGatewaySink::new(registry)?),
        SinkConfig::MessageBus(bus) => {
            let producer = KafkaProducer::new(bus)?;
            Box::new(MessageBusSink::new(producer, bus.topic.clone()))
        }
    };
    Ok(sink)
}
