//! Message bus publish path.

use super::producer::MessageProducer;
use crate::error::ConnectorResult;
use crate::sink::{DeliveryOutcome, Sink};
use async_trait::async_trait;
use metasync_types::{Event, Payload, SchemaRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Message key derived from a record's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageKey {
    Entity {
        connector_id: String,
        schema_ref: SchemaRef,
        entity_id: String,
    },
    Relationship {
        connector_id: String,
        schema_ref: SchemaRef,
        from_id: String,
        to_id: String,
    },
}

impl MessageKey {
    /// Builds the key for an event, dispatching on the payload kind.
    pub fn for_event(event: &Event) -> Self {
        match &event.payload {
            Payload::Entity(e) => MessageKey::Entity {
                connector_id: event.connector_id.clone(),
                schema_ref: e.schema_ref.clone(),
                entity_id: e.entity_id.clone(),
            },
            Payload::Relationship(r) => MessageKey::Relationship {
                connector_id: event.connector_id.clone(),
                schema_ref: r.schema_ref.clone(),
                from_id: r.from_id.clone(),
                to_id: r.to_id.clone(),
            },
        }
    }
}

/// Publishes events as keyed messages on one topic.
///
/// Every send is followed by a synchronous flush: no batching, and broker
/// errors surface on the event that caused them.
pub struct MessageBusSink<P> {
    producer: P,
    topic: String,
}

impl<P: MessageProducer> MessageBusSink<P> {
    pub fn new(producer: P, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }

    /// Returns the target topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the underlying producer.
    pub fn producer(&self) -> &P {
        &self.producer
    }
}

#[async_trait]
impl<P: MessageProducer + 'static> Sink for MessageBusSink<P> {
    fn name(&self) -> &'static str {
        "message-bus"
    }

    async fn publish(&self, event: &Event) -> ConnectorResult<DeliveryOutcome> {
        let key = serde_json::to_vec(&MessageKey::for_event(event))?;
        let value = event.to_json()?;
        debug!(
            event_type = %event.event_type,
            key = %event.key(),
            topic = %self.topic,
            "Sending message"
        );

        if let Err(e) = self
            .producer
            .send(&self.topic, &key, value.as_bytes())
            .await
        {
            error!(key = %event.key(), "Message send failed: {e}");
            return Ok(DeliveryOutcome::Failed {
                reason: e.to_string(),
            });
        }

        if let Err(e) = self.producer.flush().await {
            error!(key = %event.key(), "Message flush failed: {e}");
            return Ok(DeliveryOutcome::Failed {
                reason: e.to_string(),
            });
        }

        Ok(DeliveryOutcome::Delivered)
    }
}
