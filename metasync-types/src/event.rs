//! Event types published by a connector.
//!
//! An event asserts either that a record currently exists with the given
//! attributes (`upsert`) or that a previously known record is gone
//! (`delete`). Events are immutable once handed to the engine.

use crate::{RecordKey, RecordKind, SchemaRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Whether an event asserts existence or absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Upsert,
    Delete,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Upsert => f.write_str("upsert"),
            EventType::Delete => f.write_str("delete"),
        }
    }
}

/// An entity observed in the source system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub schema_ref: SchemaRef,
    pub entity_id: String,
    /// Schema-defined attributes. Opaque to the connector.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn new(schema_ref: SchemaRef, entity_id: impl Into<String>) -> Self {
        Self {
            schema_ref,
            entity_id: entity_id.into(),
            attributes: Map::new(),
        }
    }

    /// Adds an attribute, replacing any previous value under `name`.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// A directed relationship between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub schema_ref: SchemaRef,
    pub from_id: String,
    pub to_id: String,
    /// Schema-defined attributes. Opaque to the connector.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Relationship {
    pub fn new(schema_ref: SchemaRef, from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            schema_ref,
            from_id: from_id.into(),
            to_id: to_id.into(),
            attributes: Map::new(),
        }
    }

    /// Adds an attribute, replacing any previous value under `name`.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// The record an event is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Entity(Entity),
    Relationship(Relationship),
}

impl Payload {
    /// Returns the payload's kind.
    pub fn kind(&self) -> RecordKind {
        match self {
            Payload::Entity(_) => RecordKind::Entity,
            Payload::Relationship(_) => RecordKind::Relationship,
        }
    }

    /// Returns the schema reference of the record.
    pub fn schema_ref(&self) -> &SchemaRef {
        match self {
            Payload::Entity(e) => &e.schema_ref,
            Payload::Relationship(r) => &r.schema_ref,
        }
    }

    /// Computes the record's identity key.
    pub fn key(&self) -> RecordKey {
        match self {
            Payload::Entity(e) => RecordKey::entity(e.schema_ref.clone(), &e.entity_id),
            Payload::Relationship(r) => {
                RecordKey::relationship(r.schema_ref.clone(), &r.from_id, &r.to_id)
            }
        }
    }

    /// Builds a minimal payload carrying only the identity fields of `key`.
    pub fn tombstone(key: &RecordKey) -> Self {
        match key {
            RecordKey::Entity { schema, entity_id } => {
                Payload::Entity(Entity::new(schema.clone(), entity_id))
            }
            RecordKey::Relationship {
                schema,
                from_id,
                to_id,
            } => Payload::Relationship(Relationship::new(schema.clone(), from_id, to_id)),
        }
    }
}

impl From<Entity> for Payload {
    fn from(entity: Entity) -> Self {
        Payload::Entity(entity)
    }
}

impl From<Relationship> for Payload {
    fn from(relationship: Relationship) -> Self {
        Payload::Relationship(relationship)
    }
}

/// A single observation handed to the engine for publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub connector_id: String,
    pub payload: Payload,
}

impl Event {
    /// Creates an upsert event.
    pub fn upsert(connector_id: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            event_type: EventType::Upsert,
            connector_id: connector_id.into(),
            payload: payload.into(),
        }
    }

    /// Creates a delete event for a full payload.
    pub fn delete(connector_id: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            event_type: EventType::Delete,
            connector_id: connector_id.into(),
            payload: payload.into(),
        }
    }

    /// Creates a delete event for a record known only by its key.
    pub fn tombstone(connector_id: impl Into<String>, key: &RecordKey) -> Self {
        Self::delete(connector_id, Payload::tombstone(key))
    }

    /// Returns the identity key of the event's record.
    pub fn key(&self) -> RecordKey {
        self.payload.key()
    }

    /// Returns true for upsert events.
    pub fn is_upsert(&self) -> bool {
        self.event_type == EventType::Upsert
    }

    /// Serializes the event to its JSON wire form.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an event from its JSON wire form.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
