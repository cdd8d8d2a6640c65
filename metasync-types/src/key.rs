//! Record identity keys.
//!
//! A [`RecordKey`] uniquely identifies a publishable record within its schema
//! namespace. Keys are what the reconciliation manifest stores between runs,
//! so their serialized form is the persisted state format.

use crate::SchemaRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of record a connector publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Entity,
    Relationship,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Entity => f.write_str("entity"),
            RecordKind::Relationship => f.write_str("relationship"),
        }
    }
}

/// Identity of an entity or relationship.
///
/// Equality is structural. The ordering is total so key sets serialize
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Entity {
        schema: SchemaRef,
        entity_id: String,
    },
    Relationship {
        schema: SchemaRef,
        from_id: String,
        to_id: String,
    },
}

impl RecordKey {
    /// Builds an entity key.
    pub fn entity(schema: SchemaRef, entity_id: impl Into<String>) -> Self {
        RecordKey::Entity {
            schema,
            entity_id: entity_id.into(),
        }
    }

    /// Builds a relationship key.
    pub fn relationship(
        schema: SchemaRef,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
    ) -> Self {
        RecordKey::Relationship {
            schema,
            from_id: from_id.into(),
            to_id: to_id.into(),
        }
    }

    /// Returns which kind of record this key identifies.
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordKey::Entity { .. } => RecordKind::Entity,
            RecordKey::Relationship { .. } => RecordKind::Relationship,
        }
    }

    /// Returns the schema reference the record belongs to.
    pub fn schema(&self) -> &SchemaRef {
        match self {
            RecordKey::Entity { schema, .. } | RecordKey::Relationship { schema, .. } => schema,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Entity { schema, entity_id } => write!(f, "{schema}/{entity_id}"),
            RecordKey::Relationship {
                schema,
                from_id,
                to_id,
            } => write!(f, "{schema}/{from_id}->{to_id}"),
        }
    }
}
