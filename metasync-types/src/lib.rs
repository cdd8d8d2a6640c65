//! Core type definitions for metasync.
//!
//! This crate defines the types shared by the connector
//! engine and its sinks:
//! - Schema references (`urn:<group>:<name>[:<version>]`)
//! - Record identity keys for entities and relationships
//! - Upsert / delete events and their payloads
//!
//! Nothing here performs I/O.

mod event;
mod key;
mod schema;

pub use event::{Entity, Event, EventType, Payload, Relationship};
pub use key::{RecordKey, RecordKind};
pub use schema::{SchemaRef, DEFAULT_SCHEMA_VERSION};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid schema reference '{reference}': {reason}")]
    InvalidSchemaRef { reference: String, reason: String },
}
