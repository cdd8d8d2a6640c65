//! Schema references.
//!
//! A schema reference locates a record's schema in the registry. The
//! accepted form is `urn:<group>:<name>[:<version>]`, e.g.
//! `urn:com.example.catalog:table:1.0.0`.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version assumed when a reference carries none.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// Namespaced identifier of a schema in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaRef(String);

impl SchemaRef {
    /// Parses and validates a schema reference.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidSchemaRef {
            reference: s.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = s.split(':').collect();
        if segments.len() < 3 {
            return Err(invalid("expected urn:<group>:<name>[:<version>]"));
        }
        if segments[0] != "urn" {
            return Err(invalid("must start with 'urn:'"));
        }
        if segments[1].is_empty() {
            return Err(invalid("group segment is empty"));
        }
        if segments[2].is_empty() {
            return Err(invalid("name segment is empty"));
        }

        Ok(Self(s.to_string()))
    }

    /// The registry schema group (second segment).
    pub fn group_id(&self) -> &str {
        self.segment(1).unwrap_or_default()
    }

    /// The schema name within its group (third segment).
    pub fn schema_name(&self) -> &str {
        self.segment(2).unwrap_or_default()
    }

    /// The schema version, or [`DEFAULT_SCHEMA_VERSION`] when absent.
    pub fn version(&self) -> &str {
        match self.segment(3) {
            Some(v) if !v.is_empty() => v,
            _ => DEFAULT_SCHEMA_VERSION,
        }
    }

    /// Returns the full reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segment(&self, index: usize) -> Option<&str> {
        self.0.split(':').nth(index)
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SchemaRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SchemaRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SchemaRef> for String {
    fn from(value: SchemaRef) -> Self {
        value.0
    }
}
