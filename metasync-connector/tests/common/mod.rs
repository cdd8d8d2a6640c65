//! Shared test doubles for connector tests.

#![allow(dead_code)]

use async_trait::async_trait;
use metasync_connector::{
    ConnectorError, ConnectorResult, DeliveryOutcome, KeySet, Sink, StateStore,
};
use metasync_types::{Entity, Event, RecordKey, Relationship, SchemaRef};
use std::sync::{Arc, Mutex};

pub const CONNECTOR_ID: &str = "conn-test";

pub fn schema(name: &str) -> SchemaRef {
    SchemaRef::parse(&format!("urn:com.example.catalog:{name}:1.0.0")).unwrap()
}

pub fn entity_key(id: &str) -> RecordKey {
    RecordKey::entity(schema("table"), id)
}

pub fn relationship_key(from: &str, to: &str) -> RecordKey {
    RecordKey::relationship(schema("contains"), from, to)
}

pub fn upsert_entity(id: &str) -> Event {
    Event::upsert(
        CONNECTOR_ID,
        Entity::new(schema("table"), id).with_attribute("name", id),
    )
}

pub fn upsert_relationship(from: &str, to: &str) -> Event {
    Event::upsert(CONNECTOR_ID, Relationship::new(schema("contains"), from, to))
}

pub fn upsert_for(key: &RecordKey) -> Event {
    let mut event = Event::tombstone(CONNECTOR_ID, key);
    event.event_type = metasync_types::EventType::Upsert;
    event
}

pub fn keys(items: impl IntoIterator<Item = RecordKey>) -> KeySet {
    items.into_iter().collect()
}

/// Sink that records every event it is asked to publish.
#[derive(Clone)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<Event>>>,
    outcome: DeliveryOutcome,
    fatal_on: Option<RecordKey>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            outcome: DeliveryOutcome::Delivered,
            fatal_on: None,
        }
    }

    /// Every publish returns `outcome`.
    pub fn with_outcome(mut self, outcome: DeliveryOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Publishing `key` fails with a provisioning error.
    pub fn fatal_on(mut self, key: RecordKey) -> Self {
        self.fatal_on = Some(key);
        self
    }

    pub fn published(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Event> {
        self.published()
            .into_iter()
            .filter(|e| !e.is_upsert())
            .collect()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, event: &Event) -> ConnectorResult<DeliveryOutcome> {
        if self.fatal_on.as_ref() == Some(&event.key()) {
            return Err(ConnectorError::Provisioning {
                schema: event.payload.schema_ref().to_string(),
                reason: "registry unavailable".to_string(),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(self.outcome.clone())
    }
}

/// In-memory state store.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    pub prior: Option<KeySet>,
    pub saved: Arc<Mutex<Option<KeySet>>>,
    pub fail_load: bool,
    pub fail_save: bool,
}

impl MemoryStateStore {
    pub fn with_prior(prior: KeySet) -> Self {
        Self {
            prior: Some(prior),
            ..Default::default()
        }
    }

    pub fn saved(&self) -> Option<KeySet> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn try_load(&self) -> ConnectorResult<Option<KeySet>> {
        if self.fail_load {
            return Err(ConnectorError::StateIo("load failed".to_string()));
        }
        Ok(self.prior.clone())
    }

    async fn save(&self, observed: &KeySet) -> ConnectorResult<()> {
        if self.fail_save {
            return Err(ConnectorError::StateIo("save failed".to_string()));
        }
        *self.saved.lock().unwrap() = Some(observed.clone());
        Ok(())
    }
}
