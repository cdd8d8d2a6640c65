//! Reconciliation engine for one connector cycle.
//!
//! The engine is opened with the previous cycle's observed keys, publishes
//! every observation through its sink while tracking it in the
//! [`Manifest`], and on [`finalize_cycle`](ReconciliationEngine::finalize_cycle)
//! tombstones whatever was not reasserted before persisting the new baseline.
//!
//! ```text
//! open ──► Open ──observe*──► finalize_cycle ──► (consumed)
//!            │
//!            └─ fatal error ──► Aborted (nothing is saved)
//! ```
//!
//! Calls are serialized by `&mut self`: one engine per connector process.

use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::export::AuditExport;
use crate::manifest::{KeySet, Manifest};
use crate::sink::{build_sink, DeliveryOutcome, Sink};
use crate::state::{build_state_store, StateStore};
use metasync_types::{Event, EventType};
use tracing::{debug, error, info, warn};

/// Lifecycle of an open engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Accepting observations.
    Open,
    /// A fatal error occurred; the cycle can no longer be finalized.
    Aborted,
}

/// Summary of a finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Distinct keys observed this cycle (the next cycle's baseline).
    pub observed: usize,
    /// Delete events synthesized for disappeared records.
    pub tombstones: usize,
    /// Publish attempts the backend confirmed.
    pub delivered: usize,
    /// Publish attempts answered without confirmation.
    pub unconfirmed: usize,
    /// Publish attempts that failed.
    pub failed: usize,
    /// Whether the new baseline was persisted.
    pub state_saved: bool,
    /// Whether the audit export was written.
    pub export_written: bool,
}

/// Orchestrates state tracking and tombstone emission for one cycle.
pub struct ReconciliationEngine {
    connector_id: String,
    sink: Box<dyn Sink>,
    store: Box<dyn StateStore>,
    export: Option<AuditExport>,
    manifest: Manifest,
    /// Every event handed to the sink this cycle, for the audit export.
    published: Vec<Event>,
    state: CycleState,
    report: CycleReport,
}

impl ReconciliationEngine {
    /// Opens a cycle, loading the previous cycle's keys from `store`.
    pub async fn open(
        connector_id: impl Into<String>,
        sink: Box<dyn Sink>,
        store: Box<dyn StateStore>,
    ) -> Self {
        let connector_id = connector_id.into();
        let prior = store.load().await;
        info!(
            connector_id = %connector_id,
            sink = sink.name(),
            state = store.backend_name(),
            pending_delete = prior.len(),
            "Cycle opened"
        );

        Self {
            connector_id,
            sink,
            store,
            export: None,
            manifest: Manifest::from_prior(prior),
            published: Vec::new(),
            state: CycleState::Open,
            report: CycleReport::default(),
        }
    }

    /// Builds the sink, state store and export from configuration and opens
    /// a cycle.
    pub async fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        config.validate()?;
        let sink = build_sink(&config.sink)?;
        let store = build_state_store(&config.connector_id, &config.state).await?;
        let mut engine = Self::open(&config.connector_id, sink, store).await;
        engine.export = AuditExport::from_config(&config.export);
        Ok(engine)
    }

    /// Writes an audit export of every published event at finalize time.
    #[must_use]
    pub fn with_export(mut self, export: AuditExport) -> Self {
        self.export = Some(export);
        self
    }

    /// Returns the connector identity used for tombstones.
    pub fn connector_id(&self) -> &str {
        &self.connector_id
    }

    /// Returns the current lifecycle state.
    pub fn cycle_state(&self) -> CycleState {
        self.state
    }

    /// Keys from the previous cycle not yet reasserted.
    pub fn pending_delete(&self) -> &KeySet {
        self.manifest.pending_delete()
    }

    /// Keys asserted this cycle.
    pub fn observed(&self) -> &KeySet {
        self.manifest.observed()
    }

    /// Records and publishes one observation.
    ///
    /// An upsert marks its key observed and drains it from `pending_delete`.
    /// An explicit delete drains it without marking it observed. Delivery
    /// failures are reported in the outcome; only fatal errors are returned,
    /// and they abort the cycle.
    pub async fn observe(&mut self, event: Event) -> ConnectorResult<DeliveryOutcome> {
        if self.state == CycleState::Aborted {
            return Err(ConnectorError::CycleAborted);
        }

        let key = event.key();
        match event.event_type {
            EventType::Upsert => {
                if self.manifest.mark_observed(key.clone()) {
                    debug!(key = %key, "Reasserted record from previous cycle");
                }
            }
            EventType::Delete => {
                debug!(key = %key, "Explicit delete");
                self.manifest.mark_deleted(&key);
            }
        }

        self.publish(event).await
    }

    /// Tombstones every record that was not reasserted, then persists the
    /// keys observed this cycle as the next cycle's baseline.
    ///
    /// Consumes the engine: a new cycle needs a freshly opened engine.
    pub async fn finalize_cycle(mut self) -> ConnectorResult<CycleReport> {
        if self.state == CycleState::Aborted {
            return Err(ConnectorError::CycleAborted);
        }

        let disappeared = self.manifest.take_pending_delete();
        info!(count = disappeared.len(), "Publishing tombstones");

        for key in &disappeared {
            let tombstone = Event::tombstone(self.connector_id.clone(), key);
            match self.publish(tombstone).await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(key = %key, "Tombstone could not be published: {e}");
                    self.report.failed += 1;
                }
            }
            self.report.tombstones += 1;
        }

        let observed = self.manifest.observed().clone();
        self.report.observed = observed.len();

        match self.store.save(&observed).await {
            Ok(()) => self.report.state_saved = true,
            Err(e) => warn!(
                backend = self.store.backend_name(),
                "Failed to save connector state; next cycle's reconciliation baseline may be stale: {e}"
            ),
        }

        if let Some(export) = &self.export {
            match export.write(&self.published).await {
                Ok(()) => self.report.export_written = true,
                Err(e) => warn!("Failed to write audit export: {e}"),
            }
        }

        info!(
            observed = self.report.observed,
            tombstones = self.report.tombstones,
            delivered = self.report.delivered,
            unconfirmed = self.report.unconfirmed,
            failed = self.report.failed,
            state_saved = self.report.state_saved,
            "Cycle finalized"
        );
        Ok(self.report)
    }

    async fn publish(&mut self, event: Event) -> ConnectorResult<DeliveryOutcome> {
        let outcome = match self.sink.publish(&event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_fatal() {
                    error!(key = %event.key(), "Fatal error, aborting cycle: {e}");
                    self.state = CycleState::Aborted;
                }
                return Err(e);
            }
        };

        match &outcome {
            DeliveryOutcome::Delivered => self.report.delivered += 1,
            DeliveryOutcome::Unconfirmed { .. } => self.report.unconfirmed += 1,
            DeliveryOutcome::Failed { .. } => self.report.failed += 1,
        }

        self.published.push(event);
        Ok(outcome)
    }
}
