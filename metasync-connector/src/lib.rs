//! Reconciliation-and-publish engine for metasync connectors.
//!
//! A connector feeds the engine one upsert per record it sees in a full sync
//! run. The engine publishes each through a [`Sink`] and, when the run ends,
//! publishes a delete for every record seen in the previous run but not in
//! this one.
//!
//! # Components
//!
//! - **StateStore**: persists the observed-key set between runs (local file
//!   or S3-compatible object storage)
//! - **TokenProvider**: OIDC bearer or mounted service-account credentials
//!   for the registry
//! - **SchemaProvisioner**: creates schema groups and schemas in the
//!   registry on first use
//! - **Sink**: registry gateway or message bus
//! - **ReconciliationEngine**: mark-and-sweep over one cycle
//!
//! # Example
//!
//! ```no_run
//! use metasync_connector::{ConnectorConfig, ReconciliationEngine};
//! use metasync_types::{Entity, Event, SchemaRef};
//!
//! # async fn run() -> metasync_connector::ConnectorResult<()> {
//! let config = ConnectorConfig::from_json_file("connector.json")?;
//! let mut engine = ReconciliationEngine::from_config(&config).await?;
//!
//! let schema = SchemaRef::parse("urn:com.example.catalog:table:1.0.0")?;
//! engine
//!     .observe(Event::upsert(&config.connector_id, Entity::new(schema, "orders")))
//!     .await?;
//!
//! let report = engine.finalize_cycle().await?;
//! println!("{} tombstones", report.tombstones);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod bus;
pub mod config;
mod engine;
mod error;
pub mod export;
pub mod manifest;
pub mod registry;
pub mod sink;
pub mod state;

pub use auth::{Credential, TokenProvider, REFRESH_MARGIN};
pub use bus::{client_config, KafkaProducer, MessageBusSink, MessageKey, MessageProducer};
pub use config::{
    AuthConfig, ConnectorConfig, ExportConfig, MessageBusConfig, ObjectStoreConfig, OidcConfig,
    RegistryConfig, ServiceAccountConfig, SinkConfig, StateConfig,
};
pub use engine::{CycleReport, CycleState, ReconciliationEngine};
pub use error::{ConnectorError, ConnectorResult};
pub use export::AuditExport;
pub use manifest::{KeySet, Manifest};
pub use registry::{RegistryClient, RegistryGatewaySink, SchemaProvisioner};
pub use sink::{build_sink, DeliveryOutcome, Sink};
pub use state::{
    build_state_store, state_object_key, DisabledStateStore, FileStateStore, ObjectStateStore,
    StateStore,
};
