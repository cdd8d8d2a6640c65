//! Persisted reconciliation state.
//!
//! A [`StateStore`] keeps the observed-key set of the last finished cycle so
//! the next run can detect disappeared records. Two real backends exist
//! (local file, S3-compatible object storage) plus a disabled store for
//! connectors that only publish.

pub mod file;
pub mod object;

pub use file::FileStateStore;
pub use object::{state_object_key, ObjectStateStore};

use crate::config::StateConfig;
use crate::error::ConnectorResult;
use crate::manifest::KeySet;
use async_trait::async_trait;
use tracing::{info, warn};

/// Abstract persisted-state interface.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns the name of the backend, for logs.
    fn backend_name(&self) -> &'static str;

    /// Loads the previous cycle's keys. `Ok(None)` means no state exists yet.
    async fn try_load(&self) -> ConnectorResult<Option<KeySet>>;

    /// Persists the keys observed this cycle.
    async fn save(&self, observed: &KeySet) -> ConnectorResult<()>;

    /// Loads the previous cycle's keys, treating absence and any failure as
    /// an empty prior state.
    async fn load(&self) -> KeySet {
        match self.try_load().await {
            Ok(Some(keys)) => {
                info!(
                    backend = self.backend_name(),
                    keys = keys.len(),
                    "Loaded connector state"
                );
                keys
            }
            Ok(None) => {
                info!(backend = self.backend_name(), "No prior connector state");
                KeySet::new()
            }
            Err(e) => {
                warn!(
                    backend = self.backend_name(),
                    "Failed to load connector state, starting from empty: {e}"
                );
                KeySet::new()
            }
        }
    }
}

/// State store that never persists anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStateStore;

#[async_trait]
impl StateStore for DisabledStateStore {
    fn backend_name(&self) -> &'static str {
        "disabled"
    }

    async fn try_load(&self) -> ConnectorResult<Option<KeySet>> {
        Ok(None)
    }

    async fn save(&self, _observed: &KeySet) -> ConnectorResult<()> {
        Ok(())
    }
}

/// Builds the state store selected by configuration.
pub async fn build_state_store(
    connector_id: &str,
    config: &StateConfig,
) -> ConnectorResult<Box<dyn StateStore>> {
    let store: Box<dyn StateStore> = match config {
        StateConfig::Disabled => Box::new(DisabledStateStore),
        StateConfig::File { dir } => Box::new(FileStateStore::new(dir)),
        StateConfig::ObjectStore(cfg) => Box::new(ObjectStateStore::new(connector_id, cfg).await?),
    };
    Ok(store)
}
