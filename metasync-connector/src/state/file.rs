//! Local-filesystem state backend.

use super::StateStore;
use crate::error::{ConnectorError, ConnectorResult};
use crate::manifest::KeySet;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File name of the persisted key set inside the state directory.
pub const STATE_FILE_NAME: &str = "connectorstate.json";

/// Keeps the key set in `<dir>/connectorstate.json`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STATE_FILE_NAME),
        }
    }

    /// Full path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn try_load(&self) -> ConnectorResult<Option<KeySet>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConnectorError::StateIo(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let keys: KeySet = serde_json::from_str(&raw).map_err(|e| {
            ConnectorError::StateIo(format!("malformed state in {}: {e}", self.path.display()))
        })?;
        debug!("Read {} keys from {}", keys.len(), self.path.display());
        Ok(Some(keys))
    }

    async fn save(&self, observed: &KeySet) -> ConnectorResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ConnectorError::StateIo(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let body = serde_json::to_vec(observed)?;

        // Write beside the target and rename so readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &body).await.map_err(|e| {
            ConnectorError::StateIo(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            ConnectorError::StateIo(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        info!("Saved {} keys to {}", observed.len(), self.path.display());
        Ok(())
    }
}
