//! Audit export of published events.
//!
//! Write-only: the export is for operators and debugging, the connector
//! never reads it back.

use crate::config::ExportConfig;
use crate::error::{ConnectorError, ConnectorResult};
use metasync_types::Event;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// File name of the export inside the export directory.
pub const EXPORT_FILE_NAME: &str = "connector_export.json";

/// Writes every event published in a cycle as one JSON array.
#[derive(Debug, Clone)]
pub struct AuditExport {
    path: PathBuf,
}

impl AuditExport {
    /// Creates an export into `<dir>/connector_export.json`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(EXPORT_FILE_NAME),
        }
    }

    /// Returns an export when enabled by configuration.
    pub fn from_config(config: &ExportConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(&config.dir))
    }

    /// Full path of the export file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the export with `events`.
    pub async fn write(&self, events: &[Event]) -> ConnectorResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ConnectorError::StateIo(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let body = serde_json::to_vec(events)?;
        fs::write(&self.path, body).await.map_err(|e| {
            ConnectorError::StateIo(format!("failed to write {}: {e}", self.path.display()))
        })?;

        info!("Exported {} events to {}", events.len(), self.path.display());
        Ok(())
    }
}
