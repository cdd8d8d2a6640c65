//! Error types for the connector engine.

use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors that can occur while reconciling and publishing.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Credential acquisition failed. No further publish can be authenticated.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Schema group or schema creation failed in the registry.
    #[error("provisioning failed for {schema}: {reason}")]
    Provisioning { schema: String, reason: String },

    /// A publish call failed at the transport or broker level.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Reading or writing persisted state failed.
    #[error("state I/O error: {0}")]
    StateIo(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or incomplete configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A record or event type error.
    #[error(transparent)]
    Types(#[from] metasync_types::Error),

    /// The cycle was aborted by an earlier fatal error.
    #[error("cycle aborted by an earlier fatal error")]
    CycleAborted,
}

impl ConnectorError {
    /// Returns true if the error must abort the whole run.
    ///
    /// Fatal errors leave the manifest unsaved so an inconsistent baseline is
    /// never committed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConnectorError::Auth(_)
                | ConnectorError::Provisioning { .. }
                | ConnectorError::Config(_)
                | ConnectorError::CycleAborted
        )
    }

    pub(crate) fn provisioning(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        ConnectorError::Provisioning {
            schema: schema.into(),
            reason: reason.into(),
        }
    }
}
