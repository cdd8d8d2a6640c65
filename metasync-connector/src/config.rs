//! Connector configuration.
//!
//! A connector is configured by a single JSON document. Every section has a
//! default so partial documents are accepted; [`ConnectorConfig::validate`]
//! rejects combinations that cannot run.

use crate::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default path of a mounted Kubernetes service-account token.
pub const DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Top-level connector configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Unique connector identity. Also seeds the object-storage state key.
    pub connector_id: String,
    /// Where events are published.
    pub sink: SinkConfig,
    /// Where the reconciliation manifest is persisted between runs.
    pub state: StateConfig,
    /// Optional audit export of every published event.
    pub export: ExportConfig,
}

impl ConnectorConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ConnectorError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every required field for the selected backends is set.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.connector_id.trim().is_empty() {
            return Err(ConnectorError::Config("connector_id is required".to_string()));
        }

        match &self.sink {
            SinkConfig::Registry(registry) => {
                require("sink.base_url", &registry.base_url)?;
                match &registry.auth {
                    AuthConfig::None => {}
                    AuthConfig::Oidc(oidc) => {
                        require("sink.auth.token_url", &oidc.token_url)?;
                        require("sink.auth.client_id", &oidc.client_id)?;
                    }
                    AuthConfig::ServiceAccount(sa) => {
                        if sa.token_path.as_os_str().is_empty() {
                            return Err(ConnectorError::Config(
                                "sink.auth.token_path is required".to_string(),
                            ));
                        }
                    }
                }
            }
            SinkConfig::MessageBus(bus) => {
                require("sink.bootstrap_servers", &bus.bootstrap_servers)?;
                require("sink.topic", &bus.topic)?;
            }
        }

        if let StateConfig::ObjectStore(store) = &self.state {
            require("state.bucket", &store.bucket)?;
        }

        Ok(())
    }
}

fn require(name: &str, value: &str) -> ConnectorResult<()> {
    if value.trim().is_empty() {
        return Err(ConnectorError::Config(format!("{name} is required")));
    }
    Ok(())
}

/// Sink selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    Registry(RegistryConfig),
    MessageBus(MessageBusConfig),
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Registry(RegistryConfig::default())
    }
}

/// Registry gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the registry gateway (e.g. `https://registry.example.com`).
    pub base_url: String,
    /// Skips TLS certificate verification. On by default.
    pub accept_invalid_certs: bool,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Base contract every auto-provisioned entity schema composes.
    pub base_entity_ref: String,
    /// Base contract every auto-provisioned relationship schema composes.
    pub base_relationship_ref: String,
    /// Credential strategy.
    pub auth: AuthConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            accept_invalid_certs: true,
            timeout_secs: 60,
            base_entity_ref: "urn:metasync.system:entity:1.0.0".to_string(),
            base_relationship_ref: "urn:metasync.system:relationship:1.0.0".to_string(),
            auth: AuthConfig::default(),
        }
    }
}

/// How the registry sink authenticates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No `Authorization` header.
    #[default]
    None,
    /// OIDC password grant against a token endpoint.
    Oidc(OidcConfig),
    /// Pre-issued service-account token read from a mounted file.
    ServiceAccount(ServiceAccountConfig),
}

/// OIDC password-grant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub grant_type: String,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            grant_type: "password".to_string(),
        }
    }
}

/// Service-account token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceAccountConfig {
    pub token_path: PathBuf,
    /// Authorization scheme placed before the token.
    pub scheme: String,
}

impl Default for ServiceAccountConfig {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from(DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH),
            scheme: "SAToken".to_string(),
        }
    }
}

/// Message bus (Kafka) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageBusConfig {
    /// Comma-separated broker list.
    pub bootstrap_servers: String,
    pub topic: String,
    pub username: String,
    pub password: String,
    /// SASL mechanism (`SCRAM-SHA-512`, `SCRAM-SHA-256` or `PLAIN`).
    pub sasl_mechanism: String,
    /// Verifies broker certificates. Off by default.
    pub verify_certificates: bool,
    /// Upper bound on a single send, including the synchronous flush.
    pub delivery_timeout_ms: u64,
    /// Additional librdkafka properties, applied last.
    pub properties: HashMap<String, String>,
}

impl Default for MessageBusConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: String::new(),
            topic: String::new(),
            username: String::new(),
            password: String::new(),
            sasl_mechanism: "SCRAM-SHA-512".to_string(),
            verify_certificates: false,
            delivery_timeout_ms: 30_000,
            properties: HashMap::new(),
        }
    }
}

/// State backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateConfig {
    /// No reconciliation state: nothing is loaded or saved.
    Disabled,
    /// `connectorstate.json` in a local directory.
    File { dir: PathBuf },
    /// One object per connector in an S3-compatible bucket.
    ObjectStore(ObjectStoreConfig),
}

impl Default for StateConfig {
    fn default() -> Self {
        StateConfig::File {
            dir: PathBuf::from("."),
        }
    }
}

/// S3-compatible object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Custom endpoint (e.g. an IBM COS or MinIO URL). `None` uses AWS.
    pub endpoint_url: Option<String>,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            bucket: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

/// Audit export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("."),
        }
    }
}
