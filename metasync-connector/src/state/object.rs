//! S3-compatible object-storage state backend.

use super::StateStore;
use crate::config::ObjectStoreConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::manifest::KeySet;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};
use uuid::Uuid;

/// Keeps the key set in a single object named after the connector identity.
#[derive(Debug, Clone)]
pub struct ObjectStateStore {
    client: Client,
    bucket: String,
    key: String,
}

impl ObjectStateStore {
    /// Creates a store for `connector_id` from static credentials.
    pub async fn new(connector_id: &str, cfg: &ObjectStoreConfig) -> ConnectorResult<Self> {
        if cfg.bucket.trim().is_empty() {
            return Err(ConnectorError::Config("state bucket is required".to_string()));
        }

        let creds = Credentials::new(
            cfg.access_key_id.clone(),
            cfg.secret_access_key.clone(),
            None,
            None,
            "metasync_static",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(creds);

        if let Some(endpoint) = &cfg.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        // COS and MinIO only serve path-style buckets.
        let s3_cfg = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        Ok(Self::with_client(
            Client::from_conf(s3_cfg),
            cfg.bucket.clone(),
            connector_id,
        ))
    }

    /// Creates a store over an existing client.
    pub fn with_client(client: Client, bucket: impl Into<String>, connector_id: &str) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: state_object_key(connector_id),
        }
    }

    /// The object key holding this connector's state.
    pub fn object_key(&self) -> &str {
        &self.key
    }
}

/// Derives the state object key for a connector identity.
///
/// Name-based, so the same connector id always maps to the same object.
pub fn state_object_key(connector_id: &str) -> String {
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, connector_id.as_bytes());
    format!("{id}.json")
}

fn is_not_found(err: &SdkError<GetObjectError>) -> bool {
    err.as_service_error().is_some_and(|e| e.is_no_such_key())
        || err.raw_response().is_some_and(|r| r.status().as_u16() == 404)
}

#[async_trait]
impl StateStore for ObjectStateStore {
    fn backend_name(&self) -> &'static str {
        "object-store"
    }

    async fn try_load(&self) -> ConnectorResult<Option<KeySet>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => {
                return Err(ConnectorError::StateIo(format!(
                    "s3 get_object {}/{} failed: {}",
                    self.bucket,
                    self.key,
                    DisplayErrorContext(&e)
                )))
            }
        };

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| ConnectorError::StateIo(format!("s3 read body failed: {e}")))?
            .into_bytes();

        let keys: KeySet = serde_json::from_slice(&body).map_err(|e| {
            ConnectorError::StateIo(format!("malformed state in {}/{}: {e}", self.bucket, self.key))
        })?;
        debug!("Read {} keys from {}/{}", keys.len(), self.bucket, self.key);
        Ok(Some(keys))
    }

    async fn save(&self, observed: &KeySet) -> ConnectorResult<()> {
        let body = serde_json::to_vec(observed)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                ConnectorError::StateIo(format!(
                    "s3 put_object {}/{} failed: {}",
                    self.bucket,
                    self.key,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("Saved {} keys to {}/{}", observed.len(), self.bucket, self.key);
        Ok(())
    }
}
