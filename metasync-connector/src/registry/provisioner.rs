//! Schema auto-provisioning.
//!
//! Before the first event of a schema is published, its schema group and
//! schema must exist in the registry. Each check is an existence lookup
//! followed, on 404, by a create. Results are memoized for the lifetime of
//! the process so a schema costs at most one round-trip of each kind.

use super::client::{group_path, schema_path, RegistryClient};
use crate::error::{ConnectorError, ConnectorResult};
use metasync_types::{RecordKind, SchemaRef};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Ensures schema groups and schemas exist in the registry.
pub struct SchemaProvisioner {
    client: Arc<RegistryClient>,
    base_entity_ref: String,
    base_relationship_ref: String,
    /// Fully-qualified schema references provisioned this process.
    validated_schemas: RwLock<HashSet<String>>,
    /// Group ids known to exist.
    validated_groups: RwLock<HashSet<String>>,
}

impl SchemaProvisioner {
    pub fn new(
        client: Arc<RegistryClient>,
        base_entity_ref: impl Into<String>,
        base_relationship_ref: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_entity_ref: base_entity_ref.into(),
            base_relationship_ref: base_relationship_ref.into(),
            validated_schemas: RwLock::new(HashSet::new()),
            validated_groups: RwLock::new(HashSet::new()),
        }
    }

    /// Returns true if `schema` was already provisioned by this process.
    pub async fn is_validated(&self, schema: &SchemaRef) -> bool {
        self.validated_schemas.read().await.contains(schema.as_str())
    }

    /// Ensures both the group and the schema behind `schema` exist.
    pub async fn ensure_for(&self, schema: &SchemaRef, kind: RecordKind) -> ConnectorResult<()> {
        if self.is_validated(schema).await {
            return Ok(());
        }

        self.ensure_group(schema.group_id()).await?;
        self.ensure_schema(schema, kind).await
    }

    /// Ensures the schema group exists, creating it when missing.
    pub async fn ensure_group(&self, group_id: &str) -> ConnectorResult<()> {
        if self.validated_groups.read().await.contains(group_id) {
            return Ok(());
        }

        let path = group_path(group_id);
        let status = self.lookup(&path, group_id).await?;

        match status {
            StatusCode::OK => debug!("Schema group {} exists", group_id),
            StatusCode::NOT_FOUND => {
                info!("Schema group {} does not exist, creating it", group_id);
                let body = json!({ "description": format!("autogenerated {group_id}") });
                self.create(Method::PUT, &path, &body, group_id).await?;
                info!("Schema group {} created", group_id);
            }
            other => {
                return Err(ConnectorError::provisioning(
                    group_id,
                    format!("group lookup returned HTTP {}", other.as_u16()),
                ))
            }
        }

        self.validated_groups
            .write()
            .await
            .insert(group_id.to_string());
        Ok(())
    }

    /// Ensures the schema exists in its group, creating a minimal one when
    /// missing. Memoized by the full schema reference.
    pub async fn ensure_schema(&self, schema: &SchemaRef, kind: RecordKind) -> ConnectorResult<()> {
        if self.is_validated(schema).await {
            return Ok(());
        }

        let path = schema_path(schema.group_id(), schema.schema_name());
        let label = schema.as_str();
        let status = self.lookup(&path, label).await?;

        match status {
            StatusCode::OK => debug!("Schema {} exists", label),
            StatusCode::NOT_FOUND => {
                info!("Schema {} does not exist, creating it", label);
                let document = self.schema_document(schema, kind);
                self.create(Method::POST, &path, &document, label).await?;
                info!("Schema {} created", label);
            }
            other => {
                return Err(ConnectorError::provisioning(
                    label,
                    format!("schema lookup returned HTTP {}", other.as_u16()),
                ))
            }
        }

        self.validated_schemas
            .write()
            .await
            .insert(label.to_string());
        Ok(())
    }

    /// Builds the minimal schema document for an unknown schema: no required
    /// fields, no properties, composed from the base contract of its kind.
    pub fn schema_document(&self, schema: &SchemaRef, kind: RecordKind) -> Value {
        let group_id = schema.group_id();
        let schema_name = schema.schema_name();
        let version = schema.version();
        let (description, base_ref) = match kind {
            RecordKind::Entity => (format!("{schema_name} entity"), &self.base_entity_ref),
            RecordKind::Relationship => (
                format!("A {schema_name} relationship"),
                &self.base_relationship_ref,
            ),
        };

        json!({
            "$id": format!("urn:{group_id}:{schema_name}:{version}"),
            "$schema": JSON_SCHEMA_DIALECT,
            "description": description,
            "type": "object",
            "additionalProperties": true,
            "properties": {},
            "required": [],
            "allOf": [{ "$ref": base_ref }],
            "$defs": {}
        })
    }

    async fn lookup(&self, path: &str, label: &str) -> ConnectorResult<StatusCode> {
        let response = self
            .client
            .request(Method::GET, path)
            .await?
            .send()
            .await
            .map_err(|e| ConnectorError::provisioning(label, format!("lookup failed: {e}")))?;
        Ok(response.status())
    }

    async fn create(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        label: &str,
    ) -> ConnectorResult<()> {
        let response = self
            .client
            .request(method, path)
            .await?
            .json(body)
            .send()
            .await
            .map_err(|e| ConnectorError::provisioning(label, format!("create failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::provisioning(
                label,
                format!("create returned HTTP {}", status.as_u16()),
            ));
        }
        Ok(())
    }
}
