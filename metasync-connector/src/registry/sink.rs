//! Registry gateway publish path.

use super::client::RegistryClient;
use super::provisioner::SchemaProvisioner;
use crate::config::RegistryConfig;
use crate::error::ConnectorResult;
use crate::sink::{DeliveryOutcome, Sink};
use async_trait::async_trait;
use metasync_types::Event;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Publish endpoint, relative to the gateway base URL.
pub const PUBLISH_PATH: &str = "/publish/event";

/// Publishes events to the registry gateway's publish endpoint.
pub struct RegistryGatewaySink {
    client: Arc<RegistryClient>,
    provisioner: SchemaProvisioner,
}

impl RegistryGatewaySink {
    /// Creates a sink from configuration.
    pub fn new(config: &RegistryConfig) -> ConnectorResult<Self> {
        info!(base_url = %config.base_url, "Registry gateway sink");
        let client = RegistryClient::new(config)?;
        Ok(Self::with_client(
            Arc::new(client),
            &config.base_entity_ref,
            &config.base_relationship_ref,
        ))
    }

    /// Creates a sink over an existing client.
    pub fn with_client(
        client: Arc<RegistryClient>,
        base_entity_ref: &str,
        base_relationship_ref: &str,
    ) -> Self {
        let provisioner =
            SchemaProvisioner::new(Arc::clone(&client), base_entity_ref, base_relationship_ref);
        Self {
            client,
            provisioner,
        }
    }

    /// Returns the schema provisioner.
    pub fn provisioner(&self) -> &SchemaProvisioner {
        &self.provisioner
    }
}

#[async_trait]
impl Sink for RegistryGatewaySink {
    fn name(&self) -> &'static str {
        "registry"
    }

    async fn publish(&self, event: &Event) -> ConnectorResult<DeliveryOutcome> {
        let payload = &event.payload;
        debug!(
            event_type = %event.event_type,
            kind = %payload.kind(),
            schema = %payload.schema_ref(),
            "Publishing event"
        );

        self.provisioner
            .ensure_for(payload.schema_ref(), payload.kind())
            .await?;

        let body = event.to_json()?;
        let request = self
            .client
            .request(Method::POST, PUBLISH_PATH)
            .await?
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(key = %event.key(), "Publish request failed: {e}");
                return Ok(DeliveryOutcome::Failed {
                    reason: format!("transport error: {e}"),
                });
            }
        };

        let status = response.status().as_u16();
        let outcome = match status {
            200 => DeliveryOutcome::Delivered,
            s if s > 201 => {
                error!(key = %event.key(), status = s, "Publish rejected by registry gateway");
                DeliveryOutcome::Failed {
                    reason: format!("HTTP {s}"),
                }
            }
            s => DeliveryOutcome::Unconfirmed { status: s },
        };

        debug!(key = %event.key(), status, "Publish finished");
        Ok(outcome)
    }
}
