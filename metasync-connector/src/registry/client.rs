//! Authenticated HTTP access to the registry gateway.

use crate::auth::TokenProvider;
use crate::config::RegistryConfig;
use crate::error::{ConnectorError, ConnectorResult};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use tracing::warn;

/// Shared HTTP client for registry and publish calls.
pub struct RegistryClient {
    http: Client,
    base_url: String,
    auth: TokenProvider,
}

impl RegistryClient {
    /// Creates a client, and the token provider for the configured auth.
    pub fn new(config: &RegistryConfig) -> ConnectorResult<Self> {
        let http = build_http_client(config)?;
        let auth = TokenProvider::new(&config.auth, http.clone());
        Ok(Self::with_parts(http, &config.base_url, auth))
    }

    /// Creates a client from already-built parts.
    pub fn with_parts(http: Client, base_url: &str, auth: TokenProvider) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the credential provider.
    pub fn auth(&self) -> &TokenProvider {
        &self.auth
    }

    /// Starts a JSON request against `path` with the auth header attached.
    ///
    /// Fails only when a credential cannot be obtained.
    pub async fn request(&self, method: Method, path: &str) -> ConnectorResult<RequestBuilder> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT, "application/json");

        if let Some(header) = self.auth.authorization_header().await? {
            request = request.header(AUTHORIZATION, header);
        }

        Ok(request)
    }
}

/// Builds the HTTP client shared by the registry and the token provider.
pub fn build_http_client(config: &RegistryConfig) -> ConnectorResult<Client> {
    if config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for the registry gateway");
    }

    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(|e| ConnectorError::Config(format!("failed to create HTTP client: {e}")))
}

/// Path of a schema group resource.
pub(crate) fn group_path(group_id: &str) -> String {
    format!("/registry/schemagroups/{}", urlencoding::encode(group_id))
}

/// Path of a schema resource inside its group.
pub(crate) fn schema_path(group_id: &str, schema_name: &str) -> String {
    format!(
        "{}/schemas/{}",
        group_path(group_id),
        urlencoding::encode(schema_name)
    )
}
