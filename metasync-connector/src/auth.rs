//! Credentials for the registry gateway.
//!
//! Exactly one strategy is active per provider: an OIDC password grant whose
//! bearer token is cached and refreshed shortly before expiry, or a mounted
//! service-account token read once and reused verbatim.

use crate::config::{AuthConfig, OidcConfig, ServiceAccountConfig};
use crate::error::{ConnectorError, ConnectorResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A token is refreshed once less than this much validity remains.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A cached bearer token.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: SystemTime,
}

impl Credential {
    /// Returns true if the token has less than [`REFRESH_MARGIN`] left at `now`.
    pub fn needs_refresh(&self, now: SystemTime) -> bool {
        match self.expires_at.duration_since(now) {
            Ok(remaining) => remaining < REFRESH_MARGIN,
            Err(_) => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

enum Strategy {
    None,
    Oidc {
        config: OidcConfig,
        cached: RwLock<Option<Credential>>,
    },
    ServiceAccount {
        config: ServiceAccountConfig,
        cached: RwLock<Option<String>>,
    },
}

/// Produces the `Authorization` header for registry requests.
pub struct TokenProvider {
    client: Client,
    strategy: Strategy,
}

impl TokenProvider {
    /// Creates a provider for the configured strategy.
    pub fn new(config: &AuthConfig, client: Client) -> Self {
        let strategy = match config {
            AuthConfig::None => Strategy::None,
            AuthConfig::Oidc(oidc) => {
                info!(
                    token_url = %oidc.token_url,
                    client_id = %oidc.client_id,
                    grant_type = %oidc.grant_type,
                    "Using OIDC bearer authentication"
                );
                Strategy::Oidc {
                    config: oidc.clone(),
                    cached: RwLock::new(None),
                }
            }
            AuthConfig::ServiceAccount(sa) => {
                info!(
                    token_path = %sa.token_path.display(),
                    "Using service-account token authentication"
                );
                Strategy::ServiceAccount {
                    config: sa.clone(),
                    cached: RwLock::new(None),
                }
            }
        };

        Self { client, strategy }
    }

    /// Returns true if requests carry an `Authorization` header.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.strategy, Strategy::None)
    }

    /// Returns a valid token, fetching or refreshing it when needed.
    pub async fn get_token(&self) -> ConnectorResult<String> {
        match &self.strategy {
            Strategy::None => Err(ConnectorError::Auth(
                "no credential strategy configured".to_string(),
            )),
            Strategy::Oidc { config, cached } => self.oidc_token(config, cached).await,
            Strategy::ServiceAccount { config, cached } => {
                Self::service_account_token(config, cached).await
            }
        }
    }

    /// Returns the full header value (`Bearer <token>` or `<scheme> <token>`),
    /// or `None` when authentication is disabled.
    pub async fn authorization_header(&self) -> ConnectorResult<Option<String>> {
        match &self.strategy {
            Strategy::None => Ok(None),
            Strategy::Oidc { .. } => Ok(Some(format!("Bearer {}", self.get_token().await?))),
            Strategy::ServiceAccount { config, .. } => Ok(Some(format!(
                "{} {}",
                config.scheme,
                self.get_token().await?
            ))),
        }
    }

    async fn oidc_token(
        &self,
        config: &OidcConfig,
        cached: &RwLock<Option<Credential>>,
    ) -> ConnectorResult<String> {
        {
            let guard = cached.read().await;
            if let Some(credential) = guard.as_ref() {
                if !credential.needs_refresh(SystemTime::now()) {
                    return Ok(credential.token.clone());
                }
            }
        } // read lock dropped here

        let credential = self.request_token(config).await?;
        let token = credential.token.clone();
        *cached.write().await = Some(credential);
        Ok(token)
    }

    async fn request_token(&self, config: &OidcConfig) -> ConnectorResult<Credential> {
        debug!("Requesting OIDC bearer token");

        let response = self
            .client
            .post(&config.token_url)
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
                ("grant_type", config.grant_type.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ConnectorError::Auth(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Auth(format!(
                "token request rejected with HTTP {}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::Auth(format!("failed to parse token response: {e}")))?;

        let expires_at = SystemTime::now()
            .checked_add(Duration::from_secs(token_response.expires_in))
            .ok_or_else(|| {
                ConnectorError::Auth(format!(
                    "expires_in out of range: {}",
                    token_response.expires_in
                ))
            })?;
        info!(
            expires_in = token_response.expires_in,
            "Obtained OIDC bearer token"
        );

        Ok(Credential {
            token: token_response.access_token,
            expires_at,
        })
    }

    async fn service_account_token(
        config: &ServiceAccountConfig,
        cached: &RwLock<Option<String>>,
    ) -> ConnectorResult<String> {
        if let Some(token) = cached.read().await.as_ref() {
            return Ok(token.clone());
        }

        let token = tokio::fs::read_to_string(&config.token_path)
            .await
            .map_err(|e| {
                ConnectorError::Auth(format!(
                    "failed to read service-account token {}: {e}",
                    config.token_path.display()
                ))
            })?;

        debug!("Loaded service-account token");
        *cached.write().await = Some(token.clone());
        Ok(token)
    }
}
