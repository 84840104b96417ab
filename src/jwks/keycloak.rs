//! Keycloak realm certificates as an external JWKS source.

use crate::config::KeycloakConfig;
use crate::error::TokenError;
use crate::jwks::fetcher::JwksFetcher;
use crate::jwks::model::Jwks;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

/// Upper bound on the error body echoed into a fetch error.
const ERROR_BODY_LIMIT: usize = 4 << 10;

/// Fetches `{url}/realms/{realm}/protocol/openid-connect/certs`.
#[derive(Debug, Clone)]
pub struct KeycloakFetcher {
    http: Client,
    certs_url: String,
}

impl KeycloakFetcher {
    /// Build a fetcher for the configured realm.
    ///
    /// # Errors
    ///
    /// Returns `Fetch` if the HTTP client cannot be built.
    pub fn new(config: &KeycloakConfig) -> Result<Self, TokenError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(100)
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(|e| TokenError::fetch(format!("build HTTP client: {e}")))?;

        Ok(Self {
            http,
            certs_url: certs_url(&config.url, &config.realm_name),
        })
    }

    /// Endpoint this fetcher calls.
    #[must_use]
    pub fn certs_url(&self) -> &str {
        &self.certs_url
    }
}

#[async_trait]
impl JwksFetcher for KeycloakFetcher {
    #[instrument(skip(self), fields(url = %self.certs_url))]
    async fn fetch_jwks(&self) -> Result<Jwks, TokenError> {
        let response = self
            .http
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| TokenError::fetch(format!("keycloak - do request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let body = String::from_utf8_lossy(&body[..body.len().min(ERROR_BODY_LIMIT)]);
            return Err(TokenError::fetch(format!(
                "keycloak - bad status {status}: {body}"
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| TokenError::fetch(format!("keycloak - decode jwks: {e}")))?;

        info!(keys = jwks.keys.len(), "Fetched external JWKS");
        Ok(jwks)
    }

    fn source(&self) -> &str {
        "keycloak"
    }
}

fn certs_url(base: &str, realm: &str) -> String {
    format!(
        "{}/realms/{}/protocol/openid-connect/certs",
        base.trim_end_matches('/'),
        realm
    )
}
