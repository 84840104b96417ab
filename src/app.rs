//! Wiring of the key store, publisher, issuer and validator.

use crate::config::Config;
use crate::error::TokenError;
use crate::jwks::{Jwks, JwksFetcher, JwksPublisher, KeycloakFetcher};
use crate::jwt::{Claims, TokenIssuer, TokenValidation, TokenValidator};
use crate::keys::KeyStore;
use std::sync::Arc;
use tracing::{info, instrument};

/// Operations exposed by both transports.
pub struct Jwts {
    publisher: JwksPublisher,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl Jwts {
    pub fn new(publisher: JwksPublisher, issuer: TokenIssuer, validator: TokenValidator) -> Self {
        Jwts {
            publisher,
            issuer,
            validator,
        }
    }

    /// Assemble the service from a store, building the key set before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns `Fetch` if the external key set cannot be retrieved.
    pub async fn from_parts(
        config: &Config,
        key_store: Arc<KeyStore>,
        fetcher: Option<Arc<dyn JwksFetcher>>,
    ) -> Result<Self, TokenError> {
        let mut publisher = JwksPublisher::new(key_store.clone());
        if let Some(fetcher) = fetcher {
            let timeout = config
                .keycloak
                .as_ref()
                .map(|kc| kc.timeout)
                .unwrap_or(crate::jwks::publisher::DEFAULT_FETCH_TIMEOUT);
            publisher = publisher.with_fetcher(fetcher).with_fetch_timeout(timeout);
        }
        publisher.build_once().await?;

        let issuer = TokenIssuer::new(key_store.clone(), config.default_issuer.clone());
        let validator = TokenValidator::new(key_store).with_leeway(config.jwt_leeway);

        Ok(Self::new(publisher, issuer, validator))
    }

    /// Load keys from disk and contact the external source if configured.
    ///
    /// # Errors
    ///
    /// Returns `KeyParse` or `Fetch`; both are fatal at startup.
    #[instrument(skip(config), fields(kid = %config.kid))]
    pub async fn bootstrap(config: &Config) -> Result<Self, TokenError> {
        let key_store = KeyStore::load(
            config.kid.clone(),
            config.private_pem_path.as_deref(),
            config.public_pem_path.as_deref(),
        )?;

        let fetcher = match &config.keycloak {
            Some(kc) => {
                let fetcher = KeycloakFetcher::new(kc)?;
                info!(
                    url = %fetcher.certs_url(),
                    realm = %kc.realm_name,
                    "Using Keycloak JWKS source"
                );
                Some(Arc::new(fetcher) as Arc<dyn JwksFetcher>)
            }
            None => None,
        };

        Self::from_parts(config, Arc::new(key_store), fetcher).await
    }

    /// Published key set, `None` when no key is known.
    pub fn jwk_set(&self) -> Option<&Jwks> {
        self.publisher.get_set()
    }

    /// # Errors
    ///
    /// See [`TokenIssuer::create`].
    pub fn create(
        &self,
        subject: &str,
        exp_seconds: i64,
        payload: Claims,
    ) -> Result<String, TokenError> {
        self.issuer.create(subject, exp_seconds, payload)
    }

    /// # Errors
    ///
    /// See [`TokenValidator::validate`].
    pub fn validate(&self, token: &str) -> Result<TokenValidation, TokenError> {
        self.validator.validate(token)
    }
}
