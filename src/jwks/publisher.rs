//! One-shot assembly of the published key set.

use crate::error::TokenError;
use crate::jwks::fetcher::JwksFetcher;
use crate::jwks::model::{Jwk, Jwks};
use crate::keys::{KeyStore, VerifyingKey};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use once_cell::sync::OnceCell;
use rsa::BigUint;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the discovery document once and serves it for the process
/// lifetime.
///
/// Entries fetched from the external source come first, in fetch order,
/// followed by the local key when a public key is configured.
pub struct JwksPublisher {
    key_store: Arc<KeyStore>,
    fetcher: Option<Arc<dyn JwksFetcher>>,
    fetch_timeout: Duration,
    jwks: OnceCell<Option<Jwks>>,
}

impl JwksPublisher {
    pub fn new(key_store: Arc<KeyStore>) -> Self {
        JwksPublisher {
            key_store,
            fetcher: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            jwks: OnceCell::new(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn JwksFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Assemble and cache the key set. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `Fetch` if the external source fails or misses the deadline;
    /// nothing is cached in that case.
    #[instrument(skip(self))]
    pub async fn build_once(&self) -> Result<(), TokenError> {
        if self.jwks.get().is_some() {
            debug!("JWKS already built");
            return Ok(());
        }

        let mut jwks = Jwks::new();

        if let Some(fetcher) = &self.fetcher {
            let fetched = tokio::time::timeout(self.fetch_timeout, fetcher.fetch_jwks())
                .await
                .map_err(|_| {
                    TokenError::fetch(format!(
                        "{} JWKS fetch timed out after {:?}",
                        fetcher.source(),
                        self.fetch_timeout
                    ))
                })??;

            for key in fetched.keys {
                jwks.add_key(key);
            }
        }

        if let Some(public_key) = self.key_store.public_key() {
            jwks.add_key(rsa_jwk(public_key, self.key_store.kid()));
        }

        let result = if jwks.is_empty() { None } else { Some(jwks) };
        match &result {
            Some(jwks) => info!(keys = jwks.keys.len(), "JWKS built"),
            None => info!("No keys configured, JWKS is empty"),
        }

        let _ = self.jwks.set(result);
        Ok(())
    }

    /// Cached key set; `None` before `build_once` or when there is no key.
    pub fn get_set(&self) -> Option<&Jwks> {
        self.jwks.get().and_then(Option::as_ref)
    }

}

/// Derive the published entry for the local public key.
pub fn rsa_jwk(key: &VerifyingKey, kid: &str) -> Jwk {
    Jwk {
        kty: "RSA".to_string(),
        e: encode_exponent(key.exponent()),
        kid: kid.to_string(),
        alg: "RS256".to_string(),
        n: URL_SAFE_NO_PAD.encode(key.modulus().to_bytes_be()),
        key_use: "sig".to_string(),
    }
}

/// Exponent as deployed clients expect it: written as a little-endian u32,
/// first three bytes kept. Yields the standard "AQAB" for 65537 only.
// TODO: switch to the minimal big-endian encoding once non-65537 keys need publishing.
fn encode_exponent(e: &BigUint) -> String {
    let mut buf = [0u8; 4];
    for (slot, byte) in buf.iter_mut().zip(e.to_bytes_le()) {
        *slot = byte;
    }
    URL_SAFE_NO_PAD.encode(&buf[..3])
}
