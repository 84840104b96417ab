//! Token issuance.

use crate::error::TokenError;
use crate::jwt::claims::{Claims, ClaimsBuilder};
use crate::jwt::SIGNING_ALGORITHM;
use crate::keys::KeyStore;
use crate::metrics;
use jsonwebtoken::{encode, Header};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Signs RS256 tokens with the store's private key.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key_store: Arc<KeyStore>,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(key_store: Arc<KeyStore>, issuer: impl Into<String>) -> Self {
        TokenIssuer {
            key_store,
            issuer: issuer.into(),
        }
    }

    /// Create a signed token for `subject`.
    ///
    /// Without a private key this returns an empty string rather than an
    /// error, and callers relay it as-is.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if the signature cannot be produced.
    #[instrument(skip(self, payload), fields(sub = %subject))]
    pub fn create(
        &self,
        subject: &str,
        exp_seconds: i64,
        payload: Claims,
    ) -> Result<String, TokenError> {
        let Some(key) = self.key_store.private_key() else {
            debug!("No private key configured, returning empty token");
            return Ok(String::new());
        };

        if exp_seconds <= 0 {
            debug!(exp_seconds, "Issuing token without expiry");
        }

        let claims = ClaimsBuilder::new(self.issuer.as_str())
            .subject(subject)
            .expires_in(exp_seconds)
            .payload(payload)
            .build();

        let mut header = Header::new(SIGNING_ALGORITHM);
        let kid = self.key_store.kid();
        if !kid.is_empty() {
            header.kid = Some(kid.to_string());
        }

        let token = encode(&header, &claims, key.encoding_key())?;
        metrics::record_token_issued("RS256");
        Ok(token)
    }
}
