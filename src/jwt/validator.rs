//! Token validation.
//!
//! A token that fails verification is not an error: the result is
//! `valid = false` together with whatever claims could be read from the
//! unverified payload. The only error is a missing public key.

use crate::error::TokenError;
use crate::jwt::claims::Claims;
use crate::jwt::ACCEPTED_ALGORITHMS;
use crate::keys::{KeyStore, VerifyingKey};
use crate::metrics;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, Validation};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Outcome of a validation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenValidation {
    pub valid: bool,
    pub claims: Claims,
}

/// Verifies RS256/384/512 tokens against the store's public key.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    key_store: Arc<KeyStore>,
    leeway: Duration,
}

impl TokenValidator {
    pub fn new(key_store: Arc<KeyStore>) -> Self {
        TokenValidator {
            key_store,
            leeway: Duration::ZERO,
        }
    }

    /// Clock skew tolerated on `exp`, `nbf` and `iat`.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no public key is configured.
    pub fn validate(&self, token: &str) -> Result<TokenValidation, TokenError> {
        let key = self
            .key_store
            .public_key()
            .ok_or_else(|| TokenError::config("no public key configured"))?;

        let result = match self.verify(token, key) {
            Ok(claims) => TokenValidation {
                valid: true,
                claims,
            },
            Err(reason) => {
                debug!(%reason, "Token rejected");
                TokenValidation {
                    valid: false,
                    claims: decode_unverified(token).unwrap_or_default(),
                }
            }
        };

        metrics::record_validation(result.valid);
        Ok(result)
    }

    fn verify(&self, token: &str, key: &VerifyingKey) -> Result<Claims, String> {
        let mut validation = Validation::new(ACCEPTED_ALGORITHMS[0]);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.required_spec_claims = HashSet::new();
        validation.leeway = self.leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let data = decode::<Claims>(token, key.decoding_key(), &validation)
            .map_err(|e| e.to_string())?;

        check_time_claims(&data.claims, chrono::Utc::now().timestamp(), self.leeway)?;
        Ok(data.claims)
    }
}

/// Registered time claims must be numeric when present, and none may put
/// the token outside its validity window.
fn check_time_claims(claims: &Claims, now: i64, leeway: Duration) -> Result<(), String> {
    let now = now as f64;
    let leeway = leeway.as_secs_f64();

    let numeric = |name: &str| -> Result<Option<f64>, String> {
        match claims.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| format!("{name} is not a number")),
        }
    };

    if let Some(exp) = numeric("exp")? {
        if now > exp + leeway {
            return Err("token is expired".to_string());
        }
    }
    if let Some(nbf) = numeric("nbf")? {
        if now < nbf - leeway {
            return Err("token is not valid yet".to_string());
        }
    }
    if let Some(iat) = numeric("iat")? {
        if now < iat - leeway {
            return Err("token used before issued".to_string());
        }
    }
    Ok(())
}

/// Read the payload segment without checking anything.
///
/// Returns `None` unless the token has exactly three segments and the middle
/// one is base64url JSON describing an object.
pub fn decode_unverified(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}
