//! Claim set assembly and caller payload parsing.

use crate::error::TokenError;
use serde_json::{Map, Value};

/// Claim set carried by a token.
pub type Claims = Map<String, Value>;

/// `iat` is backdated so verifiers with a slow clock accept fresh tokens.
pub const IAT_BACKDATE_SECONDS: i64 = 5;

/// Parse a caller payload. Empty input and `null` mean no extra claims.
///
/// # Errors
///
/// Returns `InvalidRequest` unless the input is a JSON object.
pub fn parse_payload(raw: &[u8]) -> Result<Claims, TokenError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Claims::new());
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(Value::Null) => Ok(Claims::new()),
        Ok(_) => Err(TokenError::invalid_request("payload must be a JSON object")),
        Err(e) => Err(TokenError::invalid_request(format!("payload: {e}"))),
    }
}

/// Assembles the claim set for an issued token.
///
/// The caller payload is applied first; `iss`, `exp`, `iat` and `sub` are
/// written afterwards and always win over payload entries of the same name.
pub struct ClaimsBuilder {
    issuer: String,
    subject: String,
    exp_seconds: i64,
    payload: Claims,
}

impl ClaimsBuilder {
    pub fn new(issuer: impl Into<String>) -> Self {
        ClaimsBuilder {
            issuer: issuer.into(),
            subject: String::new(),
            exp_seconds: 0,
            payload: Claims::new(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Lifetime in seconds; zero or negative produces a token without `exp`.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp_seconds = seconds;
        self
    }

    pub fn payload(mut self, payload: Claims) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Claims {
        self.build_at(chrono::Utc::now().timestamp())
    }

    /// Build against an explicit Unix time.
    pub fn build_at(self, now: i64) -> Claims {
        let mut claims = self.payload;

        claims.insert("iss".to_string(), Value::from(self.issuer));
        if self.exp_seconds > 0 {
            claims.insert("exp".to_string(), Value::from(now.saturating_add(self.exp_seconds)));
        } else {
            claims.remove("exp");
        }
        claims.insert("iat".to_string(), Value::from(now - IAT_BACKDATE_SECONDS));
        claims.insert("sub".to_string(), Value::from(self.subject));

        claims
    }
}
