//! Error taxonomy for the JWT service.
//!
//! Startup errors (`KeyParse`, `Fetch`) abort the process before it serves.
//! Request errors (`Config`, `Signing`, `InvalidRequest`) are returned to the
//! caller. An invalid token is never an error: it is `valid = false`.

use thiserror::Error;
use tonic::{Code, Status};

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Key parse error: {0}")]
    KeyParse(String),

    #[error("JWKS fetch error: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JWT signing error: {0}")]
    Signing(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Create a key parse error.
    #[must_use]
    pub fn key_parse(msg: impl Into<String>) -> Self {
        Self::KeyParse(msg.into())
    }

    /// Create a fetch error.
    #[must_use]
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Wire error code reported to clients.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => BAD_REQUEST,
            _ => SERVICE_NOT_AVAILABLE,
        }
    }

    /// Whether this error must stop the process during startup.
    #[must_use]
    pub const fn is_startup_fatal(&self) -> bool {
        matches!(self, Self::KeyParse(_) | Self::Fetch(_))
    }

    /// gRPC status code for this error.
    #[must_use]
    pub const fn grpc_code(&self) -> Code {
        match self {
            Self::Config(_) => Code::FailedPrecondition,
            Self::InvalidRequest(_) => Code::InvalidArgument,
            Self::Fetch(_) => Code::Unavailable,
            Self::KeyParse(_) | Self::Signing(_) | Self::Internal(_) => Code::Internal,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        TokenError::Signing(err.to_string())
    }
}

impl From<reqwest::Error> for TokenError {
    fn from(err: reqwest::Error) -> Self {
        TokenError::Fetch(err.to_string())
    }
}

impl From<TokenError> for Status {
    fn from(err: TokenError) -> Self {
        let message = match &err {
            // Crypto and internal failures are logged, not echoed.
            TokenError::Signing(_) | TokenError::Internal(_) => {
                format!("{}: internal error", err.error_code())
            }
            _ => format!("{}: {}", err.error_code(), err),
        };
        Status::new(err.grpc_code(), message)
    }
}

// Error codes for client responses
pub const SERVICE_NOT_AVAILABLE: &str = "service_not_available";
pub const BAD_REQUEST: &str = "bad_request";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_fatal_classification() {
        assert!(TokenError::key_parse("bad pem").is_startup_fatal());
        assert!(TokenError::fetch("503").is_startup_fatal());
        assert!(!TokenError::config("no public key configured").is_startup_fatal());
        assert!(!TokenError::Signing("ring".to_string()).is_startup_fatal());
    }

    #[test]
    fn test_status_mapping() {
        let status: Status = TokenError::config("no public key configured").into();
        assert_eq!(status.code(), Code::FailedPrecondition);
        assert!(status.message().contains("no public key configured"));

        let status: Status = TokenError::invalid_request("payload").into();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().starts_with(BAD_REQUEST));
    }

    #[test]
    fn test_signing_details_not_exposed() {
        let status: Status = TokenError::Signing("modulus too small".to_string()).into();
        assert_eq!(status.code(), Code::Internal);
        assert!(!status.message().contains("modulus"));
    }
}
