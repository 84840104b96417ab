//! External JWKS sources.

use crate::error::TokenError;
use crate::jwks::model::Jwks;
use async_trait::async_trait;

/// Retrieves a third-party key set at startup.
///
/// Implementations report any transport failure, non-success response or
/// malformed document as `TokenError::Fetch`. The caller bounds the call
/// with its own deadline; retries are not the fetcher's concern.
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    /// Fetch the remote key set.
    async fn fetch_jwks(&self) -> Result<Jwks, TokenError>;

    /// Short label for logs.
    fn source(&self) -> &str;
}
