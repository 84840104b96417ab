//! JWT service library.
//!
//! Issues RS256 tokens, validates RS256/384/512 tokens and publishes the
//! verification keys as a JWK set, over gRPC and HTTP.

#![forbid(unsafe_code)]

pub mod app;
pub mod config;
pub mod error;
pub mod grpc;
pub mod http;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod observability;
pub mod proto;
pub mod shutdown;

// Re-exports for convenience
pub use app::Jwts;
pub use config::Config;
pub use error::TokenError;
