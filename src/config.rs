//! Centralized configuration for the JWT service.
//!
//! All configuration is loaded from environment variables once at startup
//! and handed to components through their constructors.

use crate::error::TokenError;
use std::env;
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "example.com";

/// Keycloak realm used as an external JWKS source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeycloakConfig {
    /// Keycloak base URL
    pub url: String,
    /// Realm name
    pub realm_name: String,
    /// Fetch deadline
    pub timeout: Duration,
    /// Accept invalid TLS certificates
    pub insecure_tls: bool,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// gRPC listener port
    pub grpc_port: u16,
    /// HTTP listener port
    pub http_port: u16,
    /// Permissive CORS on HTTP routes
    pub http_cors: bool,
    /// Expose `/metrics`
    pub with_metrics: bool,
    /// Human-readable logs instead of JSON
    pub debug: bool,
    /// Default log filter
    pub log_level: String,
    /// Graceful shutdown bound
    pub shutdown_timeout: Duration,
    /// Prefix for exported metric names
    pub namespace: String,
    /// Span export target (`JAEGER_ADDRESS`, honored with `WITH_TRACING`)
    pub tracing_endpoint: Option<String>,

    // JWT settings
    /// Key identifier placed in token headers and the JWKS
    pub kid: String,
    /// `iss` claim for issued tokens
    pub default_issuer: String,
    /// Path to the private key PEM
    pub private_pem_path: Option<String>,
    /// Path to the public key PEM
    pub public_pem_path: Option<String>,
    /// Leeway for temporal claim checks
    pub jwt_leeway: Duration,

    // External JWKS
    /// Keycloak source, when both URL and realm are set
    pub keycloak: Option<KeycloakConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but malformed.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let grpc_port = parse_env("GRPC_PORT", 5050)?;
        let http_port = parse_env("HTTP_PORT", 80)?;
        let http_cors = parse_env("HTTP_CORS", false)?;
        let with_metrics = parse_env("WITH_METRICS", false)?;
        let debug = parse_env("DEBUG", false)?;
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let shutdown_timeout = Duration::from_secs(parse_env("SHUTDOWN_TIMEOUT", 15)?);
        let namespace = env::var("NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());
        let tracing_endpoint =
            tracing_endpoint(parse_env("WITH_TRACING", false)?, non_empty_env("JAEGER_ADDRESS"));

        let kid = env::var("KID").unwrap_or_default();
        let default_issuer = env::var("DEFAULT_ISSUER").unwrap_or_default();
        let private_pem_path = non_empty_env("PRIVATE_PEM");
        let public_pem_path = non_empty_env("PUBLIC_PEM");
        let jwt_leeway = Duration::from_secs(parse_env("JWT_LEEWAY", 0)?);

        let keycloak = match (non_empty_env("KC_URL"), non_empty_env("KC_REALM_NAME")) {
            (Some(url), Some(realm_name)) => Some(KeycloakConfig {
                url,
                realm_name,
                timeout: Duration::from_secs(parse_env("KC_TIMEOUT", 60)?),
                insecure_tls: parse_env("KC_INSECURE_TLS", false)?,
            }),
            _ => None,
        };

        Ok(Self {
            host,
            grpc_port,
            http_port,
            http_cors,
            with_metrics,
            debug,
            log_level,
            shutdown_timeout,
            namespace,
            tracing_endpoint,
            kid,
            default_issuer,
            private_pem_path,
            public_pem_path,
            jwt_leeway,
            keycloak,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            grpc_port: 5050,
            http_port: 80,
            http_cors: false,
            with_metrics: false,
            debug: false,
            log_level: "info".to_string(),
            shutdown_timeout: Duration::from_secs(15),
            namespace: DEFAULT_NAMESPACE.to_string(),
            tracing_endpoint: None,
            kid: String::new(),
            default_issuer: String::new(),
            private_pem_path: None,
            public_pem_path: None,
            jwt_leeway: Duration::ZERO,
            keycloak: None,
        }
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, TokenError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {}: {}", name, e))),
        _ => Ok(default),
    }
}

/// Read an environment variable, treating empty values as unset.
fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Tracing stays off unless it is both requested and given a target.
fn tracing_endpoint(with_tracing: bool, address: Option<String>) -> Option<String> {
    address.filter(|_| with_tracing)
}
