//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use jwts_service::jwks::{Jwks, JwksFetcher};
use jwts_service::keys::KeyStore;
use jwts_service::{Config, Jwts, TokenError};
use std::sync::Arc;

pub const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/private.pem");
pub const PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/public.pem");
pub const PUBLIC_PKCS1_PEM: &[u8] = include_bytes!("../fixtures/public_pkcs1.pem");
pub const PUBLIC_E3_PEM: &[u8] = include_bytes!("../fixtures/public_e3.pem");
pub const OTHER_PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/other_private_pkcs8.pem");
pub const OTHER_PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/other_public.pem");

/// Base64url modulus of `fixtures/public.pem`.
pub const PUBLIC_N: &str = "16a2IhrVS386h5YEurQ8Xb9Js9bGC31jj9YNzhZWaZFqQx1xLOek9dJMWnM6ywsBvrVtwjy2ZobqpkAkYaqOFk5zUQNg-pZ11T34ax5pmIyZ4QD9FBbcyhNgYXvYbdf3LYXzrLWLWqPsDLtrW5jC3QMYT01wu4BAFH2es7IZuu81_nT2esUxX_Wm5yT8UnmfFBlKEeQ3AkwcUycts92YjUXuym8V8-k3YlFhnS2TpZeMIMt-99iuq0QTkLLCGs9Qnw6-wy95kx0p7jp5Xo9iug8ZWAp_354XRs1fzeNxntOSFmhUXGEHQ0-V1q0RAn7jeWlXYRHTPnzY6KwX3fWiAw";

pub fn key_store(kid: &str, private: Option<&[u8]>, public: Option<&[u8]>) -> Arc<KeyStore> {
    let mut store = KeyStore::new(kid);
    store.set_keys(private, public).unwrap();
    Arc::new(store)
}

pub async fn jwts(config: &Config, private: Option<&[u8]>, public: Option<&[u8]>) -> Jwts {
    let store = key_store(&config.kid, private, public);
    Jwts::from_parts(config, store, None).await.unwrap()
}

pub fn config(kid: &str, issuer: &str) -> Config {
    Config {
        kid: kid.to_string(),
        default_issuer: issuer.to_string(),
        ..Config::default()
    }
}

/// Fetcher returning a fixed set.
pub struct StaticJwksFetcher(Jwks);

impl StaticJwksFetcher {
    pub fn new(jwks: Jwks) -> Self {
        Self(jwks)
    }
}

#[async_trait]
impl JwksFetcher for StaticJwksFetcher {
    async fn fetch_jwks(&self) -> Result<Jwks, TokenError> {
        Ok(self.0.clone())
    }

    fn source(&self) -> &str {
        "static"
    }
}
