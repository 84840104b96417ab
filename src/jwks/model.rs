use serde::{Deserialize, Serialize};

/// One published public key.
///
/// Field order matches the discovery document clients already parse.
/// Missing fields in fetched documents default to empty strings; unknown
/// fields (`x5c`, `x5t`, ...) are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Jwk {
    pub kty: String,
    pub e: String,
    pub kid: String,
    pub alg: String,
    pub n: String,
    #[serde(rename = "use")]
    pub key_use: String,
}

/// Ordered set of published keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl Jwks {
    pub fn new() -> Self {
        Jwks { keys: Vec::new() }
    }

    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
