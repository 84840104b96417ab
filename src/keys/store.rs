//! Signing key material.
//!
//! The store is populated once at startup and then shared read-only
//! (`Arc<KeyStore>`) with the publisher, issuer and validator. Either half of
//! the keypair may be missing: a store without a private key cannot issue,
//! a store without a public key cannot validate or publish.

use crate::error::TokenError;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::info;
use zeroize::Zeroizing;

/// Private half of the keypair, ready for RS256 signing.
#[derive(Clone)]
pub struct SigningKey {
    encoding_key: EncodingKey,
    modulus_bits: usize,
}

impl SigningKey {
    /// Parse a PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`) PEM.
    ///
    /// # Errors
    ///
    /// Returns `KeyParse` if the PEM is not an RSA private key.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TokenError> {
        let pem = pem_str(pem)?;
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| TokenError::key_parse(format!("invalid RSA private key: {e}")))?;

        // ring wants PKCS#1 DER whatever the PEM envelope was.
        let der = key
            .to_pkcs1_der()
            .map_err(|e| TokenError::key_parse(format!("RSA private key encoding: {e}")))?;

        Ok(Self {
            encoding_key: EncodingKey::from_rsa_der(der.as_bytes()),
            modulus_bits: key.n().bits(),
        })
    }

    /// Key handed to `jsonwebtoken::encode`.
    #[must_use]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.modulus_bits
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("bits", &self.modulus_bits)
            .finish_non_exhaustive()
    }
}

/// Public half of the keypair.
#[derive(Clone)]
pub struct VerifyingKey {
    key: RsaPublicKey,
    decoding_key: DecodingKey,
}

impl VerifyingKey {
    /// Parse an SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM.
    ///
    /// # Errors
    ///
    /// Returns `KeyParse` if the PEM is not an RSA public key.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TokenError> {
        let pem = pem_str(pem)?;
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| TokenError::key_parse(format!("invalid RSA public key: {e}")))?;
        Ok(Self::from_rsa(key))
    }

    /// Wrap an already parsed RSA public key.
    #[must_use]
    pub fn from_rsa(key: RsaPublicKey) -> Self {
        let decoding_key =
            DecodingKey::from_rsa_raw_components(&key.n().to_bytes_be(), &key.e().to_bytes_be());
        Self { key, decoding_key }
    }

    /// Key handed to `jsonwebtoken::decode`.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Public modulus.
    #[must_use]
    pub fn modulus(&self) -> &BigUint {
        self.key.n()
    }

    /// Public exponent.
    #[must_use]
    pub fn exponent(&self) -> &BigUint {
        self.key.e()
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("bits", &self.key.n().bits())
            .field("e", self.key.e())
            .finish_non_exhaustive()
    }
}

/// Holder of the keypair and key identifier.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    private_key: Option<SigningKey>,
    public_key: Option<VerifyingKey>,
    kid: String,
}

impl KeyStore {
    /// Create an empty store with the given key identifier.
    #[must_use]
    pub fn new(kid: impl Into<String>) -> Self {
        Self {
            private_key: None,
            public_key: None,
            kid: kid.into(),
        }
    }

    /// Build a store from PEM files on disk. Missing paths leave the
    /// corresponding half empty.
    ///
    /// # Errors
    ///
    /// Returns `KeyParse` if a file cannot be read or parsed.
    pub fn load(
        kid: impl Into<String>,
        private_pem_path: Option<&str>,
        public_pem_path: Option<&str>,
    ) -> Result<Self, TokenError> {
        let private_pem = private_pem_path.map(read_pem).transpose()?;
        let public_pem = public_pem_path.map(read_pem).transpose()?;

        let mut store = Self::new(kid);
        store.set_keys(
            private_pem.as_ref().map(|pem| pem.as_slice()),
            public_pem.as_ref().map(|pem| pem.as_slice()),
        )?;
        Ok(store)
    }

    /// Parse and install key material. Absent or empty arguments leave the
    /// corresponding half untouched. Nothing is installed if either argument
    /// fails to parse.
    ///
    /// # Errors
    ///
    /// Returns `KeyParse` if a non-empty argument is not a valid RSA key of
    /// the expected kind.
    pub fn set_keys(
        &mut self,
        private_pem: Option<&[u8]>,
        public_pem: Option<&[u8]>,
    ) -> Result<(), TokenError> {
        let private_key = private_pem
            .filter(|pem| !pem.is_empty())
            .map(SigningKey::from_pem)
            .transpose()?;
        let public_key = public_pem
            .filter(|pem| !pem.is_empty())
            .map(VerifyingKey::from_pem)
            .transpose()?;

        if let Some(key) = private_key {
            info!(kid = %self.kid, bits = key.bits(), "Loaded private signing key");
            self.private_key = Some(key);
        }
        if let Some(key) = public_key {
            info!(kid = %self.kid, bits = key.modulus().bits(), "Loaded public verification key");
            self.public_key = Some(key);
        }

        Ok(())
    }

    /// Private half, if configured.
    #[must_use]
    pub fn private_key(&self) -> Option<&SigningKey> {
        self.private_key.as_ref()
    }

    /// Public half, if configured.
    #[must_use]
    pub fn public_key(&self) -> Option<&VerifyingKey> {
        self.public_key.as_ref()
    }

    /// Key identifier; may be empty.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

fn pem_str(pem: &[u8]) -> Result<&str, TokenError> {
    std::str::from_utf8(pem).map_err(|_| TokenError::key_parse("PEM is not valid UTF-8"))
}

fn read_pem(path: &str) -> Result<Zeroizing<Vec<u8>>, TokenError> {
    std::fs::read(path)
        .map(Zeroizing::new)
        .map_err(|e| TokenError::key_parse(format!("read {path}: {e}")))
}
