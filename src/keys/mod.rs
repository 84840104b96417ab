pub mod store;

pub use store::{KeyStore, SigningKey, VerifyingKey};
