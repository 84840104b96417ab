pub mod fetcher;
pub mod keycloak;
pub mod model;
pub mod publisher;

pub use fetcher::JwksFetcher;
pub use keycloak::KeycloakFetcher;
pub use model::{Jwk, Jwks};
pub use publisher::{rsa_jwk, JwksPublisher};
