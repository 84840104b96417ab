pub mod claims;
pub mod issuer;
pub mod validator;

use jsonwebtoken::Algorithm;

pub use claims::{parse_payload, Claims, ClaimsBuilder};
pub use issuer::TokenIssuer;
pub use validator::{decode_unverified, TokenValidation, TokenValidator};

/// Algorithm used for every issued token.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Algorithms a presented token may use. PSS and HMAC are rejected.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
