//! Bearer-token verification against a JWKS-publishing identity provider.

pub mod bearer;
pub mod error;
pub mod jwks;
pub mod verifier;

pub use bearer::{bearer_token, Authenticator};
pub use error::AuthError;
pub use jwks::{HttpKeySetSource, Jwk, JwkSet, JwksCache, KeySetSource};
pub use verifier::TokenVerifier;
