use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing or empty Authorization header")]
    MissingCredentials,

    #[error("Token header carries no key id")]
    MissingKeyId,

    #[error("No signing key with id '{0}'")]
    UnknownKey(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("Authentication is misconfigured: {0}")]
    Misconfigured(String),
}
