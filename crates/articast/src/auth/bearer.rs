use tracing::debug;

use super::error::AuthError;
use super::verifier::TokenVerifier;
use crate::config::AuthConfig;

/// Resolves the caller's user id from an `Authorization` header value.
pub enum Authenticator {
    /// Tokens are verified against the identity provider.
    Enabled(TokenVerifier),
    /// Every request acts as the configured user.
    Disabled { default_user_id: String },
}

impl Authenticator {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        if !config.enabled {
            log::warn!(
                "Authentication disabled, all requests act as '{}'",
                config.default_user_id
            );
            return Ok(Self::Disabled {
                default_user_id: config.default_user_id.clone(),
            });
        }
        Ok(Self::Enabled(TokenVerifier::from_config(config)?))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<String, AuthError> {
        match self {
            Self::Disabled { default_user_id } => Ok(default_user_id.clone()),
            Self::Enabled(verifier) => {
                let token = bearer_token(authorization)?;
                let user_id = verifier.verify(token).await?;
                debug!(user = %crate::sanitize::hash_id(&user_id), "Request authenticated");
                Ok(user_id)
            }
        }
    }
}

/// Extracts the token from a `Bearer <token>` header value. A value without
/// the scheme is taken as the bare token.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let value = authorization
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingCredentials)?;

    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        // Scheme with nothing after it.
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token)
}
