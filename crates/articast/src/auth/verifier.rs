use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use tracing::debug;

use super::error::AuthError;
use super::jwks::{HttpKeySetSource, JwksCache};
use crate::config::AuthConfig;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies RS256/384/512 bearer tokens and returns their subject.
///
/// Issuer must match exactly; the audience claim may be a single string or
/// an array containing the expected audience. Every validation failure is
/// reported as [`AuthError::InvalidToken`].
pub struct TokenVerifier {
    keys: Arc<JwksCache>,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(keys: Arc<JwksCache>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Builds a verifier that fetches keys from the configured JWKS URL.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let issuer = config
            .issuer()
            .ok_or_else(|| AuthError::Misconfigured("no issuer or domain".to_string()))?;
        let jwks_url = config
            .jwks_url()
            .ok_or_else(|| AuthError::Misconfigured("no jwks_url or domain".to_string()))?;
        let audience = config
            .audience()
            .ok_or_else(|| AuthError::Misconfigured("no audience".to_string()))?;

        let source = Arc::new(HttpKeySetSource::new(jwks_url)?);
        Ok(Self::new(
            Arc::new(JwksCache::new(source)),
            issuer,
            audience,
        ))
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Unparsable token header");
            AuthError::InvalidToken
        })?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        if !matches!(header.alg, Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512) {
            debug!(alg = ?header.alg, "Rejected token algorithm");
            return Err(AuthError::InvalidToken);
        }

        let key = self.keys.resolve(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["iss", "aud", "sub"]);

        let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
            debug!(kid = %kid, error = %e, "Token failed validation");
            AuthError::InvalidToken
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims.sub)
    }
}
