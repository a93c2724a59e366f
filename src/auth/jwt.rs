//! JWT Token Handler
//! Issues and verifies the 12-hour session tokens

use crate::auth::models::{Claims, Identity};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

pub const TOKEN_TTL_HOURS: i64 = 12;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// HS256 signer/verifier bound to one secret
pub struct JwtHandler {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtHandler {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Sign a token for `identity`, valid from now for the configured TTL.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            identity: identity.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        debug!(
            user_id = identity.user_id,
            roles = ?identity.roles,
            "Issuing session token"
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(TokenError::InvalidToken)?;
        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            user_id: 42,
            email: "director@example.org".to_string(),
            full_name: "Program Director".to_string(),
            roles: vec!["ProgramDirector".to_string(), "Staff".to_string()],
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let handler = JwtHandler::new("test-secret-key-12345");
        let token = handler.issue(&identity()).unwrap();
        assert!(!token.is_empty());

        let claims = handler.verify(&token).unwrap();
        assert_eq!(claims.identity, identity());
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_garbage_rejected() {
        let handler = JwtHandler::new("test-secret-key-12345");
        assert!(matches!(
            handler.verify("invalid.token.here"),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_different_secrets_reject() {
        let signer = JwtHandler::new("secret1");
        let verifier = JwtHandler::new("secret2");

        let token = signer.issue(&identity()).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_expired_rejected() {
        let handler = JwtHandler::with_ttl("test-secret-key-12345", Duration::seconds(-5));
        let token = handler.issue(&identity()).unwrap();
        assert!(matches!(
            handler.verify(&token),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let handler = JwtHandler::new("test-secret-key-12345");
        let token = handler.issue(&identity()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let other = handler
            .issue(&Identity {
                roles: vec!["Admin".to_string()],
                ..identity()
            })
            .unwrap();
        let other_payload = other.split('.').nth(1).unwrap().to_string();
        parts[1] = &other_payload;

        assert!(handler.verify(&parts.join(".")).is_err());
    }
}
