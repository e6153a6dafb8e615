use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{DbError, DbResult};
use crate::models::postgres::User;

/// Claims carried by a session token. The password hash never goes in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks HS256 session tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> DbResult<Self> {
        if secret.is_empty() {
            return Err(DbError::Config("JWT secret must not be empty".to_string()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        })
    }

    /// `None` when no secret is configured.
    pub fn from_config(config: &AuthConfig) -> DbResult<Option<Self>> {
        config
            .jwt_secret
            .as_deref()
            .map(|secret| Self::new(secret, config.token_ttl_secs))
            .transpose()
    }

    pub fn issue(&self, user: &User) -> DbResult<String> {
        let iat = Utc::now().timestamp();
        let claims = SessionClaims {
            id: user.id,
            role: user.role.clone(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DbError::Internal(format!("failed to sign session token: {e}")))
    }

    /// Signature and expiry checked.
    pub fn verify(&self, token: &str) -> DbResult<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| DbError::validation("session", format!("invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id: None,
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
            avatar: None,
            role: "instructor".to_string(),
            two_factor_enabled: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issued_token_carries_id_role_and_expiry() {
        let issuer = TokenIssuer::new("s3cret", 3600).unwrap();
        let user = user();
        let token = issuer.issue(&user).unwrap();

        let decoded = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(b"s3cret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.header.alg, Algorithm::HS256);
        assert_eq!(decoded.claims.id, user.id);
        assert_eq!(decoded.claims.role, "instructor");
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
        assert!(!token.contains("password"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new("s3cret", 3600).unwrap().issue(&user()).unwrap();
        let other = TokenIssuer::new("other", 3600).unwrap();
        assert!(other.verify(&token).unwrap_err().is_validation());
    }

    #[test]
    fn test_verify_roundtrip() {
        let issuer = TokenIssuer::new("s3cret", 60).unwrap();
        let user = user();
        let claims = issuer.verify(&issuer.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.id, user.id);
    }

    #[test]
    fn test_from_config() {
        assert!(TokenIssuer::from_config(&AuthConfig::default()).unwrap().is_none());

        let config = AuthConfig {
            jwt_secret: Some(String::new()),
            ..AuthConfig::default()
        };
        assert!(matches!(TokenIssuer::from_config(&config), Err(DbError::Config(_))));
    }
}
