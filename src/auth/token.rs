// JWT verification for operator tokens
//
// Tokens are issued by the shop's staff directory; this service only needs to
// verify them. `issue` exists for tooling and tests.

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::models::{Operator, Role};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,    // operator id
    pub name: String, // display name for ledger records
    pub role: Role,
    pub exp: i64, // expiration timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>, // issued at timestamp, optional
}

impl From<Claims> for Operator {
    fn from(claims: Claims) -> Self {
        Operator {
            id: claims.sub,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Token service for JWT operations
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    token_duration: i64, // in seconds
}

impl TokenService {
    /// Issued tokens last one shift (12 hours)
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            token_duration: 12 * 3600,
        }
    }

    /// Issue a token for an operator
    pub fn issue(&self, operator_id: Uuid, name: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: operator_id,
            name: name.to_string(),
            role,
            iat: Some(now),
            exp: now + self.token_duration,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Verify a token and return its claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_token_service() -> TokenService {
        TokenService::new("test_secret_key_for_testing_purposes")
    }

    #[test]
    fn test_token_claims_contain_operator_identity() {
        let service = test_token_service();
        let id = Uuid::new_v4();

        let token = service.issue(id, "Li Na", Role::Staff).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.name, "Li Na");
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.iat.map(|iat| claims.exp - iat), Some(12 * 3600));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = test_token_service();
        let claims = Claims {
            sub: Uuid::new_v4(),
            name: "Li Na".to_string(),
            role: Role::Staff,
            iat: Some(Utc::now().timestamp() - 1000),
            exp: Utc::now().timestamp() - 500,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key_for_testing_purposes"),
        )
        .unwrap();

        assert!(matches!(service.validate(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_token_without_issued_at_is_accepted() {
        let service = test_token_service();
        let id = Uuid::new_v4();
        let claims = serde_json::json!({
            "sub": id,
            "name": "Zhao Min",
            "role": "admin",
            "exp": Utc::now().timestamp() + 600,
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key_for_testing_purposes"),
        )
        .unwrap();

        let decoded = service.validate(&token).unwrap();
        assert_eq!(decoded.sub, id);
        assert_eq!(decoded.role, Role::Admin);
        assert!(decoded.iat.is_none());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let service = test_token_service();

        assert!(service.validate("").is_err());
        assert!(service.validate("not.a.token").is_err());
        assert!(service
            .validate("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.invalid.signature")
            .is_err());
    }

    #[test]
    fn test_token_signature_verification() {
        let service1 = TokenService::new("secret1");
        let service2 = TokenService::new("secret2");

        let token = service1.issue(Uuid::new_v4(), "Wang", Role::Admin).unwrap();

        assert!(service1.validate(&token).is_ok());
        assert!(matches!(service2.validate(&token), Err(AuthError::InvalidToken)));
    }

    proptest! {
        #[test]
        fn prop_malformed_tokens_rejected(malformed in "[a-zA-Z0-9]{10,50}") {
            let service = test_token_service();
            prop_assert!(service.validate(&malformed).is_err());
        }
    }
}
