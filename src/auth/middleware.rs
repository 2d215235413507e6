// Operator extractors for protected routes

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::auth::{
    error::AuthError,
    models::{Operator, Role},
    token::TokenService,
};

/// Operator extractor for routes open to any signed-in operator
#[derive(Debug, Clone)]
pub struct AuthenticatedOperator(pub Operator);

/// Operator extractor for routes restricted to admins
#[derive(Debug, Clone)]
pub struct AdminOperator(pub Operator);

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedOperator
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let tokens = TokenService::from_ref(state);
        let claims = tokens.validate(token)?;

        Ok(AuthenticatedOperator(claims.into()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminOperator
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedOperator(operator) =
            AuthenticatedOperator::from_request_parts(parts, state).await?;
        let endpoint = parts.uri.path();

        if !operator.is_admin() {
            warn!(
                "Authorization failed: operator_id={}, required_role={}, actual_role={}, endpoint={}",
                operator.id,
                Role::Admin,
                operator.role,
                endpoint
            );
            return Err(AuthError::InsufficientPermissions {
                required: Role::Admin,
                actual: operator.role,
            });
        }

        debug!(
            "Authorization successful: operator_id={}, endpoint={}",
            operator.id, endpoint
        );
        Ok(AdminOperator(operator))
    }
}
