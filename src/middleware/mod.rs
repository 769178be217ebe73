use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    error::AppError,
    utils::jwt::{self, Claims},
};

/// Bearer-token gate for mutating routes. A handler that takes `AuthUser`
/// rejects the request with 401 before any of its own logic runs.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid token format".to_string()))?;

        let claims = jwt::verify_token(token)?;

        Ok(AuthUser(claims))
    }
}
