use crate::db::DbPool;
use crate::error::ErrorResponse;
use crate::models::User;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::db::{get_user_from_token, AuthSession};

/// Extractor that validates the Authorization header and provides the authenticated user.
///
/// Behind `require_auth` the session is already in the request extensions and
/// no second lookup happens.
pub struct AuthUser(pub User);

/// Like [`AuthUser`] but also exposes the session id, for logout.
pub struct CurrentSession(pub AuthSession);

#[derive(Debug)]
pub enum AuthError {
    MissingHeader,
    InvalidHeader,
    InvalidFormat,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingHeader => "Missing Authorization header",
            AuthError::InvalidHeader => "Invalid Authorization header",
            AuthError::InvalidFormat => "Invalid Authorization header format",
            AuthError::InvalidToken => "Invalid or expired token",
        };

        (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
    }
}

pub(super) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;

    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeader)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

async fn authenticate(parts: &Parts, pool: &DbPool) -> Result<AuthSession, AuthError> {
    if let Some(session) = parts.extensions.get::<AuthSession>() {
        return Ok(session.clone());
    }
    let token = bearer_token(&parts.headers)?;
    get_user_from_token(pool, token)
        .await
        .ok_or(AuthError::InvalidToken)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = Arc::<DbPool>::from_ref(state);
        let session = authenticate(parts, &pool).await?;
        Ok(AuthUser(session.user))
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    Arc<DbPool>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = Arc::<DbPool>::from_ref(state);
        Ok(CurrentSession(authenticate(parts, &pool).await?))
    }
}
