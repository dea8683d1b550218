use crate::db::DbPool;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::db::get_user_from_token;
use super::extractor::{bearer_token, AuthError};

/// Middleware that requires a valid auth token for all requests.
/// Apply this to routes that should be protected by default.
pub async fn require_auth(
    State(pool): State<Arc<DbPool>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(t) => t.to_string(),
        Err(e) => return e.into_response(),
    };

    let Some(session) = get_user_from_token(&pool, &token).await else {
        return AuthError::InvalidToken.into_response();
    };

    // Handlers read the session back through AuthUser without a second query
    request.extensions_mut().insert(session);
    next.run(request).await
}
