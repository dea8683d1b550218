use crate::api::ErrorResponse;
use crate::auth::{expire_session, find_session_by_tokens, revoke_all_sessions, session_is_refreshable};
use crate::error::AppError;
use crate::models::User;
use crate::schema::users;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{sign_in, TokenResponse, REFRESH_COOKIE};

const INVALID_SESSION: &str = "Invalid or expired session";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub access_token: String,
    /// Mobile clients send it here; browsers rely on the refresh cookie.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = TokenResponse),
        (status = 401, description = "Unknown session or expired refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let refresh_token = req
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()));
    let Some(refresh_token) = refresh_token else {
        return Err(AppError::Unauthorized("Missing refresh token".to_string()));
    };

    let mut conn = state.pool.get()?;

    let Some(session) = find_session_by_tokens(&mut conn, &req.access_token, &refresh_token)?
    else {
        return Err(AppError::Unauthorized(INVALID_SESSION.to_string()));
    };

    if !session_is_refreshable(&session) {
        // An expired refresh token being replayed: drop every session of the user
        let revoked = revoke_all_sessions(&mut conn, session.user_id)?;
        tracing::warn!(
            user_id = session.user_id,
            revoked,
            "expired refresh token reused, revoked all sessions"
        );
        return Err(AppError::Unauthorized(INVALID_SESSION.to_string()));
    }

    let user: User = users::table
        .find(session.user_id)
        .select(User::as_select())
        .first(&mut conn)?;

    expire_session(&mut conn, session.id, state.config.token_grace_seconds)?;
    let (jar, body) = sign_in(&mut conn, &state.config, &headers, jar, &user)?;
    tracing::debug!(user_id = user.id, "session refreshed");

    Ok((jar, Json(body)))
}
