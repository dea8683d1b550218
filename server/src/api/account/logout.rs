use crate::api::public::auth::clear_refresh_cookie;
use crate::api::ErrorResponse;
use crate::auth::{expire_session, CurrentSession};
use crate::error::AppError;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Session expired and refresh cookie cleared"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;
    expire_session(&mut conn, session.session_id, state.config.token_grace_seconds)?;
    tracing::info!(user_id = session.user.id, "user logged out");

    Ok((clear_refresh_cookie(jar), StatusCode::NO_CONTENT))
}
