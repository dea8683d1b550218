use crate::api::ErrorResponse;
use crate::auth::{consume_verification, EMAIL_VERIFICATION_PREFIX};
use crate::error::AppError;
use crate::models::User;
use crate::schema::users;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{sign_in, TokenResponse, INVALID_TOKEN_MESSAGE};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified and signed in", body = TokenResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    let Some(user_id) = consume_verification(&mut conn, EMAIL_VERIFICATION_PREFIX, req.token.trim())?
    else {
        return Err(AppError::BadRequest(INVALID_TOKEN_MESSAGE.to_string()));
    };

    let user: User = diesel::update(users::table.find(user_id))
        .set((
            users::email_verified.eq(true),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(User::as_returning())
        .get_result(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::BadRequest(INVALID_TOKEN_MESSAGE.to_string()))?;

    let (jar, body) = sign_in(&mut conn, &state.config, &headers, jar, &user)?;
    tracing::info!(user_id = user.id, "email verified");

    Ok((jar, Json(body)))
}
