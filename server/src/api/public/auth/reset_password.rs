use crate::api::ErrorResponse;
use crate::auth::{consume_verification, hash_password, revoke_all_sessions, RESET_PASSWORD_PREFIX};
use crate::error::AppError;
use crate::schema::users;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::INVALID_TOKEN_MESSAGE;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub new_password: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password changed, all sessions revoked"),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    req.validate()?;
    let password_hash =
        hash_password(&req.new_password).map_err(|e| AppError::Internal(e.to_string()))?;

    let mut conn = state.pool.get()?;

    let Some(user_id) = consume_verification(&mut conn, RESET_PASSWORD_PREFIX, req.token.trim())?
    else {
        return Err(AppError::BadRequest(INVALID_TOKEN_MESSAGE.to_string()));
    };

    let revoked = conn.transaction(|conn| {
        let updated = diesel::update(users::table.find(user_id))
            .set((
                users::password_hash.eq(&password_hash),
                users::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        if updated == 0 {
            return Err(diesel::result::Error::NotFound);
        }
        revoke_all_sessions(conn, user_id)
    });

    match revoked {
        Ok(revoked) => {
            tracing::info!(user_id, revoked, "password reset");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(diesel::result::Error::NotFound) => {
            Err(AppError::BadRequest(INVALID_TOKEN_MESSAGE.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
