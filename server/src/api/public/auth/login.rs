use crate::api::ErrorResponse;
use crate::auth::{
    clean_expired, create_verification, hash_password, verify_password, PasswordCheck,
    EMAIL_VERIFICATION_PREFIX,
};
use crate::error::AppError;
use crate::schema::users;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{find_user_by_email, send_verification_email, sign_in, TokenResponse};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body(content = LoginRequest, example = json!({"email": "nonna@example.com", "password": "password123"})),
    params(
        ("X-Is-Mobile" = Option<String>, Header, description = "\"true\" to receive the refresh token in the body")
    ),
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Email not verified, a new verification email was sent", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    let Some(user) = find_user_by_email(&mut conn, &req.email)? else {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    match verify_password(&req.password, &user.password_hash) {
        PasswordCheck::Invalid => {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        PasswordCheck::ValidNeedsRehash => match hash_password(&req.password) {
            Ok(new_hash) => {
                diesel::update(users::table.find(user.id))
                    .set((
                        users::password_hash.eq(new_hash),
                        users::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(&mut conn)?;
                tracing::info!(user_id = user.id, "upgraded legacy password hash");
            }
            Err(e) => tracing::warn!(user_id = user.id, error = %e, "failed to rehash password"),
        },
        PasswordCheck::Valid => {}
    }

    if !user.email_verified {
        let token = create_verification(
            &mut conn,
            EMAIL_VERIFICATION_PREFIX,
            user.id,
            state.config.verification_token_minutes,
        )?;
        drop(conn);
        send_verification_email(state.mailer.as_ref(), &state.config, &user, &token).await;
        return Err(AppError::Forbidden(
            "Please verify your email address. A new verification email has been sent.".to_string(),
        ));
    }

    clean_expired(&mut conn)?;
    let (jar, body) = sign_in(&mut conn, &state.config, &headers, jar, &user)?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok((jar, Json(body)))
}
