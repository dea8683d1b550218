use crate::api::ErrorResponse;
use crate::auth::{create_verification, hash_password, verify_register_key, EMAIL_VERIFICATION_PREFIX};
use crate::error::AppError;
use crate::models::{NewUser, Role, User};
use crate::schema::users;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::send_verification_email;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 60, message = "Name must be between 1 and 60 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,
    pub register_key: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: i32,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body(content = RegisterRequest, example = json!({"name": "Nonna", "email": "nonna@example.com", "password": "password123", "register_key": "family-secret"})),
    responses(
        (status = 201, description = "Account created, verification email sent", body = RegisterResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Invalid register key or registration disabled", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(mut req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.name = req.name.trim().to_string();
    req.email = req.email.trim().to_lowercase();
    req.validate()?;

    let Some(key) = state.config.register_key.as_ref() else {
        return Err(AppError::Forbidden(
            "Registration is currently disabled".to_string(),
        ));
    };
    if !verify_register_key(&req.register_key, &key.salt, &key.hash) {
        tracing::info!("registration attempt with an invalid register key");
        return Err(AppError::Forbidden("Invalid register key".to_string()));
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;

    let mut conn = state.pool.get()?;
    let now = Utc::now().naive_utc();

    let user: User = match diesel::insert_into(users::table)
        .values(&NewUser {
            name: &req.name,
            email: &req.email,
            email_verified: false,
            role: Role::User.as_str(),
            password_hash: &password_hash,
            created_at: now,
            updated_at: now,
        })
        .returning(User::as_returning())
        .get_result(&mut conn)
    {
        Ok(u) => u,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    let token = create_verification(
        &mut conn,
        EMAIL_VERIFICATION_PREFIX,
        user.id,
        state.config.verification_token_minutes,
    )?;
    drop(conn);

    send_verification_email(state.mailer.as_ref(), &state.config, &user, &token).await;
    tracing::info!(user_id = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id: user.id }),
    ))
}
