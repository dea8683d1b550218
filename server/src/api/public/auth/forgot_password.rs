use crate::api::ErrorResponse;
use crate::auth::{create_verification, RESET_PASSWORD_PREFIX};
use crate::config::Config;
use crate::error::AppError;
use crate::mail::{templates, Email};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use super::find_user_by_email;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
    /// Frontend page that receives `?token=`. Must live on a known origin.
    #[serde(default)]
    pub callback: Option<String>,
}

/// Reset link base. Callbacks outside the app and CORS origins are ignored.
fn reset_link(config: &Config, callback: Option<&str>, token: &str) -> String {
    let trusted = |url: &str| {
        std::iter::once(config.base_url.as_str())
            .chain(config.cors_origins.iter().map(String::as_str))
            .any(|origin| {
                let origin = origin.trim_end_matches('/');
                url == origin || url.starts_with(&format!("{}/", origin))
            })
    };

    match callback.map(str::trim).filter(|c| !c.is_empty()) {
        Some(cb) if trusted(cb) => {
            let sep = if cb.contains('?') { '&' } else { '?' };
            format!("{}{}token={}", cb, sep, token)
        }
        Some(cb) => {
            tracing::warn!(callback = %cb, "ignoring untrusted password reset callback");
            config.frontend_url("reset-password", token)
        }
        None => config.frontend_url("reset-password", token),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "Reset email sent if the account exists"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.pool.get()?;

    let Some(user) = find_user_by_email(&mut conn, &req.email)? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(StatusCode::NO_CONTENT);
    };

    let token = create_verification(
        &mut conn,
        RESET_PASSWORD_PREFIX,
        user.id,
        state.config.verification_token_minutes,
    )?;
    drop(conn);

    let link = reset_link(&state.config, req.callback.as_deref(), &token);
    let (subject, html) = templates::password_reset_email(&user.name, &link);
    if let Err(e) = state
        .mailer
        .send(Email {
            to: user.email.clone(),
            subject,
            html,
        })
        .await
    {
        tracing::error!(user_id = user.id, error = %e, "failed to send password reset email");
    }

    Ok(StatusCode::NO_CONTENT)
}
