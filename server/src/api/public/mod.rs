pub mod auth;
pub mod health;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for public endpoints (no auth required)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/auth/register", post(auth::register::register))
        .route("/api/auth/login", post(auth::login::login))
        .route("/api/auth/refresh", post(auth::refresh::refresh))
        .route("/api/auth/verify-email", post(auth::verify_email::verify_email))
        .route(
            "/api/auth/forgot-password",
            post(auth::forgot_password::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(auth::reset_password::reset_password),
        )
        .route(
            "/api/auth/register-key",
            post(auth::register_key::check_register_key),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register::register,
        auth::login::login,
        auth::refresh::refresh,
        auth::verify_email::verify_email,
        auth::forgot_password::forgot_password,
        auth::reset_password::reset_password,
        auth::register_key::check_register_key,
    ),
    components(schemas(
        health::HealthResponse,
        auth::TokenResponse,
        auth::register::RegisterRequest,
        auth::register::RegisterResponse,
        auth::login::LoginRequest,
        auth::refresh::RefreshRequest,
        auth::verify_email::VerifyEmailRequest,
        auth::forgot_password::ForgotPasswordRequest,
        auth::reset_password::ResetPasswordRequest,
        auth::register_key::RegisterKeyRequest,
        auth::register_key::RegisterKeyResponse,
    ))
)]
pub struct ApiDoc;
