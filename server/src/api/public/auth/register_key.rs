use crate::auth::verify_register_key;
use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterKeyRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterKeyResponse {
    pub valid: bool,
}

/// Lets the signup form check the family key before asking for the rest.
#[utoipa::path(
    post,
    path = "/api/auth/register-key",
    tag = "auth",
    request_body = RegisterKeyRequest,
    responses(
        (status = 200, description = "Whether the key is valid", body = RegisterKeyResponse)
    )
)]
pub async fn check_register_key(
    State(state): State<AppState>,
    Json(req): Json<RegisterKeyRequest>,
) -> Json<RegisterKeyResponse> {
    let valid = state
        .config
        .register_key
        .as_ref()
        .map(|k| verify_register_key(&req.key, &k.salt, &k.hash))
        .unwrap_or(false);
    Json(RegisterKeyResponse { valid })
}
