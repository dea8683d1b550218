use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::models::{Role, User};
use axum::{response::IntoResponse, Json};
use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_seen: Option<NaiveDateTime>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role(),
            email_verified: user.email_verified,
            image: user.image.clone(),
            created_at: user.created_at,
            last_seen: user.last_seen,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "account",
    responses(
        (status = 200, description = "The signed-in user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(UserResponse::from(&user))
}
