pub mod logout;
pub mod me;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Signed-in account endpoints
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/logout", post(logout::logout))
        .route("/api/users/me", get(me::me))
}

#[derive(OpenApi)]
#[openapi(
    paths(logout::logout, me::me),
    components(schemas(me::UserResponse))
)]
pub struct ApiDoc;
