use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::labels::all_labels;
use crate::models::Label;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use utoipa::OpenApi;

#[utoipa::path(
    get,
    path = "/api/labels",
    tag = "labels",
    responses(
        (status = 200, description = "All labels ordered by display order", body = Vec<Label>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_labels(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;
    Ok(Json(all_labels(&mut conn)?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/labels", get(list_labels))
}

#[derive(OpenApi)]
#[openapi(paths(list_labels), components(schemas(Label)))]
pub struct ApiDoc;
