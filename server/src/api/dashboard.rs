use crate::api::recipes::cards::{load_cards, RecipeCard};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::raw_sql::{FAVORITE_CARDS, RECENT_CARDS};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardResponse {
    /// The eight most recently submitted recipes.
    pub last_recipes: Vec<RecipeCard>,
    pub favorite_recipes: Vec<RecipeCard>,
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "recipes",
    responses(
        (status = 200, description = "Recent and favorite recipes", body = DashboardResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn dashboard(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    let last_recipes = load_cards(&mut conn, &state.config, RECENT_CARDS, user.id)?;
    let favorite_recipes = load_cards(&mut conn, &state.config, FAVORITE_CARDS, user.id)?;

    Ok(Json(DashboardResponse {
        last_recipes,
        favorite_recipes,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(dashboard))
}

#[derive(OpenApi)]
#[openapi(paths(dashboard), components(schemas(DashboardResponse)))]
pub struct ApiDoc;
