use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::labels::all_labels;
use crate::models::Label;
use crate::raw_sql::ALL_CARDS;
use crate::search::parse_query;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::cards::{load_cards, RecipeCard};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Search query. Supports:
    /// - Plain text: every term must appear in the title
    /// - label:value: the recipe must carry this label (can use multiple)
    ///
    /// Accents and case are ignored. Quote terms containing spaces:
    /// `tarte label:"Viande blanche"`
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub labels: Vec<Label>,
    pub recipes: Vec<RecipeCard>,
    /// Number of recipes matching the query.
    pub total: usize,
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Recipes ordered by title", body = ListRecipesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListRecipesParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    let labels = all_labels(&mut conn)?;
    let mut recipes = load_cards(&mut conn, &state.config, ALL_CARDS, user.id)?;

    let query = parse_query(params.q.as_deref().unwrap_or(""));
    if !query.is_empty() {
        recipes.retain(|card| {
            query.matches(&card.title, card.labels.iter().map(|l| l.name.as_str()))
        });
    }

    Ok(Json(ListRecipesResponse {
        labels,
        total: recipes.len(),
        recipes,
    }))
}
