use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::store::{self, recipe_exists, RECIPE_NOT_FOUND};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub is_favorited: bool,
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/favorite",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "New favorite state", body = FavoriteResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn toggle_favorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    if !recipe_exists(&mut conn, id)? {
        return Err(AppError::NotFound(RECIPE_NOT_FOUND.to_string()));
    }

    let now_favorited = store::toggle_favorite(&mut conn, user.id, id)?;

    Ok(Json(FavoriteResponse {
        is_favorited: now_favorited,
    }))
}
