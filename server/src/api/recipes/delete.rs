use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::schema::recipes;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;

use super::store::find_recipe;

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe deleted successfully"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Only managers and admins can delete recipes", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if !user.role().can_delete_recipes() {
        return Err(AppError::Forbidden(
            "You are not allowed to delete recipes".to_string(),
        ));
    }

    let mut conn = state.pool.get()?;
    let recipe = find_recipe(&mut conn, id)?;

    // Labels, favorites and comments go with it (ON DELETE CASCADE)
    diesel::delete(recipes::table.find(id)).execute(&mut conn)?;
    drop(conn);

    state.images.delete(&recipe.image).await;
    tracing::info!(recipe_id = id, user_id = user.id, "recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}
