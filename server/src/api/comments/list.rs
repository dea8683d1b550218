use crate::api::recipes::store::{recipe_exists, RECIPE_NOT_FOUND};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::Comment;
use crate::schema::{comments, users};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;

use super::CommentResponse;

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/comments",
    tag = "comments",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Comments, newest first", body = Vec<CommentResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_comments(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    if !recipe_exists(&mut conn, recipe_id)? {
        return Err(AppError::NotFound(RECIPE_NOT_FOUND.to_string()));
    }

    let rows: Vec<(Comment, String)> = comments::table
        .inner_join(users::table)
        .filter(comments::recipe_id.eq(recipe_id))
        .order((comments::created_at.desc(), comments::id.desc()))
        .select((Comment::as_select(), users::name))
        .load(&mut conn)?;

    let body: Vec<CommentResponse> = rows
        .into_iter()
        .map(|(comment, name)| CommentResponse::new(comment, name))
        .collect();
    Ok(Json(body))
}
