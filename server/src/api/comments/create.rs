use crate::api::recipes::store::{recipe_exists, RECIPE_NOT_FOUND};
use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{Comment, NewComment};
use crate::schema::comments;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;

use super::{CommentRequest, CommentResponse};

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/comments",
    tag = "comments",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Empty comment", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = req.content()?;
    let mut conn = state.pool.get()?;

    if !recipe_exists(&mut conn, recipe_id)? {
        return Err(AppError::NotFound(RECIPE_NOT_FOUND.to_string()));
    }

    let comment: Comment = diesel::insert_into(comments::table)
        .values(&NewComment {
            user_id: user.id,
            recipe_id,
            content,
            created_at: Utc::now().naive_utc(),
        })
        .returning(Comment::as_returning())
        .get_result(&mut conn)?;

    tracing::info!(comment_id = comment.id, recipe_id, user_id = user.id, "comment added");
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::new(comment, user.name)),
    ))
}
