use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::Comment;
use crate::schema::comments;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;

use super::{find_comment, CommentRequest, CommentResponse};

#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    tag = "comments",
    params(
        ("id" = i32, Path, description = "Comment ID")
    ),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 400, description = "Empty comment", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = req.content()?;
    let mut conn = state.pool.get()?;

    let existing = find_comment(&mut conn, id)?;
    if existing.user_id != user.id {
        return Err(AppError::Forbidden(
            "You can only edit your own comments".to_string(),
        ));
    }

    let comment: Comment = diesel::update(comments::table.find(id))
        .set((
            comments::content.eq(content),
            comments::updated_at.eq(Some(Utc::now().naive_utc())),
        ))
        .returning(Comment::as_returning())
        .get_result(&mut conn)?;

    Ok(Json(CommentResponse::new(comment, user.name)))
}
