use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::schema::comments;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;

use super::find_comment;

#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    tag = "comments",
    params(
        ("id" = i32, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.pool.get()?;

    let existing = find_comment(&mut conn, id)?;
    if existing.user_id != user.id {
        return Err(AppError::Forbidden(
            "You can only delete your own comments".to_string(),
        ));
    }

    diesel::delete(comments::table.find(id)).execute(&mut conn)?;
    tracing::info!(comment_id = id, user_id = user.id, "comment deleted");

    Ok(StatusCode::NO_CONTENT)
}
