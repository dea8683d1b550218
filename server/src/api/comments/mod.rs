pub mod create;
pub mod delete;
pub mod list;
pub mod update;

use crate::api::recipes::cards::Submitter;
use crate::error::AppError;
use crate::models::Comment;
use crate::schema::comments;
use crate::AppState;
use axum::routing::put;
use axum::Router;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

pub const COMMENT_NOT_FOUND: &str = "Comment not found";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    /// Trimmed content, rejecting blank comments.
    pub fn content(&self) -> Result<&str, AppError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
        }
        Ok(content)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub recipe_id: i32,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
    pub author: Submitter,
}

impl CommentResponse {
    pub fn new(comment: Comment, author_name: String) -> Self {
        Self {
            id: comment.id,
            recipe_id: comment.recipe_id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            author: Submitter {
                id: comment.user_id,
                name: author_name,
            },
        }
    }
}

pub(crate) fn find_comment(conn: &mut SqliteConnection, comment_id: i32) -> Result<Comment, AppError> {
    comments::table
        .find(comment_id)
        .select(Comment::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::NotFound(COMMENT_NOT_FOUND.to_string()))
}

/// Routes under /api/comments. Listing and adding live on the recipe router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        put(update::update_comment).delete(delete::delete_comment),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_comments,
        create::create_comment,
        update::update_comment,
        delete::delete_comment,
    ),
    components(schemas(CommentRequest, CommentResponse))
)]
pub struct ApiDoc;
