use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::images::DEFAULT_COVER;
use crate::labels::resolve_label_ids;
use crate::models::{NewComment, NewRecipe};
use crate::schema::{comments, recipes};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use super::form::{read_submission, RecipeUpload};
use super::store::replace_labels;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateRecipeResponse {
    pub id: i32,
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body(content = RecipeUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Recipe created successfully", body = CreateRecipeResponse),
        (status = 400, description = "Invalid form or image", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let submission = read_submission(multipart).await?;
    let form = submission.form;

    // No connection is held while the cover is resized
    let saved_image = match submission.image {
        Some(bytes) => Some(state.images.save(bytes).await?),
        None => None,
    };
    let image = saved_image.as_deref().unwrap_or(DEFAULT_COVER);
    let now = Utc::now().naive_utc();

    let result = state.pool.get().map_err(AppError::from).and_then(|mut conn| {
        conn.transaction::<i32, AppError, _>(|conn| {
            let steps_json = serde_json::to_string(&form.stored_steps())
                .map_err(|e| AppError::Internal(e.to_string()))?;
            let ingredients_json = serde_json::to_string(&form.stored_ingredients())
                .map_err(|e| AppError::Internal(e.to_string()))?;

            // 1. The recipe row
            let recipe_id: i32 = diesel::insert_into(recipes::table)
                .values(&NewRecipe {
                    title: &form.title,
                    servings: form.servings,
                    prep_time: form.preparation,
                    cooking_time: form.cooking,
                    image,
                    steps: &steps_json,
                    ingredients: &ingredients_json,
                    submitter_id: user.id,
                    submitted_date: now,
                })
                .returning(recipes::id)
                .get_result(conn)?;

            // 2. Its labels
            let label_ids = resolve_label_ids(conn, &form.labels)?;
            replace_labels(conn, recipe_id, &label_ids)?;

            // 3. The submitter's first comment
            if let Some(content) = form.comment.as_deref() {
                diesel::insert_into(comments::table)
                    .values(&NewComment {
                        user_id: user.id,
                        recipe_id,
                        content,
                        created_at: now,
                    })
                    .execute(conn)?;
            }

            Ok(recipe_id)
        })
    });

    match result {
        Ok(id) => {
            tracing::info!(recipe_id = id, user_id = user.id, "recipe created");
            Ok((StatusCode::CREATED, Json(CreateRecipeResponse { id })))
        }
        Err(e) => {
            if let Some(name) = saved_image.as_deref() {
                state.images.delete(name).await;
            }
            Err(e)
        }
    }
}
