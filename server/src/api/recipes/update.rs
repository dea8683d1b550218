use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::labels::resolve_label_ids;
use crate::models::RecipeChanges;
use crate::schema::recipes;
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use diesel::prelude::*;

use super::form::{read_submission, RecipeUpload};
use super::store::{find_recipe, replace_labels};

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    request_body(content = RecipeUpload, content_type = "multipart/form-data"),
    responses(
        (status = 204, description = "Recipe updated successfully"),
        (status = 400, description = "Invalid form or image", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 413, description = "Image too large", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    let submission = read_submission(multipart).await?;
    // The first comment only exists at creation
    let form = submission.form;

    let existing = {
        let mut conn = state.pool.get()?;
        find_recipe(&mut conn, id)?
    };

    let new_image = match submission.image {
        Some(bytes) => Some(state.images.save(bytes).await?),
        None => None,
    };
    let image = new_image.as_deref().unwrap_or(&existing.image);

    let result = state.pool.get().map_err(AppError::from).and_then(|mut conn| {
        conn.transaction::<(), AppError, _>(|conn| {
            let steps_json = serde_json::to_string(&form.stored_steps())
                .map_err(|e| AppError::Internal(e.to_string()))?;
            let ingredients_json = serde_json::to_string(&form.stored_ingredients())
                .map_err(|e| AppError::Internal(e.to_string()))?;

            diesel::update(recipes::table.find(id))
                .set(&RecipeChanges {
                    title: &form.title,
                    servings: form.servings,
                    prep_time: form.preparation,
                    cooking_time: form.cooking,
                    image,
                    steps: &steps_json,
                    ingredients: &ingredients_json,
                })
                .execute(conn)?;

            let label_ids = resolve_label_ids(conn, &form.labels)?;
            replace_labels(conn, id, &label_ids)?;
            Ok(())
        })
    });

    match (result, new_image) {
        (Ok(()), Some(_)) => {
            // The default cover is shared, ImageStore::delete leaves it alone
            state.images.delete(&existing.image).await;
        }
        (Ok(()), None) => {}
        (Err(e), new_image) => {
            if let Some(name) = new_image {
                state.images.delete(&name).await;
            }
            return Err(e);
        }
    }

    tracing::info!(recipe_id = id, user_id = user.id, "recipe updated");
    Ok(StatusCode::NO_CONTENT)
}
