use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::labels::all_labels;
use crate::models::Label;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::form::{IngredientInput, RecipeForm, StepInput};
use super::store::{find_recipe, labels_of};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EditRecipeResponse {
    /// Current values, in the shape the form submits them.
    pub recipe: RecipeForm,
    pub image_url: String,
    /// Every label the recipe can be tagged with.
    pub labels: Vec<Label>,
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/edit",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe form values and available labels", body = EditRecipeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn edit_form(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    let recipe = find_recipe(&mut conn, id)?;
    let current_labels = labels_of(&mut conn, id)?;
    let labels = all_labels(&mut conn)?;

    let form = RecipeForm {
        ingredients: recipe
            .parsed_ingredients()?
            .into_iter()
            .map(|i| IngredientInput {
                quantity: i.proportion,
                description: i.ingredient,
            })
            .collect(),
        steps: recipe
            .parsed_steps()?
            .into_iter()
            .map(|s| StepInput {
                content: s.description,
            })
            .collect(),
        title: recipe.title,
        cooking: recipe.cooking_time,
        preparation: recipe.prep_time,
        servings: recipe.servings,
        labels: current_labels.into_iter().map(|l| l.name).collect(),
        comment: None,
    };

    Ok(Json(EditRecipeResponse {
        recipe: form,
        image_url: state.config.cover_url(&recipe.image),
        labels,
    }))
}
