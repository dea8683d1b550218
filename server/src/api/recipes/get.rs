use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{Ingredient, Label, Step};
use crate::schema::users;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use super::cards::Submitter;
use super::store::{find_recipe, is_favorited, labels_of};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub title: String,
    pub image: String,
    pub image_url: String,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub servings: i32,
    pub steps: Vec<Step>,
    pub ingredients: Vec<Ingredient>,
    pub submitter: Submitter,
    pub submitted_date: NaiveDateTime,
    pub labels: Vec<Label>,
    pub is_favorited: bool,
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i32, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = RecipeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.pool.get()?;

    let recipe = find_recipe(&mut conn, id)?;
    let submitter_name: String = users::table
        .find(recipe.submitter_id)
        .select(users::name)
        .first(&mut conn)?;
    let labels = labels_of(&mut conn, id)?;
    let favorited = is_favorited(&mut conn, user.id, id)?;

    Ok(Json(RecipeResponse {
        id: recipe.id,
        image_url: state.config.cover_url(&recipe.image),
        steps: recipe.parsed_steps()?,
        ingredients: recipe.parsed_ingredients()?,
        title: recipe.title,
        image: recipe.image,
        prep_time: recipe.prep_time,
        cooking_time: recipe.cooking_time,
        servings: recipe.servings,
        submitter: Submitter {
            id: recipe.submitter_id,
            name: submitter_name,
        },
        submitted_date: recipe.submitted_date,
        labels,
        is_favorited: favorited,
    }))
}
