pub mod cards;
pub mod create;
pub mod delete;
pub mod edit_form;
pub mod extract;
pub mod favorite;
pub mod form;
pub mod get;
pub mod list;
pub mod store;
pub mod update;

use crate::api::comments;
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route("/extract", post(extract::extract))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route("/{id}/edit", get(edit_form::edit_form))
        .route("/{id}/favorite", post(favorite::toggle_favorite))
        .route(
            "/{id}/comments",
            get(comments::list::list_comments).post(comments::create::create_comment),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_recipe,
        list::list_recipes,
        get::get_recipe,
        edit_form::edit_form,
        update::update_recipe,
        delete::delete_recipe,
        favorite::toggle_favorite,
        extract::extract,
    ),
    components(schemas(
        cards::RecipeCard,
        cards::Submitter,
        create::CreateRecipeResponse,
        list::ListRecipesResponse,
        get::RecipeResponse,
        edit_form::EditRecipeResponse,
        favorite::FavoriteResponse,
        form::RecipeForm,
        form::IngredientInput,
        form::StepInput,
        form::RecipeUpload,
        extract::ExtractUpload,
    ))
)]
pub struct ApiDoc;
