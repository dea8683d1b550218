//! Queries shared by the recipe handlers.

use crate::error::AppError;
use crate::models::{Label, NewFavorite, NewRecipeLabel, Recipe};
use crate::schema::{favorites, labels, recipe_labels, recipes};
use diesel::prelude::*;

pub const RECIPE_NOT_FOUND: &str = "Recipe not found";

pub fn find_recipe(conn: &mut SqliteConnection, recipe_id: i32) -> Result<Recipe, AppError> {
    recipes::table
        .find(recipe_id)
        .select(Recipe::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::NotFound(RECIPE_NOT_FOUND.to_string()))
}

pub fn recipe_exists(conn: &mut SqliteConnection, recipe_id: i32) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(recipes::table.find(recipe_id))).get_result(conn)
}

/// Labels of a recipe in display order.
pub fn labels_of(conn: &mut SqliteConnection, recipe_id: i32) -> QueryResult<Vec<Label>> {
    recipe_labels::table
        .inner_join(labels::table)
        .filter(recipe_labels::recipe_id.eq(recipe_id))
        .order((labels::sort_order.asc(), labels::id.asc()))
        .select(Label::as_select())
        .load(conn)
}

/// Replaces the label set of a recipe. Call inside a transaction.
pub fn replace_labels(
    conn: &mut SqliteConnection,
    recipe_id: i32,
    label_ids: &[i32],
) -> QueryResult<()> {
    diesel::delete(recipe_labels::table.filter(recipe_labels::recipe_id.eq(recipe_id)))
        .execute(conn)?;

    let rows: Vec<NewRecipeLabel> = label_ids
        .iter()
        .map(|&label_id| NewRecipeLabel {
            recipe_id,
            label_id,
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(recipe_labels::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

pub fn is_favorited(conn: &mut SqliteConnection, user_id: i32, recipe_id: i32) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        favorites::table.find((user_id, recipe_id)),
    ))
    .get_result(conn)
}

/// Flips a favorite and returns the new state. Safe against a concurrent toggle of
/// the same pair: neither statement can hit the primary key.
pub fn toggle_favorite(conn: &mut SqliteConnection, user_id: i32, recipe_id: i32) -> QueryResult<bool> {
    let removed = diesel::delete(favorites::table.find((user_id, recipe_id))).execute(conn)?;
    if removed > 0 {
        return Ok(false);
    }
    diesel::insert_or_ignore_into(favorites::table)
        .values(&NewFavorite { user_id, recipe_id })
        .execute(conn)?;
    Ok(true)
}
