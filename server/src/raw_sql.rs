//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! All SQL in this module has been reviewed for SQL injection safety:
//! - User input is ALWAYS passed via `.bind()` parameters
//! - No string concatenation or interpolation with user data
//!
//! When adding new SQL here:
//! 1. Document why Diesel DSL can't be used
//! 2. Ensure all user input uses `.bind()`

use chrono::NaiveDateTime;
use diesel::sql_types::{Bool, Integer, Text, Timestamp};
use diesel::QueryableByName;

/// One row of a recipe card listing.
///
/// `labels` is a JSON array of `{id, name, color, order}` objects, ordered by
/// label order.
#[derive(QueryableByName, Debug)]
pub struct RecipeCardRow {
    #[diesel(sql_type = Integer)]
    pub id: i32,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Text)]
    pub image: String,
    #[diesel(sql_type = Integer)]
    pub prep_time: i32,
    #[diesel(sql_type = Integer)]
    pub cooking_time: i32,
    #[diesel(sql_type = Integer)]
    pub servings: i32,
    #[diesel(sql_type = Timestamp)]
    pub submitted_date: NaiveDateTime,
    #[diesel(sql_type = Integer)]
    pub submitter_id: i32,
    #[diesel(sql_type = Text)]
    pub submitter_name: String,
    #[diesel(sql_type = Text)]
    pub labels: String,
    #[diesel(sql_type = Bool)]
    pub is_favorited: bool,
}

/// Shared card SELECT. Labels are aggregated with SQLite's `json_group_array`,
/// which Diesel has no DSL for.
///
/// # Safety
/// The single placeholder is the viewing user's id, passed via `.bind()`.
macro_rules! card_select {
    () => {
        "SELECT r.id, r.title, r.image, r.prep_time, r.cooking_time, r.servings, \
         r.submitted_date, u.id AS submitter_id, u.name AS submitter_name, \
         (SELECT json_group_array(json_object('id', ol.id, 'name', ol.name, 'color', ol.color, 'order', ol.sort_order)) \
            FROM (SELECT l.id, l.name, l.color, l.sort_order FROM labels l \
                  JOIN recipe_labels rl ON rl.label_id = l.id \
                  WHERE rl.recipe_id = r.id ORDER BY l.sort_order) ol) AS labels, \
         EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ?) AS is_favorited \
         FROM recipes r JOIN users u ON u.id = r.submitter_id"
    };
}

/// A card query and how many times it binds the viewing user's id.
#[derive(Debug, Clone, Copy)]
pub struct CardQuery {
    pub sql: &'static str,
    pub viewer_binds: usize,
}

/// Most recent recipes for the dashboard.
///
/// # Safety
/// Bind: viewing user id.
pub const RECENT_CARDS: CardQuery = CardQuery {
    sql: concat!(
        card_select!(),
        " ORDER BY r.submitted_date DESC, r.id DESC LIMIT 8"
    ),
    viewer_binds: 1,
};

/// The viewing user's favorites, by title.
///
/// # Safety
/// Binds: viewing user id (twice).
pub const FAVORITE_CARDS: CardQuery = CardQuery {
    sql: concat!(
        card_select!(),
        " WHERE r.id IN (SELECT fv.recipe_id FROM favorites fv WHERE fv.user_id = ?) \
         ORDER BY r.title COLLATE NOCASE, r.id"
    ),
    viewer_binds: 2,
};

/// Every recipe, by title (case-insensitive). Search filtering happens after loading.
///
/// # Safety
/// Bind: viewing user id.
pub const ALL_CARDS: CardQuery = CardQuery {
    sql: concat!(card_select!(), " ORDER BY r.title COLLATE NOCASE, r.id"),
    viewer_binds: 1,
};
