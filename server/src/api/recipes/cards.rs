use crate::config::Config;
use crate::error::AppError;
use crate::models::Label;
use crate::raw_sql::{CardQuery, RecipeCardRow};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel::sqlite::Sqlite;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Submitter {
    pub id: i32,
    pub name: String,
}

/// Recipe summary shown on the dashboard and in listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeCard {
    pub id: i32,
    pub title: String,
    pub image_url: String,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub servings: i32,
    pub submitted_date: NaiveDateTime,
    pub submitter: Submitter,
    pub labels: Vec<Label>,
    pub is_favorited: bool,
}

impl RecipeCard {
    pub fn from_row(row: RecipeCardRow, config: &Config) -> Self {
        let labels = match serde_json::from_str::<Vec<Label>>(&row.labels) {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!(recipe_id = row.id, error = %e, "unreadable label aggregate");
                Vec::new()
            }
        };
        Self {
            id: row.id,
            image_url: config.cover_url(&row.image),
            title: row.title,
            prep_time: row.prep_time,
            cooking_time: row.cooking_time,
            servings: row.servings,
            submitted_date: row.submitted_date,
            submitter: Submitter {
                id: row.submitter_id,
                name: row.submitter_name,
            },
            labels,
            is_favorited: row.is_favorited,
        }
    }
}

/// Runs one of the card queries in `raw_sql` for a viewing user.
pub fn load_cards(
    conn: &mut SqliteConnection,
    config: &Config,
    query: CardQuery,
    viewer_id: i32,
) -> Result<Vec<RecipeCard>, AppError> {
    let mut sql = diesel::sql_query(query.sql).into_boxed::<Sqlite>();
    for _ in 0..query.viewer_binds {
        sql = sql.bind::<Integer, _>(viewer_id);
    }
    let rows: Vec<RecipeCardRow> = sql.load(conn)?;
    Ok(rows
        .into_iter()
        .map(|row| RecipeCard::from_row(row, config))
        .collect())
}
