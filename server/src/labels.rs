//! Label catalogue: seeding and lookups shared by the recipe handlers.

use crate::models::{Label, NewLabel};
use crate::schema::labels;
use crate::search::normalize;
use diesel::prelude::*;
use serde::Deserialize;
use std::path::Path;

/// The twenty labels the app ships with.
pub const BUILTIN_LABELS: &str = include_str!("../static/labels.json");

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LabelSeed {
    pub name: String,
    pub color: String,
    pub order: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum LabelSeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid label file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Reads seeds from `path`, or the built-in set when no file is configured.
pub fn load_seeds(path: Option<&Path>) -> Result<Vec<LabelSeed>, LabelSeedError> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| LabelSeedError::Read {
            path: path.display().to_string(),
            source,
        })?,
        None => BUILTIN_LABELS.to_string(),
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Inserts new labels by name and refreshes color and order of existing ones.
pub fn seed_labels(conn: &mut SqliteConnection, seeds: &[LabelSeed]) -> QueryResult<usize> {
    conn.transaction(|conn| {
        let mut written = 0;
        for seed in seeds {
            written += diesel::insert_into(labels::table)
                .values(&NewLabel {
                    name: &seed.name,
                    color: &seed.color,
                    sort_order: seed.order,
                })
                .on_conflict(labels::name)
                .do_update()
                .set((
                    labels::color.eq(&seed.color),
                    labels::sort_order.eq(seed.order),
                ))
                .execute(conn)?;
        }
        Ok(written)
    })
}

pub fn seed_from_file(
    conn: &mut SqliteConnection,
    path: Option<&Path>,
) -> Result<usize, LabelSeedError> {
    let seeds = load_seeds(path)?;
    let written = seed_labels(conn, &seeds)?;
    tracing::info!(count = written, "labels seeded");
    Ok(written)
}

pub fn all_labels(conn: &mut SqliteConnection) -> QueryResult<Vec<Label>> {
    labels::table
        .order((labels::sort_order.asc(), labels::id.asc()))
        .select(Label::as_select())
        .load(conn)
}

/// Ids of the labels named in `names`, compared case- and accent-insensitively.
/// Unknown names are skipped.
pub fn resolve_label_ids(conn: &mut SqliteConnection, names: &[String]) -> QueryResult<Vec<i32>> {
    let wanted: Vec<String> = names.iter().map(|n| normalize(n.trim())).collect();
    let mut ids: Vec<i32> = all_labels(conn)?
        .into_iter()
        .filter(|label| wanted.contains(&normalize(&label.name)))
        .map(|label| label.id)
        .collect();
    ids.dedup();

    if ids.len() < wanted.len() {
        tracing::debug!(requested = ?names, matched = ids.len(), "ignored unknown labels");
    }
    Ok(ids)
}
