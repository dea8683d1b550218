use crate::error::AppError;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Access level stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Managers and admins may delete any recipe.
    pub fn can_delete_recipes(self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub role: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_seen: Option<NaiveDateTime>,
}

impl User {
    /// Unknown role strings degrade to the least privileged role.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub email_verified: bool,
    pub role: &'a str,
    pub password_hash: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[allow(dead_code)]
pub struct Session {
    pub id: i32,
    pub user_id: i32,
    pub access_token_hash: String,
    pub access_expires_at: NaiveDateTime,
    pub refresh_token_hash: String,
    pub refresh_expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::sessions)]
pub struct NewSession<'a> {
    pub user_id: i32,
    pub access_token_hash: &'a str,
    pub access_expires_at: NaiveDateTime,
    pub refresh_token_hash: &'a str,
    pub refresh_expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::verifications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[allow(dead_code)]
pub struct Verification {
    pub id: i32,
    pub identifier: String,
    pub value: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::verifications)]
pub struct NewVerification<'a> {
    pub identifier: &'a str,
    pub value: &'a str,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

// Ingredient and step shapes for the JSON text columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ingredient {
    pub proportion: f64,
    pub ingredient: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Step {
    pub description: String,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Recipe {
    pub id: i32,
    pub title: String,
    pub servings: i32,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub image: String,
    pub steps: String,
    pub ingredients: String,
    pub comment: Option<String>,
    pub submitter_id: i32,
    pub submitted_date: NaiveDateTime,
}

impl Recipe {
    pub fn parsed_steps(&self) -> Result<Vec<Step>, AppError> {
        self.parse_column("steps", &self.steps)
    }

    pub fn parsed_ingredients(&self) -> Result<Vec<Ingredient>, AppError> {
        self.parse_column("ingredients", &self.ingredients)
    }

    fn parse_column<T: DeserializeOwned>(
        &self,
        column: &'static str,
        raw: &str,
    ) -> Result<Vec<T>, AppError> {
        serde_json::from_str(raw).map_err(|e| {
            tracing::warn!(recipe_id = self.id, column, error = %e, "unreadable recipe column");
            AppError::Internal(format!("recipe {} has unreadable {}: {}", self.id, column, e))
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub servings: i32,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub image: &'a str,
    pub steps: &'a str,
    pub ingredients: &'a str,
    pub submitter_id: i32,
    pub submitted_date: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::recipes)]
pub struct RecipeChanges<'a> {
    pub title: &'a str,
    pub servings: i32,
    pub prep_time: i32,
    pub cooking_time: i32,
    pub image: &'a str,
    pub steps: &'a str,
    pub ingredients: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::schema::labels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Label {
    pub id: i32,
    pub name: String,
    pub color: String,
    #[serde(rename = "order")]
    pub sort_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::labels)]
pub struct NewLabel<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub sort_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_labels)]
pub struct NewRecipeLabel {
    pub recipe_id: i32,
    pub label_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::favorites)]
pub struct NewFavorite {
    pub user_id: i32,
    pub recipe_id: i32,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Comment {
    pub id: i32,
    pub user_id: i32,
    pub recipe_id: i32,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::comments)]
pub struct NewComment<'a> {
    pub user_id: i32,
    pub recipe_id: i32,
    pub content: &'a str,
    pub created_at: NaiveDateTime,
}
