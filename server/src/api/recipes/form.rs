//! The recipe form shared by create, edit and extraction.

use crate::error::AppError;
use crate::images::MAX_IMAGE_SIZE;
use crate::models::{Ingredient, Step};
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
pub struct IngredientInput {
    #[validate(range(min = 0.0, message = "Quantity must be zero or more"))]
    pub quantity: f64,
    #[validate(length(min = 1, message = "Ingredient is required"))]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
pub struct StepInput {
    #[validate(length(min = 1, message = "Step cannot be empty"))]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
pub struct RecipeForm {
    #[validate(length(min = 1, max = 255, message = "Title is required (255 characters max)"))]
    pub title: String,
    /// Cooking time in minutes.
    #[validate(range(min = 0, message = "Cooking time must be a positive number"))]
    pub cooking: i32,
    /// Preparation time in minutes.
    #[validate(range(min = 0, message = "Preparation time must be a positive number"))]
    pub preparation: i32,
    #[validate(range(min = 1, message = "Servings must be a positive number"))]
    pub servings: i32,
    #[validate(
        length(min = 1, message = "At least one ingredient is required"),
        nested
    )]
    pub ingredients: Vec<IngredientInput>,
    #[validate(length(min = 1, message = "At least one step is required"), nested)]
    pub steps: Vec<StepInput>,
    #[validate(length(min = 1, message = "At least one label is required"))]
    pub labels: Vec<String>,
    /// First comment, only used when creating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RecipeForm {
    /// Trims every text field, drops blank labels and an empty comment.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        for ingredient in &mut self.ingredients {
            ingredient.description = ingredient.description.trim().to_string();
        }
        for step in &mut self.steps {
            step.content = step.content.trim().to_string();
        }
        self.labels = self
            .labels
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        self.comment = self
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    pub fn validated(self) -> Result<Self, AppError> {
        let form = self.normalized();
        form.validate()?;
        Ok(form)
    }

    pub fn stored_ingredients(&self) -> Vec<Ingredient> {
        self.ingredients
            .iter()
            .map(|i| Ingredient {
                proportion: i.quantity,
                ingredient: i.description.clone(),
            })
            .collect()
    }

    pub fn stored_steps(&self) -> Vec<Step> {
        self.steps
            .iter()
            .map(|s| Step {
                description: s.content.clone(),
            })
            .collect()
    }
}

/// Multipart body of create and update. Documentation only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct RecipeUpload {
    /// The recipe form as a JSON string.
    pub recipe: String,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

/// A parsed recipe upload.
#[derive(Debug)]
pub struct RecipeSubmission {
    pub form: RecipeForm,
    pub image: Option<Vec<u8>>,
}

pub(crate) fn multipart_error(e: MultipartError) -> AppError {
    tracing::warn!("Multipart read error: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Max image size is 5MB.".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

/// Reads the `recipe` JSON field and the optional `image` file, then validates the form.
pub async fn read_submission(mut multipart: Multipart) -> Result<RecipeSubmission, AppError> {
    let mut form: Option<RecipeForm> = None;
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "recipe" => {
                let text = field.text().await.map_err(multipart_error)?;
                let parsed: RecipeForm = serde_json::from_str(&text)
                    .map_err(|e| AppError::BadRequest(format!("Invalid recipe data: {}", e)))?;
                form = Some(parsed);
            }
            "image" => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > MAX_IMAGE_SIZE {
                    return Err(AppError::PayloadTooLarge(
                        "Max image size is 5MB.".to_string(),
                    ));
                }
                // Browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    image = Some(bytes.to_vec());
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let form = form
        .ok_or_else(|| AppError::BadRequest("Missing recipe data".to_string()))?
        .validated()?;

    Ok(RecipeSubmission { form, image })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RecipeForm {
        RecipeForm {
            title: "Tiramisu".into(),
            cooking: 0,
            preparation: 30,
            servings: 6,
            ingredients: vec![IngredientInput {
                quantity: 250.0,
                description: "gr. de mascarpone".into(),
            }],
            steps: vec![StepInput {
                content: "Mélanger".into(),
            }],
            labels: vec!["Dessert".into()],
            comment: None,
        }
    }

    fn issue_paths(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(issues) => issues.into_iter().map(|i| i.path).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().validated().is_ok());
    }

    #[test]
    fn test_form_is_trimmed() {
        let mut form = valid_form();
        form.title = "  Tiramisu  ".into();
        form.labels = vec![" Dessert ".into(), "  ".into()];
        form.comment = Some("   ".into());
        let form = form.validated().unwrap();
        assert_eq!(form.title, "Tiramisu");
        assert_eq!(form.labels, vec!["Dessert"]);
        assert_eq!(form.comment, None);
    }

    #[test]
    fn test_blank_nested_fields_report_paths() {
        let mut form = valid_form();
        form.ingredients.push(IngredientInput {
            quantity: -1.0,
            description: "   ".into(),
        });
        form.steps[0].content = " ".into();
        let paths = issue_paths(form.validated().unwrap_err());
        assert_eq!(
            paths,
            vec![
                "ingredients[1].description",
                "ingredients[1].quantity",
                "steps[0].content",
            ]
        );
    }

    #[test]
    fn test_empty_lists_and_numbers() {
        let mut form = valid_form();
        form.title = " ".into();
        form.servings = 0;
        form.cooking = -5;
        form.ingredients.clear();
        form.steps.clear();
        form.labels.clear();
        let paths = issue_paths(form.validated().unwrap_err());
        assert_eq!(
            paths,
            vec![
                "cooking",
                "ingredients",
                "labels",
                "servings",
                "steps",
                "title"
            ]
        );
    }

    #[test]
    fn test_stored_shapes() {
        let form = valid_form();
        assert_eq!(form.stored_ingredients()[0].proportion, 250.0);
        assert_eq!(form.stored_ingredients()[0].ingredient, "gr. de mascarpone");
        assert_eq!(form.stored_steps()[0].description, "Mélanger");
    }

    #[test]
    fn test_comment_is_optional_in_json() {
        let json = r#"{"title":"Soupe","cooking":20,"preparation":10,"servings":4,
            "ingredients":[{"quantity":1,"description":"poireau"}],
            "steps":[{"content":"Cuire"}],"labels":["Plat"]}"#;
        let form: RecipeForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.comment, None);
        assert!(form.validated().is_ok());
    }
}
