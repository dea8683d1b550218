use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::extract::{extract_recipe, ExtractionInput};
use crate::labels::all_labels;
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::form::{multipart_error, RecipeForm};

/// Multipart body of an extraction request. Documentation only.
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct ExtractUpload {
    /// `text` or `file`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The recipe text, or a .docx, .pdf, .png, .jpg or .webp file.
    #[schema(value_type = String, format = Binary)]
    pub content: Vec<u8>,
}

enum Kind {
    Text,
    File,
}

#[utoipa::path(
    post,
    path = "/api/recipes/extract",
    tag = "recipes",
    request_body(content = ExtractUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Extracted recipe form, ready for review", body = RecipeForm),
        (status = 400, description = "Unsupported or unreadable input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "The model returned an unusable recipe", body = ErrorResponse),
        (status = 503, description = "Extraction is not configured", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn extract(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let Some(provider) = state.llm.clone() else {
        return Err(AppError::Unavailable(
            "Recipe extraction is not available".to_string(),
        ));
    };

    let mut kind: Option<Kind> = None;
    let mut text: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "type" => {
                let value = field.text().await.map_err(multipart_error)?;
                kind = match value.trim() {
                    "text" => Some(Kind::Text),
                    "file" => Some(Kind::File),
                    other => {
                        return Err(AppError::BadRequest(format!(
                            "Unknown extraction type: {}",
                            other
                        )))
                    }
                };
            }
            "content" => match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let data = field.bytes().await.map_err(multipart_error)?;
                    file = Some((filename, data.to_vec()));
                }
                None => {
                    text = Some(field.text().await.map_err(multipart_error)?);
                }
            },
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let input = match (kind, text, file) {
        (Some(Kind::Text), Some(text), _) => ExtractionInput::Text(text),
        (Some(Kind::File), _, Some((filename, data))) => ExtractionInput::File { filename, data },
        (None, _, _) => return Err(AppError::BadRequest("Missing extraction type".to_string())),
        _ => return Err(AppError::BadRequest("Missing content".to_string())),
    };

    let labels = {
        let mut conn = state.pool.get()?;
        all_labels(&mut conn)?
    };

    let form = extract_recipe(
        provider.as_ref(),
        &input,
        &labels,
        &state.config.extraction_language,
    )
    .await?;
    tracing::info!(user_id = user.id, title = %form.title, "recipe extracted");

    Ok(Json(form))
}
