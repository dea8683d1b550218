use crate::images::ImageError;
use crate::llm::LlmError;
use crate::mail::{templates, Email, MailError};
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use validator::{ValidationErrors, ValidationErrorsKind};

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";
pub const VALIDATION_MESSAGE: &str = "Please fix the form errors";

/// One failed form field, addressed like `ingredients[0].description`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<FieldIssue>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            issues: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", VALIDATION_MESSAGE)]
    Validation(Vec<FieldIssue>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    /// The user sees `message`; `detail` only goes to logs and the admin.
    #[error("{message}: {detail}")]
    ExtractionFailed { message: String, detail: String },
    #[error("{0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("mail error: {0}")]
    Mail(#[from] MailError),
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
    #[error("image error: {0}")]
    Image(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ExtractionFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Mail(_)
            | AppError::Llm(_)
            | AppError::Image(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::ExtractionFailed { .. } => "ExtractionFailed",
            AppError::Unavailable(_) => "Unavailable",
            AppError::Database(_) => "DatabaseError",
            AppError::Pool(_) => "PoolError",
            AppError::Mail(_) => "MailError",
            AppError::Llm(_) => "LlmError",
            AppError::Image(_) => "ImageError",
            AppError::Internal(_) => "InternalError",
        }
    }

    /// Whether the administrator should hear about this error.
    pub fn is_unexpected(&self) -> bool {
        match self {
            AppError::ExtractionFailed { .. } => true,
            AppError::Unavailable(_) => false,
            other => other.status().is_server_error(),
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::ExtractionFailed { message, .. } => message.clone(),
            _ if self.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => AppError::NotFound("Not found".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ImageError::Unsupported(_) | ImageError::Undecodable(_) => {
                tracing::info!(error = %err, "rejected uploaded image");
                AppError::BadRequest("This image could not be processed".to_string())
            }
            ImageError::InvalidName(_) | ImageError::Io(_) | ImageError::Encode(_) => {
                AppError::Image(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(issues_from(&errors))
    }
}

/// Response extension marking an error the administrator should be told about.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub name: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.public_message(),
            issues: match &self {
                AppError::Validation(issues) => Some(issues.clone()),
                _ => None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if self.is_unexpected() {
            tracing::error!(error = %self, kind = self.name(), "unexpected error");
            response.extensions_mut().insert(ErrorReport {
                name: self.name(),
                message: self.to_string(),
            });
        }
        response
    }
}

/// Flattens nested validator errors into dotted paths with list indices.
pub fn issues_from(errors: &ValidationErrors) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    collect_issues("", errors, &mut issues);
    issues.sort_by(|a, b| a.path.cmp(&b.path));
    issues
}

fn collect_issues(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldIssue>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                    out.push(FieldIssue::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_issues(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_issues(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Emails the administrator about unexpected errors in production.
/// The email is sent from a spawned task so the response is never delayed.
pub async fn report_unexpected_errors(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };
    if !state.config.is_production() {
        return response;
    }
    let Some(admin) = state.config.admin_email.clone() else {
        tracing::warn!("ADMIN_EMAIL not set, unexpected error not reported");
        return response;
    };

    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        let (subject, html) = templates::admin_error_report(
            report.name,
            &report.message,
            &method,
            &path,
            Utc::now(),
        );
        let email = Email {
            to: admin,
            subject,
            html,
        };
        if let Err(e) = mailer.send(email).await {
            tracing::error!(error = %e, "failed to send error report");
        }
    });

    response
}
