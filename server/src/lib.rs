pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod images;
pub mod labels;
pub mod llm;
pub mod mail;
pub mod models;
pub mod raw_sql;
pub mod schema;
pub mod search;
pub mod telemetry;

use axum::extract::{DefaultBodyLimit, FromRef, MatchedPath};
use axum::http::{header, HeaderName, HeaderValue, Method, Request};
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::db::DbPool;
use crate::images::ImageStore;
use crate::llm::LlmProvider;
use crate::mail::Mailer;

/// Largest accepted request body (8 MiB). Covers are capped separately at 5 MB.
pub const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    /// `None` when no provider is configured; extraction then answers 503.
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: Config,
        mailer: Arc<dyn Mailer>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let images = ImageStore::new(config.image_uploads_path.clone());
        Self {
            pool: Arc::new(pool),
            config: Arc::new(config),
            mailer,
            llm,
            images,
        }
    }
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-is-mobile"),
        ])
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_router = api::public::router();

    // Protected routes (auth required)
    let protected_router = Router::new()
        .merge(api::account::router())
        .merge(api::labels::router())
        .merge(api::dashboard::router())
        .nest("/api/recipes", api::recipes::router())
        .nest("/api/comments", api::comments::router())
        .layer(middleware::from_fn_with_state(
            state.pool.clone(),
            auth::require_auth,
        ));

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let covers_path = format!("/{}/recipe-images", state.config.uploads_dir_name);
    let covers = ServeDir::new(state.images.dir());

    Router::new()
        .merge(public_router)
        .merge(protected_router)
        .merge(swagger_ui)
        .nest_service(&covers_path, covers)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::report_unexpected_errors,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors_layer(&state.config))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    // Health checks poll constantly, keep them out of the logs
                    if matched_path == "/api/health" {
                        tracing::trace_span!("http_request")
                    } else {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            path = %matched_path,
                        )
                    }
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        if span.metadata().map(|m| m.level()) == Some(&tracing::Level::TRACE) {
                            return;
                        }
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
}
