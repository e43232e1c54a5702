//! # API REST
//!
//! REST API implementation for webmod.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON envelopes, status codes, CORS)
//!
//! Upload semantics live in `webmod-files`; this crate only adapts them to HTTP.

#![warn(rust_2018_idioms)]

pub mod envelope;

mod downloads;
mod slugs;
mod uploads;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use webmod_files::UploadConfig;

use envelope::{write_json, JsonLimits, JsonResponse};

pub use downloads::DownloadQuery;
pub use slugs::{SlugReq, SlugRes};
pub use uploads::{StoredFile, UploadQuery};

/// API configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    upload_dir: PathBuf,
    download_dir: PathBuf,
    uploads: UploadConfig,
    rename_by_default: bool,
    json_limits: JsonLimits,
}

impl ApiConfig {
    /// Create a new `ApiConfig`.
    pub fn new(
        upload_dir: PathBuf,
        download_dir: PathBuf,
        uploads: UploadConfig,
        rename_by_default: bool,
        json_limits: JsonLimits,
    ) -> Self {
        Self {
            upload_dir,
            download_dir,
            uploads,
            rename_by_default,
            json_limits,
        }
    }

    pub fn upload_dir(&self) -> &std::path::Path {
        &self.upload_dir
    }

    pub fn download_dir(&self) -> &std::path::Path {
        &self.download_dir
    }

    pub fn uploads(&self) -> &UploadConfig {
        &self.uploads
    }

    pub fn rename_by_default(&self) -> bool {
        self.rename_by_default
    }

    pub fn json_limits(&self) -> &JsonLimits {
        &self.json_limits
    }
}

/// Application state for the REST API server
///
/// Holds the immutable configuration shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(cfg: ApiConfig) -> Self {
        Self { cfg: Arc::new(cfg) }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        uploads::upload_files,
        uploads::upload_one_file,
        slugs::create_slug,
        downloads::download_file,
    ),
    components(schemas(StoredFile, SlugReq, SlugRes))
)]
struct ApiDoc;

/// Builds the REST router with all routes, Swagger UI and CORS.
///
/// Body size limits are enforced by the handlers themselves (multipart bodies by the
/// upload configuration, JSON bodies by [`JsonLimits`]), so axum's default body limit
/// is disabled.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/uploads", post(uploads::upload_files))
        .route("/uploads/one", post(uploads::upload_one_file))
        .route("/slugs", post(slugs::create_slug))
        .route("/downloads/:file", get(downloads::download_file))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response")
    )
)]
/// Health check endpoint for the REST API
///
/// Returns an envelope with `error: false` while the service is running.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Response {
    write_json(
        StatusCode::OK,
        &JsonResponse::<()>::message("webmod is alive"),
        None,
    )
}
