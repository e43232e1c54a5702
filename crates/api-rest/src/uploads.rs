//! Upload endpoints.
//!
//! Both endpoints read the whole multipart body first (bounded by the configured total
//! size), then hand the spooled parts to the blocking upload coordinator.

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use webmod_files::{
    boundary_from_content_type, ingest, ingest_one, read_form, FileRecord, IngestFailure,
    SpooledPart, UploadError,
};

use crate::envelope::{error_json, write_json, JsonResponse};
use crate::AppState;

/// A stored upload as reported to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredFile {
    /// Name of the file in the upload directory
    pub assigned_name: String,
    /// File name declared by the client
    pub original_name: String,
    /// Size of the stored file in bytes
    pub byte_size: u64,
}

impl From<FileRecord> for StoredFile {
    fn from(record: FileRecord) -> Self {
        Self {
            assigned_name: record.assigned_name,
            original_name: record.original_name,
            byte_size: record.byte_size,
        }
    }
}

/// Query parameters accepted by the upload endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Store files under random names (defaults to the server setting)
    pub rename: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/uploads",
    params(UploadQuery),
    request_body(content_type = "multipart/form-data", description = "One or more files"),
    responses(
        (status = 201, description = "Files stored; `data` lists a StoredFile per file"),
        (status = 400, description = "Malformed multipart body or empty file"),
        (status = 413, description = "Payload too large"),
        (status = 415, description = "Unsupported media type; `data` lists files stored before the failure"),
        (status = 500, description = "Internal server error")
    )
)]
/// Upload one or more files
///
/// Every file part of the multipart body is sniffed, checked against the allow-list
/// and stored in the upload directory, in request order.
///
/// # Returns
/// * `201` with an envelope whose `data` is the list of stored files
///
/// # Errors
/// The first failing file aborts the request. Files stored before it stay on disk and
/// are listed in the error envelope's `data`.
#[axum::debug_handler]
pub async fn upload_files(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    request: Request,
) -> Response {
    let rename = query.rename.unwrap_or(state.cfg.rename_by_default());
    let parts = match receive_parts(&state, request).await {
        Ok(parts) => parts,
        Err(e) => return upload_error_response(e.into()),
    };

    let cfg = state.cfg.clone();
    let result = tokio::task::spawn_blocking(move || {
        ingest(parts, cfg.upload_dir(), cfg.uploads(), rename)
    })
    .await;

    match result {
        Ok(Ok(records)) => {
            let stored: Vec<StoredFile> = records.into_iter().map(StoredFile::from).collect();
            let message = format!("{} file(s) uploaded", stored.len());
            write_json(
                StatusCode::CREATED,
                &JsonResponse::success(message, stored),
                None,
            )
        }
        Ok(Err(failure)) => upload_error_response(failure),
        Err(e) => {
            tracing::error!("Upload task error: {:?}", e);
            error_json("Internal error", Some(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

#[utoipa::path(
    post,
    path = "/uploads/one",
    params(UploadQuery),
    request_body(content_type = "multipart/form-data", description = "Exactly one file"),
    responses(
        (status = 201, description = "File stored; `data` is a StoredFile"),
        (status = 400, description = "Malformed body, empty file, or not exactly one file"),
        (status = 413, description = "Payload too large"),
        (status = 415, description = "Unsupported media type"),
        (status = 500, description = "Internal server error")
    )
)]
/// Upload exactly one file
///
/// # Returns
/// * `201` with an envelope whose `data` is the stored file
///
/// # Errors
/// Returns `400 Bad Request` when the body holds zero or several files; otherwise the
/// same errors as the multi-file endpoint.
#[axum::debug_handler]
pub async fn upload_one_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    request: Request,
) -> Response {
    let rename = query.rename.unwrap_or(state.cfg.rename_by_default());
    let parts = match receive_parts(&state, request).await {
        Ok(parts) => parts,
        Err(e) => return upload_error_response(e.into()),
    };

    let cfg = state.cfg.clone();
    let result = tokio::task::spawn_blocking(move || {
        ingest_one(parts, cfg.upload_dir(), cfg.uploads(), rename)
    })
    .await;

    match result {
        Ok(Ok(record)) => write_json(
            StatusCode::CREATED,
            &JsonResponse::success("file uploaded", StoredFile::from(record)),
            None,
        ),
        Ok(Err(failure)) => upload_error_response(failure),
        Err(e) => {
            tracing::error!("Upload task error: {:?}", e);
            error_json("Internal error", Some(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

/// Reads the multipart body of `request` into spooled parts.
///
/// A declared `Content-Length` above the limit is rejected before any of the body is
/// read.
async fn receive_parts(state: &AppState, request: Request) -> Result<Vec<SpooledPart>, UploadError> {
    let config = state.cfg.uploads();
    let limit = config.max_total_bytes();

    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared_length.is_some_and(|len| len > limit) {
        return Err(UploadError::PayloadTooLarge { limit });
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| UploadError::MalformedMultipart("missing content type".into()))?;
    let boundary = boundary_from_content_type(content_type)?;

    read_form(request.into_body().into_data_stream(), boundary, config).await
}

fn upload_status(error: &UploadError) -> StatusCode {
    match error {
        UploadError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::MalformedMultipart(_)
        | UploadError::TruncatedStream { .. }
        | UploadError::UnexpectedPartCount { .. } => StatusCode::BAD_REQUEST,
        UploadError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::DirectoryCreate { .. }
        | UploadError::Write { .. }
        | UploadError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn upload_error_response(failure: IngestFailure) -> Response {
    let IngestFailure { error, written } = failure;
    let status = upload_status(&error);

    let message = if status.is_server_error() {
        tracing::error!("Upload error: {:?}", error);
        "failed to store upload".to_string()
    } else {
        tracing::info!(error = %error, "upload rejected");
        error.to_string()
    };

    let written: Vec<StoredFile> = written.into_iter().map(StoredFile::from).collect();
    let data = (!written.is_empty()).then_some(written);
    write_json(status, &JsonResponse::failure(message, data), None)
}
