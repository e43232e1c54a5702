use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use utoipa::IntoParams;

use crate::envelope::error_json;
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// File name offered to the client (defaults to the stored name)
    pub name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/downloads/{file}",
    params(
        ("file" = String, Path, description = "Name of a file in the download directory"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "File contents served as an attachment"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "File not found")
    )
)]
/// Download a static file
///
/// Serves `file` from the download directory with `Content-Disposition: attachment`,
/// so browsers save it instead of displaying it.
#[axum::debug_handler]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
    Query(query): Query<DownloadQuery>,
    request: Request,
) -> Response {
    if !is_plain_file_name(&file) {
        return error_json("invalid file name", None);
    }

    let display_name = query.name.unwrap_or_else(|| file.clone());
    let path = state.cfg.download_dir().join(&file);

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        tracing::debug!(path = %path.display(), "download not found");
        return error_json("file not found", Some(StatusCode::NOT_FOUND));
    }

    if response.status().is_success() {
        match content_disposition(&display_name) {
            Some(value) => {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, value);
            }
            None => return error_json("invalid display name", None),
        }
    }
    response
}

/// Accepts a single path component only.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

fn content_disposition(display_name: &str) -> Option<HeaderValue> {
    let escaped: String = display_name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{escaped}\"")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use crate::test_support::{body_bytes, body_json, state_for};
    use axum::http::Request;
    use std::fs;
    use tempfile::TempDir;
    use webmod_files::UploadConfig;

    const RED_JPG_LEN: usize = 1_107_051;

    fn red_jpg() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
        data.resize(RED_JPG_LEN, 0x7F);
        data
    }

    #[tokio::test]
    async fn test_download_static_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("red.jpg"), red_jpg()).unwrap();
        let app = router(state_for(temp.path(), temp.path(), UploadConfig::default()));

        let response = app
            .oneshot(
                Request::get("/downloads/red.jpg?name=wall.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"wall.jpg\""
        );
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            RED_JPG_LEN.to_string().as_str()
        );
        assert_eq!(body_bytes(response).await.len(), RED_JPG_LEN);
    }

    #[tokio::test]
    async fn test_download_defaults_display_name() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "hello").unwrap();
        let app = router(state_for(temp.path(), temp.path(), UploadConfig::default()));

        let response = app
            .oneshot(
                Request::get("/downloads/notes.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"notes.txt\""
        );
    }

    #[tokio::test]
    async fn test_download_missing_file() {
        let temp = TempDir::new().unwrap();
        let app = router(state_for(temp.path(), temp.path(), UploadConfig::default()));

        let response = app
            .oneshot(
                Request::get("/downloads/missing.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], true);
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let app = router(state_for(temp.path(), temp.path(), UploadConfig::default()));

        let response = app
            .oneshot(
                Request::get("/downloads/..%2Fsecret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        let value = content_disposition("a\"b.jpg").unwrap();
        assert_eq!(value, "attachment; filename=\"a_b.jpg\"");
    }
}
