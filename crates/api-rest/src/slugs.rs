use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::StatusCode,
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use webmod_types::Slug;

use crate::envelope::{error_json, read_json, write_json, JsonError, JsonResponse};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SlugReq {
    /// Free text to turn into a slug
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlugRes {
    pub slug: String,
}

#[utoipa::path(
    post,
    path = "/slugs",
    request_body = SlugReq,
    responses(
        (status = 200, description = "Slug created; `data` is a SlugRes"),
        (status = 400, description = "Invalid JSON body or text without letters or digits")
    )
)]
/// Create a URL-safe slug
///
/// Lowercases the text and replaces every run of characters other than ASCII letters
/// and digits with a single hyphen.
#[axum::debug_handler]
pub async fn create_slug(State(state): State<AppState>, body: Body) -> Response {
    let limits = state.cfg.json_limits();

    // one extra byte so an oversized body still reaches read_json's size check
    let bytes = match to_bytes(body, limits.max_bytes.saturating_add(1)).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return error_json(
                JsonError::TooLarge {
                    limit: limits.max_bytes,
                },
                None,
            )
        }
    };

    let req: SlugReq = match read_json(&bytes, limits) {
        Ok(req) => req,
        Err(e) => return error_json(e, None),
    };

    match Slug::new(&req.text) {
        Ok(slug) => write_json(
            StatusCode::OK,
            &JsonResponse::success(
                "slug created",
                SlugRes {
                    slug: slug.to_string(),
                },
            ),
            None,
        ),
        Err(e) => error_json(e, None),
    }
}
