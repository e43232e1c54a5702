//! JSON envelope helpers.
//!
//! Every response body produced by this crate has the shape
//! `{"error": bool, "message": string, "data"?: any}`. Request bodies are read with
//! [`read_json`], which bounds their size and turns decode failures into messages that
//! can be shown to API clients.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Display;

/// Default upper bound for JSON request bodies (1 MiB).
pub const DEFAULT_MAX_JSON_BYTES: usize = 1024 * 1024;

/// Wire envelope for every JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> JsonResponse<T> {
    /// Successful envelope carrying `data`.
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Successful envelope without data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }

    /// Error envelope, optionally carrying data describing partial results.
    pub fn failure(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data,
        }
    }
}

/// Limits applied by [`read_json`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonLimits {
    pub max_bytes: usize,
}

impl Default for JsonLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_JSON_BYTES,
        }
    }
}

impl JsonLimits {
    /// Creates limits; `None` or zero selects [`DEFAULT_MAX_JSON_BYTES`].
    pub fn new(max_bytes: Option<usize>) -> Self {
        Self {
            max_bytes: max_bytes
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_JSON_BYTES),
        }
    }
}

/// Reasons a JSON request body was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JsonError {
    #[error("JSON too big, must be limited to {limit} bytes")]
    TooLarge { limit: usize },

    #[error("empty body")]
    Empty,

    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("JSON ended unexpectedly, badly-formed JSON")]
    UnexpectedEof,

    #[error("invalid JSON type for the field: {field}")]
    InvalidType { field: String },

    #[error("JSON contains unknown key: {0}")]
    UnknownField(String),

    #[error("body must contain only one JSON value")]
    MultipleValues,

    #[error("error decoding JSON: {0}")]
    Other(String),
}

/// Decodes a JSON request body into `T`.
///
/// The body must hold exactly one JSON value. Unknown fields are rejected only when
/// `T` opts in with `#[serde(deny_unknown_fields)]`.
///
/// # Errors
///
/// Returns a [`JsonError`] describing why the body was rejected.
pub fn read_json<T: DeserializeOwned>(body: &[u8], limits: &JsonLimits) -> Result<T, JsonError> {
    if body.len() > limits.max_bytes {
        return Err(JsonError::TooLarge {
            limit: limits.max_bytes,
        });
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(JsonError::Empty);
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    let value = serde_path_to_error::deserialize(&mut de).map_err(classify)?;
    de.end().map_err(|_| JsonError::MultipleValues)?;

    Ok(value)
}

fn classify(err: serde_path_to_error::Error<serde_json::Error>) -> JsonError {
    use serde_json::error::Category;

    let field = err.path().to_string();
    let inner = err.into_inner();
    match inner.classify() {
        Category::Syntax => JsonError::Syntax {
            line: inner.line(),
            column: inner.column(),
        },
        Category::Eof => JsonError::UnexpectedEof,
        Category::Io => JsonError::Other(inner.to_string()),
        Category::Data => {
            let message = inner.to_string();
            if let Some(rest) = message.strip_prefix("unknown field `") {
                let name = rest.split('`').next().unwrap_or_default();
                JsonError::UnknownField(name.to_string())
            } else if message.starts_with("invalid type") {
                JsonError::InvalidType { field }
            } else {
                JsonError::Other(message)
            }
        }
    }
}

/// Serialises `value` into a JSON response.
///
/// `headers` are copied onto the response first (every value of a multi-valued header
/// is kept), then `Content-Type: application/json` is set.
pub fn write_json<T: Serialize>(
    status: StatusCode,
    value: &T,
    headers: Option<HeaderMap>,
) -> Response {
    let body = match serde_json::to_vec(value) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("JSON encode error: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let response_headers = response.headers_mut();
    if let Some(headers) = headers {
        for (name, value) in headers.iter() {
            response_headers.append(name.clone(), value.clone());
        }
    }
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    response
}

/// Writes an error envelope for `err`.
///
/// `status` defaults to `400 Bad Request`.
pub fn error_json(err: impl Display, status: Option<StatusCode>) -> Response {
    write_json(
        status.unwrap_or(StatusCode::BAD_REQUEST),
        &JsonResponse::<()>::failure(err.to_string(), None),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::body_json;
    use axum::http::HeaderName;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    #[allow(dead_code)]
    struct Strict {
        foo: String,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Lenient {
        #[serde(default)]
        foo: String,
    }

    fn limits(max_bytes: usize) -> JsonLimits {
        JsonLimits::new(Some(max_bytes))
    }

    #[test]
    fn test_read_json_good() {
        let parsed: Strict = read_json(br#"{"foo": "bar"}"#, &limits(1024)).unwrap();
        assert_eq!(parsed.foo, "bar");
    }

    #[test]
    fn test_read_json_rejections() {
        let cases: Vec<(&str, &[u8])> = vec![
            ("not JSON", &b"foo=bar"[..]),
            ("missing value", &br#"{"foo": }"#[..]),
            ("missing field name quotes", &br#"{bar: 404}"#[..]),
            ("syntax error", &br#"{"foo": bar"}"#[..]),
        ];

        for (name, body) in cases {
            let result = read_json::<Strict>(body, &limits(1024));
            assert!(
                matches!(result, Err(JsonError::Syntax { .. })),
                "{name}: {result:?}"
            );
        }
    }

    #[test]
    fn test_read_json_incorrect_type() {
        let result = read_json::<Strict>(br#"{"foo": 404}"#, &limits(1024));
        assert_eq!(
            result.unwrap_err(),
            JsonError::InvalidType {
                field: "foo".into()
            }
        );
    }

    #[test]
    fn test_read_json_more_than_one_value() {
        let result = read_json::<Strict>(br#"{"foo": "1"}{"bar", "2"}"#, &limits(1024));
        assert_eq!(result.unwrap_err(), JsonError::MultipleValues);
    }

    #[test]
    fn test_read_json_unknown_field() {
        let result = read_json::<Strict>(br#"{"bar": "soda"}"#, &limits(1024));
        assert_eq!(result.unwrap_err(), JsonError::UnknownField("bar".into()));
    }

    #[test]
    fn test_read_json_allows_unknown_field_when_type_does() {
        let result = read_json::<Lenient>(br#"{"bar": 404}"#, &limits(1024));
        assert!(result.is_ok());
    }

    #[test]
    fn test_read_json_too_large() {
        let result = read_json::<Strict>(br#"{"foo": "bar"}"#, &limits(12));
        assert_eq!(result.unwrap_err(), JsonError::TooLarge { limit: 12 });
    }

    #[test]
    fn test_read_json_empty() {
        assert_eq!(
            read_json::<Strict>(b"  \n", &limits(1024)).unwrap_err(),
            JsonError::Empty
        );
    }

    #[test]
    fn test_read_json_truncated() {
        assert_eq!(
            read_json::<Strict>(br#"{"foo": "ba"#, &limits(1024)).unwrap_err(),
            JsonError::UnexpectedEof
        );
    }

    #[tokio::test]
    async fn test_write_json() {
        let mut headers = HeaderMap::new();
        let foo = HeaderName::from_static("foo");
        headers.append(foo.clone(), HeaderValue::from_static("1"));
        headers.append(foo.clone(), HeaderValue::from_static("2"));
        headers.append("bar", HeaderValue::from_static("3"));

        let response = write_json(
            StatusCode::OK,
            &JsonResponse::<()>::message("high hopes"),
            Some(headers),
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let foo_values: Vec<_> = response.headers().get_all("foo").iter().collect();
        assert_eq!(foo_values, vec!["1", "2"]);
        assert_eq!(response.headers()["bar"], "3");

        let json = body_json(response).await;
        assert_eq!(json["error"], false);
        assert_eq!(json["message"], "high hopes");
    }

    #[tokio::test]
    async fn test_error_json() {
        let response = error_json(
            "What you seek is not here!",
            Some(StatusCode::SERVICE_UNAVAILABLE),
        );

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"], true);
        assert_eq!(json["message"], "What you seek is not here!");
    }

    #[tokio::test]
    async fn test_error_json_default_status() {
        let response = error_json(JsonError::Empty, None);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
