//! Multipart form reading.
//!
//! Request bodies are parsed with [`multer`] under a whole-stream size limit. Every
//! file field is spooled into a [`SpooledTempFile`] (kept in memory up to
//! [`SPOOL_MEMORY_LIMIT`](crate::SPOOL_MEMORY_LIMIT) bytes, on disk beyond that) so the
//! coordinator gets a seekable stream it can sniff and rewind.
//!
//! The whole form is read before any file reaches the destination directory, which
//! means an oversized body is rejected without writing anything.

use crate::constants::SPOOL_MEMORY_LIMIT;
use crate::coordinator::IncomingFilePart;
use crate::{UploadConfig, UploadError, UploadResult};
use bytes::Bytes;
use futures::Stream;
use multer::{Constraints, Multipart, SizeLimit};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use tempfile::SpooledTempFile;

/// A file part read from a multipart body.
pub type SpooledPart = IncomingFilePart<SpooledTempFile>;

/// Extracts the multipart boundary from a `Content-Type` header value.
///
/// # Errors
///
/// Returns [`UploadError::MalformedMultipart`] if the value is not
/// `multipart/form-data` or carries no boundary.
pub fn boundary_from_content_type(content_type: &str) -> UploadResult<String> {
    multer::parse_boundary(content_type)
        .map_err(|e| UploadError::MalformedMultipart(format!("invalid content type: {e}")))
}

/// Reads every file part of a multipart body.
///
/// Any field that carries a non-empty `filename` is treated as a file, whatever its
/// field name. Other fields are skipped. Declared file names are reduced to their last
/// path component. Parts are returned in the order they appear in the body, each
/// rewound to its start.
///
/// # Errors
///
/// - [`UploadError::PayloadTooLarge`] if the body exceeds `config.max_total_bytes()`
/// - [`UploadError::MalformedMultipart`] if the body cannot be parsed or a file name
///   has no usable final component
/// - [`UploadError::Write`] if a part cannot be spooled
pub async fn read_form<S, O, E>(
    stream: S,
    boundary: impl Into<String>,
    config: &UploadConfig,
) -> UploadResult<Vec<SpooledPart>>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let limit = config.max_total_bytes();
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    let mut parts = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let declared = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let original_name = base_name(&declared).ok_or_else(|| {
            UploadError::MalformedMultipart(format!("unusable file name {declared:?}"))
        })?;

        let spool_err = |source| UploadError::Write {
            path: PathBuf::from(&original_name),
            source,
        };

        let mut spool = SpooledTempFile::new(SPOOL_MEMORY_LIMIT);
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            spool.write_all(&chunk).map_err(spool_err)?;
        }
        spool.seek(SeekFrom::Start(0)).map_err(spool_err)?;

        tracing::debug!(
            field = field.name().unwrap_or_default(),
            file_name = %original_name,
            "read multipart file part"
        );
        parts.push(IncomingFilePart::new(original_name, spool));
    }

    Ok(parts)
}

fn multipart_error(error: multer::Error, limit: u64) -> UploadError {
    match error {
        multer::Error::StreamSizeExceeded { .. } => UploadError::PayloadTooLarge { limit },
        other => UploadError::MalformedMultipart(other.to_string()),
    }
}

/// Returns the final path component of a client supplied file name.
fn base_name(declared: &str) -> Option<String> {
    let name = declared
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(declared)
        .trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}
