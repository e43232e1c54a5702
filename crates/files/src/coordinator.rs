//! Upload coordination
//!
//! [`ingest`] drives every file of one upload through the pipeline:
//!
//! 1. the destination directory is ensured once, up front
//! 2. for each part, in request order:
//!    - the first [`SNIFF_LEN`](crate::SNIFF_LEN) bytes are read and sniffed
//!    - the sniffed media type is checked against the allow-list
//!    - the stream is rewound to its start
//!    - the final name is decided
//!    - the full stream is written and a [`FileRecord`] is produced
//!
//! The first failure stops the run. Files written before the failure are not
//! removed; they are returned in [`IngestFailure::written`] so the caller can decide
//! what to do with them.
//!
//! Parts are processed strictly one after another, and each part is dropped (closing
//! its stream) before the next one is touched.

use crate::naming::decide_name;
use crate::sniff::{read_prefix, sniff};
use crate::storage::{ensure_directory, write_stream};
use crate::{UploadConfig, UploadError, UploadResult};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A single uploaded file waiting to be ingested.
///
/// The stream must be seekable: sniffing consumes leading bytes that have to be
/// replayed when the file is written.
#[derive(Debug)]
pub struct IncomingFilePart<R> {
    original_name: String,
    content: R,
}

impl<R: Read + Seek> IncomingFilePart<R> {
    /// Wraps an open stream together with the file name the client declared.
    pub fn new(original_name: impl Into<String>, content: R) -> Self {
        Self {
            original_name: original_name.into(),
            content,
        }
    }

    /// Returns the file name the client declared.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Returns the underlying stream.
    pub fn content_mut(&mut self) -> &mut R {
        &mut self.content
    }
}

/// Outcome of storing one file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileRecord {
    /// Name of the file inside the destination directory
    pub assigned_name: String,

    /// Name the client declared for the file
    pub original_name: String,

    /// Number of bytes written to disk
    pub byte_size: u64,
}

/// An aborted upload.
///
/// Carries the error that stopped the run and the records of every file written
/// before it. Those files remain on disk.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct IngestFailure {
    pub error: UploadError,
    pub written: Vec<FileRecord>,
}

impl IngestFailure {
    fn new(error: UploadError, written: Vec<FileRecord>) -> Self {
        Self { error, written }
    }
}

impl From<UploadError> for IngestFailure {
    fn from(error: UploadError) -> Self {
        Self::new(error, Vec::new())
    }
}

/// Ingests every part into `directory`, in order.
///
/// # Arguments
///
/// * `parts` - The uploaded files, in the order they appeared in the request
/// * `directory` - Destination directory, created if missing
/// * `config` - Allow-list applied to sniffed media types
/// * `rename` - Store files under random names instead of their declared names
///
/// # Returns
///
/// One [`FileRecord`] per part. An empty `parts` list yields an empty result.
///
/// # Errors
///
/// Returns [`IngestFailure`] on the first part that fails. Its `error` is one of:
/// - [`UploadError::DirectoryCreate`] if the destination cannot be created
/// - [`UploadError::TruncatedStream`] if a part is empty
/// - [`UploadError::UnsupportedMediaType`] if a part's sniffed type is not allowed
/// - [`UploadError::Write`] if reading, rewinding or writing a part fails
pub fn ingest<R, I>(
    parts: I,
    directory: &Path,
    config: &UploadConfig,
    rename: bool,
) -> Result<Vec<FileRecord>, IngestFailure>
where
    R: Read + Seek,
    I: IntoIterator<Item = IncomingFilePart<R>>,
{
    ensure_directory(directory)?;

    let mut written = Vec::new();
    for part in parts {
        match ingest_part(part, directory, config, rename) {
            Ok(record) => written.push(record),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    stored = written.len(),
                    "upload aborted"
                );
                return Err(IngestFailure::new(error, written));
            }
        }
    }

    Ok(written)
}

/// Ingests an upload that must contain exactly one file.
///
/// # Errors
///
/// Returns [`UploadError::UnexpectedPartCount`] without touching the filesystem when
/// `parts` does not hold exactly one file; otherwise the errors of [`ingest`].
pub fn ingest_one<R: Read + Seek>(
    parts: Vec<IncomingFilePart<R>>,
    directory: &Path,
    config: &UploadConfig,
    rename: bool,
) -> Result<FileRecord, IngestFailure> {
    if parts.len() != 1 {
        return Err(UploadError::UnexpectedPartCount { found: parts.len() }.into());
    }

    let mut records = ingest(parts, directory, config, rename)?;
    records
        .pop()
        .ok_or_else(|| UploadError::UnexpectedPartCount { found: 0 }.into())
}

fn ingest_part<R: Read + Seek>(
    part: IncomingFilePart<R>,
    directory: &Path,
    config: &UploadConfig,
    rename: bool,
) -> UploadResult<FileRecord> {
    let IncomingFilePart {
        original_name,
        mut content,
    } = part;
    let read_err = |source| UploadError::Write {
        path: directory.join(&original_name),
        source,
    };

    let prefix = read_prefix(&mut content).map_err(read_err)?;
    let media_type = sniff(&prefix).map_err(|e| match e {
        UploadError::TruncatedStream { .. } => UploadError::TruncatedStream {
            file_name: original_name.clone(),
        },
        other => other,
    })?;

    if !config.allows(&media_type) {
        return Err(UploadError::UnsupportedMediaType {
            file_name: original_name,
            media_type,
        });
    }

    content.seek(SeekFrom::Start(0)).map_err(read_err)?;

    let assigned_name = decide_name(&original_name, rename);
    let byte_size = write_stream(&mut content, directory, &assigned_name)?;

    tracing::info!(
        original_name = %original_name,
        assigned_name = %assigned_name,
        media_type = %media_type,
        byte_size,
        "stored upload"
    );

    Ok(FileRecord {
        assigned_name,
        original_name,
        byte_size,
    })
}
