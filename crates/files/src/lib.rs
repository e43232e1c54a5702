//! webmod File Uploads
//!
//! This crate ingests files uploaded inside `multipart/form-data` request bodies and
//! stores them in a local destination directory.
//!
//! ## Design Principles
//!
//! - The declared content type and file extension are never trusted; each file's media
//!   type is sniffed from its leading bytes
//! - Every file is validated before it is written
//! - A failing file aborts the whole call; files already written stay on disk and are
//!   reported back alongside the error
//! - Configuration is an explicit immutable value passed into every call
//! - No state survives a call except the files written to disk
//!
//! ## Pipeline
//!
//! ```text
//! request body ──► read_form ──► [IncomingFilePart] ──► ingest
//!                  (bounded,                            ├── sniff (first 512 bytes)
//!                   spooled)                            ├── allow-list check
//!                                                       ├── rewind
//!                                                       ├── decide_name
//!                                                       └── write_stream ──► FileRecord
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::fs::File;
//! use std::path::Path;
//! use webmod_files::{ingest, IncomingFilePart, UploadConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploadConfig::default().with_allowed_content_types(["image/png"]);
//! let parts = vec![IncomingFilePart::new("logo.png", File::open("logo.png")?)];
//!
//! let records = ingest(parts, Path::new("uploads"), &config, true)?;
//! println!("stored as {}", records[0].assigned_name);
//! # Ok(())
//! # }
//! ```

mod config;
mod constants;
mod coordinator;
mod multipart;
mod naming;
mod sniff;
mod storage;

pub use config::{
    allowed_types_from_env_value, max_bytes_from_env_value, rename_from_env_value, UploadConfig,
};
pub use constants::{
    DEFAULT_MAX_TOTAL_BYTES, RANDOM_NAME_ALPHABET, RANDOM_NAME_LEN, SNIFF_LEN, SPOOL_MEMORY_LIMIT,
};
pub use coordinator::{ingest, ingest_one, FileRecord, IncomingFilePart, IngestFailure};
pub use multipart::{boundary_from_content_type, read_form, SpooledPart};
pub use naming::{decide_name, extension, random_string};
pub use sniff::{read_prefix, sniff};
pub use storage::{ensure_directory, write_stream};

use std::path::PathBuf;

/// Errors that can occur while ingesting uploaded files
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The request body exceeded the configured total size
    #[error("upload exceeds the maximum allowed size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// The request body could not be parsed as multipart form data
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(String),

    /// A file part had no bytes to sniff
    #[error("file {file_name} is empty")]
    TruncatedStream { file_name: String },

    /// The sniffed media type is not on the allow-list
    #[error("file {file_name} has unsupported media type {media_type}")]
    UnsupportedMediaType {
        file_name: String,
        media_type: String,
    },

    /// The destination directory could not be created
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be read or written
    #[error("failed to write file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single-file upload received zero or several files
    #[error("expected exactly one file, found {found}")]
    UnexpectedPartCount { found: usize },

    /// A configuration value could not be parsed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;
