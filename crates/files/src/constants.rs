//! Constants shared by the upload pipeline.

/// Maximum number of leading bytes inspected when sniffing a file's media type.
pub const SNIFF_LEN: usize = 512;

/// Total multipart body size used when no limit is configured (1 GiB).
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 1024 * 1024 * 1024;

/// Length of generated file names, excluding the extension.
pub const RANDOM_NAME_LEN: usize = 25;

/// Characters used for generated file names and random tokens.
pub const RANDOM_NAME_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_+";

/// Bytes of a single file part held in memory before spooling to a temporary file.
pub const SPOOL_MEMORY_LIMIT: usize = 10 * 1024 * 1024;

/// Media type reported for text that no magic-byte matcher recognises.
pub(crate) const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Media type reported when nothing else matches.
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";
