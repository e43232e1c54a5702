//! Content-type sniffing.
//!
//! Media types are derived from the leading bytes of a file only. Client supplied
//! `Content-Type` headers and file extensions play no part.

use crate::constants::{OCTET_STREAM, PLAIN_TEXT, SNIFF_LEN};
use crate::{UploadError, UploadResult};
use std::io::{self, Read};

/// Determines the media type of a file from its leading bytes.
///
/// Magic-byte matchers from [`infer`] are tried first. A prefix that no matcher
/// recognises is reported as `text/plain; charset=utf-8` when it contains no binary
/// control bytes, and as `application/octet-stream` otherwise.
///
/// Only the first [`SNIFF_LEN`] bytes of `prefix` are considered.
///
/// # Errors
///
/// Returns [`UploadError::TruncatedStream`] if `prefix` is empty. The file name in the
/// error is left blank; callers that know it should fill it in.
pub fn sniff(prefix: &[u8]) -> UploadResult<String> {
    if prefix.is_empty() {
        return Err(UploadError::TruncatedStream {
            file_name: String::new(),
        });
    }

    let prefix = &prefix[..prefix.len().min(SNIFF_LEN)];

    if let Some(kind) = infer::get(prefix) {
        return Ok(kind.mime_type().to_string());
    }

    if prefix.iter().any(|b| is_binary_byte(*b)) {
        Ok(OCTET_STREAM.to_string())
    } else {
        Ok(PLAIN_TEXT.to_string())
    }
}

/// Reads up to [`SNIFF_LEN`] bytes from `reader`.
///
/// Short reads are retried until either the buffer is full or the reader reports
/// end of file, so the returned prefix is only shorter than `SNIFF_LEN` when the
/// stream itself is.
pub fn read_prefix<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    reader.take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_sniff_png() {
        assert_eq!(sniff(&PNG_HEADER).unwrap(), "image/png");
    }

    #[test]
    fn test_sniff_jpeg() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        assert_eq!(sniff(&jpeg).unwrap(), "image/jpeg");
    }

    #[test]
    fn test_sniff_pdf() {
        assert_eq!(sniff(b"%PDF-1.7\n").unwrap(), "application/pdf");
    }

    #[test]
    fn test_sniff_plain_text() {
        assert_eq!(sniff(b"Hello, World!\n").unwrap(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_sniff_binary_falls_back_to_octet_stream() {
        assert_eq!(
            sniff(&[0x00, 0x01, 0x02, 0x03]).unwrap(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_sniff_ignores_bytes_past_limit() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0x00);
        assert_eq!(sniff(&data).unwrap(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_sniff_empty_is_truncated() {
        assert!(matches!(
            sniff(&[]),
            Err(UploadError::TruncatedStream { .. })
        ));
    }

    #[test]
    fn test_read_prefix_caps_at_sniff_len() {
        let mut reader = Cursor::new(vec![7u8; 2000]);
        let prefix = read_prefix(&mut reader).unwrap();

        assert_eq!(prefix.len(), SNIFF_LEN);
        assert_eq!(reader.position(), SNIFF_LEN as u64);
    }

    #[test]
    fn test_read_prefix_short_stream() {
        let mut reader = Cursor::new(b"tiny".to_vec());
        assert_eq!(read_prefix(&mut reader).unwrap(), b"tiny");
    }

    #[test]
    fn test_read_prefix_empty_stream() {
        let mut reader = Cursor::new(Vec::new());
        assert!(read_prefix(&mut reader).unwrap().is_empty());
    }
}
