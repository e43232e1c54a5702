//! Destination directory handling and file writes.

use crate::{UploadError, UploadResult};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o755;

/// Ensures `path` exists as a directory, creating any missing parents.
///
/// New directories are created with mode `0o755` on Unix. An existing directory is
/// left untouched.
///
/// # Errors
///
/// Returns [`UploadError::DirectoryCreate`] if a directory cannot be created or if
/// `path` already exists but is not a directory.
pub fn ensure_directory(path: &Path) -> UploadResult<()> {
    if path.is_dir() {
        return Ok(());
    }

    if path.exists() {
        return Err(UploadError::DirectoryCreate {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "path is not a directory"),
        });
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIRECTORY_MODE);
    }

    builder
        .create(path)
        .map_err(|source| UploadError::DirectoryCreate {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %path.display(), "created upload directory");
    Ok(())
}

/// Streams `reader` into `directory/file_name` and returns the number of bytes written.
///
/// The directory is created if needed. An existing file with the same name is
/// truncated. The file is synced to disk before returning, so the returned size
/// matches what other processes observe.
///
/// A failure part way through leaves the partially written file in place.
///
/// # Errors
///
/// - [`UploadError::DirectoryCreate`] if the directory cannot be created
/// - [`UploadError::Write`] if the file cannot be created, written or synced, or if
///   reading from `reader` fails
pub fn write_stream<R: Read>(
    mut reader: R,
    directory: &Path,
    file_name: &str,
) -> UploadResult<u64> {
    ensure_directory(directory)?;

    let path = directory.join(file_name);
    let write_err = |source| UploadError::Write {
        path: path.clone(),
        source,
    };

    let mut file = fs::File::create(&path).map_err(write_err)?;
    let written = io::copy(&mut reader, &mut file).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directory_creates_nested() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b").join("c");

        ensure_directory(&dir).unwrap();

        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_directory_existing_is_noop() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("testdir");

        ensure_directory(&dir).unwrap();
        ensure_directory(&dir).unwrap();

        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("perms");
        ensure_directory(&dir).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        // umask can only remove bits
        assert_eq!(mode & !DIRECTORY_MODE, 0);
        assert_ne!(mode & 0o700, 0);
    }

    #[test]
    fn test_ensure_directory_on_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "not a directory").unwrap();

        assert!(matches!(
            ensure_directory(&file),
            Err(UploadError::DirectoryCreate { .. })
        ));
    }

    #[test]
    fn test_write_stream_returns_size() {
        let temp = TempDir::new().unwrap();
        let data: Vec<u8> = (0..=255).cycle().take(10_000).collect();

        let written = write_stream(Cursor::new(data.clone()), temp.path(), "blob.bin").unwrap();

        assert_eq!(written, 10_000);
        let stored = fs::read(temp.path().join("blob.bin")).unwrap();
        assert_eq!(stored, data);
    }

    #[test]
    fn test_write_stream_truncates_existing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("note.txt"), "a much longer original body").unwrap();

        let written = write_stream(Cursor::new(b"short".to_vec()), temp.path(), "note.txt").unwrap();

        assert_eq!(written, 5);
        assert_eq!(fs::read(temp.path().join("note.txt")).unwrap(), b"short");
    }

    #[test]
    fn test_write_stream_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("uploads").join("nested");

        write_stream(Cursor::new(b"x".to_vec()), &dir, "x.txt").unwrap();

        assert!(dir.join("x.txt").is_file());
    }

    #[test]
    fn test_write_stream_into_missing_subdirectory_fails() {
        let temp = TempDir::new().unwrap();

        let result = write_stream(Cursor::new(b"x".to_vec()), temp.path(), "missing/x.txt");

        assert!(matches!(result, Err(UploadError::Write { .. })));
    }
}
