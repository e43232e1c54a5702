//! File naming policy for stored uploads.

use crate::constants::{RANDOM_NAME_ALPHABET, RANDOM_NAME_LEN};
use rand::rngs::OsRng;
use rand::Rng;

/// Decides the name under which an uploaded file is stored.
///
/// With `rename` set the result is a fresh [`random_string`] of [`RANDOM_NAME_LEN`]
/// characters followed by the original file's [`extension`]. Without it the original
/// name is returned unchanged, and the caller accepts that an existing file with the
/// same name will be overwritten.
pub fn decide_name(original_name: &str, rename: bool) -> String {
    if !rename {
        return original_name.to_string();
    }

    let mut name = random_string(RANDOM_NAME_LEN);
    name.push_str(extension(original_name));
    name
}

/// Returns the extension of `file_name`: everything from the last `.` onward, or an
/// empty string when there is no `.`.
pub fn extension(file_name: &str) -> &str {
    file_name.rfind('.').map_or("", |i| &file_name[i..])
}

/// Generates a random token of `len` characters.
///
/// Each character is drawn uniformly from [`RANDOM_NAME_ALPHABET`] using the
/// operating system's cryptographically secure generator.
pub fn random_string(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| RANDOM_NAME_ALPHABET[rng.gen_range(0..RANDOM_NAME_ALPHABET.len())] as char)
        .collect()
}
