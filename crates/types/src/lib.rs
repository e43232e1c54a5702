use regex::Regex;
use std::sync::OnceLock;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty
    #[error("empty string not permitted")]
    Empty,

    /// The input contained no ASCII letters or digits, so the slug would be empty
    #[error("string contains no letters or digits, slug length is zero")]
    NoAlphanumerics,
}

/// A URL-safe slug.
///
/// A slug contains only lowercase ASCII letters, digits and single hyphens, and never
/// starts or ends with a hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    /// Creates a slug from free text.
    ///
    /// The input is lowercased and every run of characters outside `a-z0-9` is replaced
    /// with a single `-`. Leading and trailing hyphens are removed.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for an empty input and `TextError::NoAlphanumerics`
    /// when nothing remains after replacement.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if input.is_empty() {
            return Err(TextError::Empty);
        }

        let lowered = input.to_lowercase();
        let replaced = separator_pattern().replace_all(&lowered, "-");
        let slug = replaced.trim_matches('-');
        if slug.is_empty() {
            return Err(TextError::NoAlphanumerics);
        }

        Ok(Self(slug.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"))
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Slug {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for Slug {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Slug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Slug::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_string() {
        assert_eq!(Slug::new("now is the time!").unwrap().as_str(), "now-is-the-time");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(Slug::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_complex_string() {
        assert_eq!(
            Slug::new("yo! ^now^ is the f**king time. 123... Go!")
                .unwrap()
                .as_str(),
            "yo-now-is-the-f-king-time-123-go"
        );
    }

    #[test]
    fn test_japanese_string() {
        assert_eq!(Slug::new("今がその時だ"), Err(TextError::NoAlphanumerics));
    }

    #[test]
    fn test_japanese_and_roman_characters() {
        assert_eq!(
            Slug::new("今がその時だ! GO GET THEM-->").unwrap().as_str(),
            "go-get-them"
        );
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(Slug::new("   "), Err(TextError::NoAlphanumerics));
    }

    #[test]
    fn test_display_and_from_str() {
        let slug: Slug = "Hello World".parse().unwrap();
        assert_eq!(slug.to_string(), "hello-world");
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let slug = Slug::new("Rust & Go").unwrap();
        assert_eq!(serde_json::to_string(&slug).unwrap(), "\"rust-go\"");

        let parsed: Result<Slug, _> = serde_json::from_str("\"!!!\"");
        assert!(parsed.is_err());
    }
}
