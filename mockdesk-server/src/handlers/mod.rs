//! Resource handlers

mod articles;
mod health;
mod translations;

pub use articles::{create_article, show_article, update_article};
pub use health::health_check;
pub use translations::{create_translation, show_translation, update_translation};

use crate::errors::ApiError;

/// Parse a numeric path segment, tolerating a `.json` suffix.
///
/// Malformed segments are a client input error, surfaced as 400.
pub(crate) fn parse_id(segment: &str, what: &str) -> Result<i64, ApiError> {
    let trimmed = segment.strip_suffix(".json").unwrap_or(segment);
    trimmed
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid {}: '{}'", what, segment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_plain_and_suffixed_segments() {
        assert_eq!(parse_id("456", "article ID").unwrap(), 456);
        assert_eq!(parse_id("456.json", "article ID").unwrap(), 456);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("abc", "article ID").is_err());
        assert!(parse_id("12abc.json", "article ID").is_err());
        assert!(parse_id("", "article ID").is_err());
    }
}
