//! The simulation engine's view of an incoming request

use std::collections::HashMap;

/// Request attributes the simulation components evaluate.
///
/// Deliberately framework-free: the server layer builds one of these
/// per request, and fault predicates, latency patterns, and admission
/// checks all read from it.
#[derive(Debug, Clone, Default)]
pub struct RequestProfile {
    /// Uppercased HTTP method
    pub method: String,

    /// Request path, without query string
    pub path: String,

    /// Header values, keyed by lowercased header name
    pub headers: HashMap<String, String>,

    /// Declared body length in bytes
    pub content_length: u64,
}

impl RequestProfile {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            headers: HashMap::new(),
            content_length: 0,
        }
    }

    /// Attach a header (name is lowercased).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = length;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Numeric value of the last path segment, with any `.json` suffix
    /// stripped. Used by divisibility predicates as a cheap
    /// pseudo-random trigger.
    pub fn trailing_id(&self) -> Option<i64> {
        let segment = self.path.rsplit('/').next()?;
        let segment = segment.strip_suffix(".json").unwrap_or(segment);
        segment.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_is_uppercased() {
        let profile = RequestProfile::new("post", "/articles.json");
        assert_eq!(profile.method, "POST");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let profile =
            RequestProfile::new("GET", "/x").with_header("Authorization", "Bearer abc");
        assert_eq!(profile.header("authorization"), Some("Bearer abc"));
        assert_eq!(profile.header("AUTHORIZATION"), Some("Bearer abc"));
        assert_eq!(profile.header("x-missing"), None);
    }

    #[test]
    fn test_trailing_id_strips_json_suffix() {
        assert_eq!(
            RequestProfile::new("GET", "/en-us/articles/456.json").trailing_id(),
            Some(456)
        );
        assert_eq!(
            RequestProfile::new("PUT", "/articles/789").trailing_id(),
            Some(789)
        );
        assert_eq!(
            RequestProfile::new("GET", "/articles/456/translations/de").trailing_id(),
            None
        );
    }
}
