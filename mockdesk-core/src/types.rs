//! Resource models served by the simulated backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A knowledge-base article in its source locale.
///
/// Articles are never physically deleted; updates mutate them in place.
/// The `section_id` and `author_id` references are checked by
/// [`crate::ResourceStore::validate_relationships`], not enforced
/// transactionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Store-assigned identifier
    pub id: i64,

    /// Source locale of the article body (e.g. "en-us")
    pub locale: String,

    /// Article title
    pub title: String,

    /// Owning section
    pub section_id: i64,

    /// Authoring user
    pub author_id: i64,

    /// Permission group controlling edit access
    pub permission_group_id: i64,

    /// Whether the article is unpublished
    pub draft: bool,

    /// Whether the article is pinned in listings
    pub promoted: bool,

    /// Whether reader comments are disabled
    pub comments_disabled: bool,

    /// Manual ordering position within the section
    pub position: i64,

    /// Content tag identifiers attached to the article
    pub content_tag_ids: Vec<String>,
}

/// A localized translation of an [`Article`].
///
/// Uniquely addressed by `(source_id, locale)`; the store keys
/// translations by the composite of these two fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Store-assigned identifier
    pub id: i64,

    /// Identifier of the owning article
    pub source_id: i64,

    /// Target locale of this translation
    pub locale: String,

    /// Translated title
    pub title: String,

    /// Translated body as an HTML string
    pub body: String,

    /// Whether the translation is unpublished
    pub draft: bool,
}

impl Translation {
    /// Composite store key for a `(source_id, locale)` pair.
    pub fn key_for(source_id: i64, locale: &str) -> String {
        format!("{}:{}", source_id, locale)
    }
}

/// Static section reference data.
///
/// Read-only from the simulation's perspective except at initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub locale: String,
    pub position: i64,
}

/// Static user reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// An immutable point-in-time deep copy of all store collections.
///
/// Produced by [`crate::ResourceStore::backup`] and consumed by
/// [`crate::ResourceStore::restore`] to checkpoint state between test
/// scenarios.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub(crate) articles: HashMap<i64, Article>,
    pub(crate) translations: HashMap<String, Translation>,
    pub(crate) sections: HashMap<i64, Section>,
    pub(crate) users: HashMap<i64, User>,

    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Number of articles captured in this snapshot.
    pub fn article_count(&self) -> usize {
        self.articles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_key_format() {
        assert_eq!(Translation::key_for(456, "de"), "456:de");
        assert_eq!(Translation::key_for(1, "en-us"), "1:en-us");
    }

    #[test]
    fn test_article_serializes_with_snake_case_fields() {
        let article = Article {
            id: 7,
            locale: "en-us".to_string(),
            title: "Title".to_string(),
            section_id: 123,
            author_id: 101,
            permission_group_id: 1,
            draft: false,
            promoted: false,
            comments_disabled: false,
            position: 0,
            content_tag_ids: vec!["tag-a".to_string()],
        };

        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["section_id"], 123);
        assert_eq!(value["content_tag_ids"][0], "tag-a");
    }
}
