//! In-memory resource store with snapshot/restore support
//!
//! The store owns ID allocation and referential-integrity checks for the
//! simulated backend. One reader/writer lock guards all four collections
//! and the ID counters; reads take the shared mode, mutations the
//! exclusive mode. Every value handed out is a copy of store-internal
//! state, so callers can never mutate stored records without going
//! through the documented operations.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::types::{Article, Section, Snapshot, Translation, User};

/// First identifier handed out for created articles. Strictly greater
/// than any seeded fixture id.
const ARTICLE_ID_BASE: i64 = 1000;

/// First identifier handed out for created translations.
const TRANSLATION_ID_BASE: i64 = 5000;

/// Per-collection record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub articles: usize,
    pub translations: usize,
    pub sections: usize,
    pub users: usize,
}

#[derive(Debug)]
struct StoreState {
    articles: HashMap<i64, Article>,
    translations: HashMap<String, Translation>,
    sections: HashMap<i64, Section>,
    users: HashMap<i64, User>,
    next_article_id: i64,
    next_translation_id: i64,
}

impl StoreState {
    fn seeded() -> Self {
        let mut state = Self {
            articles: HashMap::new(),
            translations: HashMap::new(),
            sections: HashMap::new(),
            users: HashMap::new(),
            next_article_id: ARTICLE_ID_BASE,
            next_translation_id: TRANSLATION_ID_BASE,
        };
        state.seed();
        state
    }

    fn seed(&mut self) {
        self.sections.insert(
            123,
            Section {
                id: 123,
                name: "Getting Started".to_string(),
                description: "Introductory guides".to_string(),
                category_id: 10,
                locale: "en-us".to_string(),
                position: 0,
            },
        );
        self.sections.insert(
            124,
            Section {
                id: 124,
                name: "Troubleshooting".to_string(),
                description: "Diagnosing common problems".to_string(),
                category_id: 10,
                locale: "en-us".to_string(),
                position: 1,
            },
        );

        self.users.insert(
            101,
            User {
                id: 101,
                name: "Avery Doc".to_string(),
                email: "avery@example.com".to_string(),
                role: "agent".to_string(),
            },
        );
        self.users.insert(
            102,
            User {
                id: 102,
                name: "Sam Admin".to_string(),
                email: "sam@example.com".to_string(),
                role: "admin".to_string(),
            },
        );

        self.articles.insert(
            456,
            Article {
                id: 456,
                locale: "en-us".to_string(),
                title: "Sample Article".to_string(),
                section_id: 123,
                author_id: 101,
                permission_group_id: 1,
                draft: false,
                promoted: false,
                comments_disabled: false,
                position: 0,
                content_tag_ids: Vec::new(),
            },
        );

        let seeded_translation = Translation {
            id: 900,
            source_id: 456,
            locale: "de".to_string(),
            title: "Beispielartikel".to_string(),
            body: "<p>Beispielinhalt</p>".to_string(),
            draft: false,
        };
        self.translations.insert(
            Translation::key_for(456, "de"),
            seeded_translation,
        );
    }
}

/// Stateful in-memory repository of articles, translations, sections,
/// and users.
#[derive(Debug)]
pub struct ResourceStore {
    state: RwLock<StoreState>,
}

impl ResourceStore {
    /// Create a store populated with the built-in fixtures.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::seeded()),
        }
    }

    /// Whether an article with the given id exists.
    pub fn article_exists(&self, id: i64) -> bool {
        self.state.read().articles.contains_key(&id)
    }

    /// Fetch a copy of an article, if present.
    pub fn get_article(&self, id: i64) -> Option<Article> {
        self.state.read().articles.get(&id).cloned()
    }

    /// Create an article in the given section with fixed defaults.
    ///
    /// Allocates the next article id. The section reference is not
    /// checked here; callers validate it first and
    /// [`Self::validate_relationships`] reports any dangling link.
    pub fn create_article(&self, locale: &str, section_id: i64) -> Article {
        let mut state = self.state.write();
        let id = state.next_article_id;
        state.next_article_id += 1;

        let article = Article {
            id,
            locale: locale.to_string(),
            title: format!("Article {}", id),
            section_id,
            author_id: 101,
            permission_group_id: 1,
            draft: false,
            promoted: false,
            comments_disabled: false,
            position: 0,
            content_tag_ids: Vec::new(),
        };
        state.articles.insert(id, article.clone());
        debug!(article_id = id, section_id, "created article");
        article
    }

    /// Simulate an edit by mutating the article title deterministically.
    pub fn update_article(&self, id: i64) -> Option<Article> {
        let mut state = self.state.write();
        let article = state.articles.get_mut(&id)?;
        article.title = format!("Updated Article {}", id);
        debug!(article_id = id, "updated article");
        Some(article.clone())
    }

    /// Whether a section with the given id exists.
    pub fn section_exists(&self, id: i64) -> bool {
        self.state.read().sections.contains_key(&id)
    }

    /// Fetch a copy of a translation, if present.
    pub fn get_translation(&self, article_id: i64, locale: &str) -> Option<Translation> {
        self.state
            .read()
            .translations
            .get(&Translation::key_for(article_id, locale))
            .cloned()
    }

    /// Create a translation for an existing article.
    ///
    /// Returns `None` without storing anything when the article is
    /// absent.
    pub fn create_translation(&self, article_id: i64, locale: &str) -> Option<Translation> {
        let mut state = self.state.write();
        if !state.articles.contains_key(&article_id) {
            return None;
        }

        let id = state.next_translation_id;
        state.next_translation_id += 1;

        let translation = Translation {
            id,
            source_id: article_id,
            locale: locale.to_string(),
            title: format!("Article {} ({})", article_id, locale),
            body: format!("<p>Translated content for article {}</p>", article_id),
            draft: false,
        };
        state.translations.insert(
            Translation::key_for(article_id, locale),
            translation.clone(),
        );
        debug!(article_id, locale, translation_id = id, "created translation");
        Some(translation)
    }

    /// Simulate an edit by mutating the translation title
    /// deterministically.
    pub fn update_translation(&self, article_id: i64, locale: &str) -> Option<Translation> {
        let mut state = self.state.write();
        let translation = state
            .translations
            .get_mut(&Translation::key_for(article_id, locale))?;
        translation.title = format!("Updated Article {} ({})", article_id, locale);
        debug!(article_id, locale, "updated translation");
        Some(translation.clone())
    }

    /// Insert a pre-built article verbatim, bumping the id counter past
    /// it. Referential integrity is intentionally not checked, so tests
    /// can construct dangling links for `validate_relationships`.
    pub fn insert_article(&self, article: Article) {
        let mut state = self.state.write();
        if article.id >= state.next_article_id {
            state.next_article_id = article.id + 1;
        }
        state.articles.insert(article.id, article);
    }

    /// Clear all collections and reseed the built-in fixtures.
    pub fn reset(&self) {
        let mut state = self.state.write();
        *state = StoreState::seeded();
        debug!("resource store reset to seeded fixtures");
    }

    /// Per-collection record counts.
    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            articles: state.articles.len(),
            translations: state.translations.len(),
            sections: state.sections.len(),
            users: state.users.len(),
        }
    }

    /// List dangling foreign keys as human-readable strings.
    ///
    /// Non-fatal: the store keeps serving records that fail this pass.
    pub fn validate_relationships(&self) -> Vec<String> {
        let state = self.state.read();
        let mut issues = Vec::new();

        for article in state.articles.values() {
            if !state.sections.contains_key(&article.section_id) {
                issues.push(format!(
                    "article {} references missing section {}",
                    article.id, article.section_id
                ));
            }
            if !state.users.contains_key(&article.author_id) {
                issues.push(format!(
                    "article {} references missing author {}",
                    article.id, article.author_id
                ));
            }
        }

        for translation in state.translations.values() {
            if !state.articles.contains_key(&translation.source_id) {
                issues.push(format!(
                    "translation {} references missing article {}",
                    translation.id, translation.source_id
                ));
            }
        }

        issues.sort();
        issues
    }

    /// Deep-copy all collections into an immutable snapshot.
    pub fn backup(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            articles: state.articles.clone(),
            translations: state.translations.clone(),
            sections: state.sections.clone(),
            users: state.users.clone(),
            created_at: Utc::now(),
        }
    }

    /// Replace all collections with the snapshot's contents.
    ///
    /// ID counters are rebuilt from the restored records so later
    /// creates never collide with restored ids.
    pub fn restore(&self, snapshot: &Snapshot) {
        let mut state = self.state.write();
        state.articles = snapshot.articles.clone();
        state.translations = snapshot.translations.clone();
        state.sections = snapshot.sections.clone();
        state.users = snapshot.users.clone();

        let max_article = state.articles.keys().copied().max().unwrap_or(0);
        state.next_article_id = (max_article + 1).max(ARTICLE_ID_BASE);
        let max_translation = state
            .translations
            .values()
            .map(|t| t.id)
            .max()
            .unwrap_or(0);
        state.next_translation_id = (max_translation + 1).max(TRANSLATION_ID_BASE);
        debug!(created_at = %snapshot.created_at, "resource store restored from snapshot");
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_fixtures_present() {
        let store = ResourceStore::new();
        let article = store.get_article(456).unwrap();
        assert_eq!(article.title, "Sample Article");
        assert!(store.section_exists(123));
        assert!(store.get_translation(456, "de").is_some());
    }

    #[test]
    fn test_create_article_allocates_above_seeded_ids() {
        let store = ResourceStore::new();
        let article = store.create_article("en-us", 123);
        assert!(article.id > 456);
        assert_eq!(article.title, format!("Article {}", article.id));

        let next = store.create_article("en-us", 123);
        assert_eq!(next.id, article.id + 1);
    }

    #[test]
    fn test_returned_article_is_a_defensive_copy() {
        let store = ResourceStore::new();
        let mut copy = store.get_article(456).unwrap();
        copy.title = "Mutated locally".to_string();

        assert_eq!(store.get_article(456).unwrap().title, "Sample Article");
    }

    #[test]
    fn test_update_article_mutates_title_deterministically() {
        let store = ResourceStore::new();
        let updated = store.update_article(456).unwrap();
        assert_eq!(updated.title, "Updated Article 456");
        assert_eq!(store.get_article(456).unwrap().title, "Updated Article 456");

        assert!(store.update_article(9999).is_none());
    }

    #[test]
    fn test_create_translation_requires_existing_article() {
        let store = ResourceStore::new();
        assert!(store.create_translation(9999, "fr").is_none());
        assert!(store.get_translation(9999, "fr").is_none());

        let translation = store.create_translation(456, "fr").unwrap();
        assert_eq!(translation.source_id, 456);
        assert_eq!(translation.locale, "fr");
        assert_eq!(
            store.get_translation(456, "fr").unwrap().id,
            translation.id
        );
    }

    #[test]
    fn test_update_translation() {
        let store = ResourceStore::new();
        let updated = store.update_translation(456, "de").unwrap();
        assert_eq!(updated.title, "Updated Article 456 (de)");
        assert!(store.update_translation(456, "zz").is_none());
    }

    #[test]
    fn test_stats_idempotent_without_mutation() {
        let store = ResourceStore::new();
        assert_eq!(store.stats(), store.stats());
    }

    #[test]
    fn test_validate_relationships_reports_dangling_links() {
        let store = ResourceStore::new();
        assert!(store.validate_relationships().is_empty());

        store.insert_article(Article {
            id: 2000,
            locale: "en-us".to_string(),
            title: "Orphan".to_string(),
            section_id: 99999,
            author_id: 101,
            permission_group_id: 1,
            draft: false,
            promoted: false,
            comments_disabled: false,
            position: 0,
            content_tag_ids: Vec::new(),
        });

        let issues = store.validate_relationships();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("missing section 99999"));
    }

    #[test]
    fn test_backup_reset_restore_round_trip() {
        let store = ResourceStore::new();
        store.create_article("en-us", 123);
        store.create_translation(456, "fr");
        let before = store.stats();

        let snapshot = store.backup();
        store.reset();
        assert_ne!(store.stats(), before);

        store.restore(&snapshot);
        assert_eq!(store.stats(), before);

        // Allocation continues above the restored ids.
        let article = store.create_article("en-us", 123);
        assert!(!snapshot.articles.contains_key(&article.id));
    }

    #[test]
    fn test_reset_reseeds_fixtures() {
        let store = ResourceStore::new();
        store.create_article("en-us", 123);
        store.reset();

        let stats = store.stats();
        assert_eq!(stats.articles, 1);
        assert_eq!(store.get_article(456).unwrap().title, "Sample Article");
    }
}
