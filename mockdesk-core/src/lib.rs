//! Core domain models and the in-memory resource store for mockdesk
//!
//! This crate defines the resource types the simulated backend serves
//! (articles, translations, sections, users) and the lock-guarded store
//! that owns them. It has minimal dependencies and no HTTP awareness.

pub mod store;
pub mod types;

// Re-export commonly used types at the crate root
pub use store::{ResourceStore, StoreStats};
pub use types::{Article, Section, Snapshot, Translation, User};
