//! Storage abstractions for story persistence.
//!
//! The repository is the only authority on whether a story is new: the
//! insert is a single conditional statement keyed by the Hacker News id, so
//! concurrent workers racing on the same id resolve to exactly one
//! [`InsertOutcome::Inserted`].
//!
//! ## Schema
//!
//! ```text
//! stories         (id, hn_id UNIQUE, title, author, url, time)
//! brand_mentions  (id, hn_id, brand)   -- written by an external tagger
//! ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BrandStats, StoredStory, StoryRecord};

// Re-export for convenience
pub use memory::MemoryStoryRepository;
pub use postgres::PgStoryRepository;

/// Result of a conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was created by this call
    Inserted(StoredStory),
    /// A row with the same Hacker News id already exists
    AlreadyExists,
}

/// Trait for story storage backends.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Insert the story unless its Hacker News id is already stored.
    ///
    /// Errors are reserved for genuine storage failures; a duplicate id is
    /// never an error.
    async fn insert_if_new(&self, story: &StoryRecord) -> Result<InsertOutcome>;

    /// Mention counts per brand, highest first.
    async fn brand_stats(&self) -> Result<Vec<BrandStats>>;

    /// Stored stories mentioning `brand`, newest first.
    async fn stories_by_brand(&self, brand: &str) -> Result<Vec<StoredStory>>;

    /// Release connections. Further calls fail.
    async fn close(&self) {}
}
