//! Story data structures, from upstream payload to wire event.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Identifier assigned to an item by Hacker News.
///
/// Globally unique at the source and the deduplication key for storage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct StoryId(pub i64);

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A story as returned by the item endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Story {
    pub id: StoryId,

    #[serde(default)]
    pub title: String,

    /// Submitter's username (`by` upstream)
    #[serde(rename = "by", alias = "author", default)]
    pub author: String,

    /// External link; absent for Ask HN and text posts
    #[serde(default)]
    pub url: Option<String>,

    /// Unix seconds
    pub time: i64,

    /// Removed by its author; such items carry no content
    #[serde(default)]
    pub deleted: bool,

    /// Killed by moderation
    #[serde(default)]
    pub dead: bool,
}

/// A story ready to be persisted; the surrogate key is assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    pub hn_id: StoryId,
    pub title: String,
    pub author: String,
    pub url: Option<String>,
    pub time: DateTime<Utc>,
}

impl TryFrom<Story> for StoryRecord {
    type Error = AppError;

    fn try_from(story: Story) -> Result<Self> {
        if story.deleted || story.dead {
            return Err(AppError::validation(format!("story {} is deleted or dead", story.id)));
        }

        let time = DateTime::from_timestamp(story.time, 0).ok_or_else(|| {
            AppError::validation(format!(
                "story {} has out-of-range time {}",
                story.id, story.time
            ))
        })?;

        Ok(Self {
            hn_id: story.id,
            title: story.title,
            author: story.author,
            url: story.url.filter(|u| !u.trim().is_empty()),
            time,
        })
    }
}

/// A persisted story row. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredStory {
    /// Local surrogate key
    pub id: i64,
    pub hn_id: StoryId,
    pub title: String,
    pub author: String,
    pub url: Option<String>,
    pub time: DateTime<Utc>,
}

impl StoredStory {
    /// Attach a surrogate key to a record.
    pub fn from_record(id: i64, record: StoryRecord) -> Self {
        Self {
            id,
            hn_id: record.hn_id,
            title: record.title,
            author: record.author,
            url: record.url,
            time: record.time,
        }
    }
}

/// Notification emitted once per newly stored story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryEvent {
    pub id: StoryId,
    pub title: String,
    /// Empty when the story has no external link
    pub url: String,
}

impl From<&StoredStory> for StoryEvent {
    fn from(story: &StoredStory) -> Self {
        Self {
            id: story.hn_id,
            title: story.title.clone(),
            url: story.url.clone().unwrap_or_default(),
        }
    }
}

/// Mention count for one brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BrandStats {
    pub brand: String,
    pub mentions: i64,
}
