//! In-process storage implementation.
//!
//! Same contract as the Postgres backend, kept behind one mutex so the
//! existence check and the insert happen under the same lock. Intended for
//! development and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BrandStats, StoredStory, StoryId, StoryRecord};
use crate::storage::{InsertOutcome, StoryRepository};

#[derive(Default)]
struct State {
    stories: HashMap<StoryId, StoredStory>,
    mentions: Vec<(StoryId, String)>,
    next_id: i64,
}

/// Story repository held in memory.
#[derive(Default)]
pub struct MemoryStoryRepository {
    state: Mutex<State>,
}

impl MemoryStoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that a story mentions `brand`.
    pub fn add_mention(&self, hn_id: StoryId, brand: impl Into<String>) {
        self.lock().mentions.push((hn_id, brand.into()));
    }

    /// Look up a stored story by Hacker News id.
    pub fn get(&self, hn_id: StoryId) -> Option<StoredStory> {
        self.lock().stories.get(&hn_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StoryRepository for MemoryStoryRepository {
    async fn insert_if_new(&self, story: &StoryRecord) -> Result<InsertOutcome> {
        let mut state = self.lock();
        if state.stories.contains_key(&story.hn_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        state.next_id += 1;
        let stored = StoredStory::from_record(state.next_id, story.clone());
        state.stories.insert(story.hn_id, stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    async fn brand_stats(&self) -> Result<Vec<BrandStats>> {
        let state = self.lock();
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for (_, brand) in &state.mentions {
            *counts.entry(brand.as_str()).or_default() += 1;
        }

        let mut stats: Vec<BrandStats> = counts
            .into_iter()
            .map(|(brand, mentions)| BrandStats {
                brand: brand.to_string(),
                mentions,
            })
            .collect();
        stats.sort_by(|a, b| b.mentions.cmp(&a.mentions).then(a.brand.cmp(&b.brand)));
        Ok(stats)
    }

    async fn stories_by_brand(&self, brand: &str) -> Result<Vec<StoredStory>> {
        let state = self.lock();
        let mut stories: Vec<StoredStory> = state
            .stories
            .values()
            .filter(|s| {
                state
                    .mentions
                    .iter()
                    .any(|(id, b)| *id == s.hn_id && b == brand)
            })
            .cloned()
            .collect();
        stories.sort_by(|a, b| b.time.cmp(&a.time).then(b.id.cmp(&a.id)));
        Ok(stories)
    }
}
