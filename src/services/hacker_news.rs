// src/services/hacker_news.rs

//! Hacker News story source.
//!
//! Reads the top stories list and individual items from the public
//! Firebase-backed API. One request per call, no retries.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{SourceConfig, Story, StoryId};
use crate::utils::http::{create_async_client, fetch_bytes};
use crate::utils::{item_url, join_url};

/// Source of top story identifiers and story details.
#[async_trait]
pub trait StorySource: Send + Sync {
    /// Top story identifiers in source order, truncated to `limit`.
    ///
    /// A `limit` of 0, or one at least the list length, returns everything.
    async fn fetch_top_ids(&self, limit: usize) -> Result<Vec<StoryId>>;

    /// Fetch and decode one story.
    async fn fetch_story(&self, id: StoryId) -> Result<Story>;
}

/// Keep the first `limit` identifiers; 0 keeps all of them.
pub fn truncate_ids(mut ids: Vec<StoryId>, limit: usize) -> Vec<StoryId> {
    if limit > 0 && limit < ids.len() {
        ids.truncate(limit);
    }
    ids
}

/// HTTP client for the Hacker News API.
#[derive(Clone)]
pub struct HackerNewsClient {
    client: Client,
    config: SourceConfig,
}

impl HackerNewsClient {
    /// Create a client with its own connection pool and timeout.
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = create_async_client(&config)?;
        Ok(Self { client, config })
    }

    fn decorate(&self, mut url: Url) -> Url {
        if self.config.pretty {
            url.query_pairs_mut().append_pair("print", "pretty");
        }
        url
    }

    fn top_stories_url(&self) -> Result<Url> {
        let url = join_url(&self.config.base_url, &self.config.top_stories_path)?;
        Ok(self.decorate(url))
    }

    fn story_url(&self, id: StoryId) -> Result<Url> {
        let url = item_url(&self.config.base_url, &self.config.item_path, id)?;
        Ok(self.decorate(url))
    }
}

#[async_trait]
impl StorySource for HackerNewsClient {
    async fn fetch_top_ids(&self, limit: usize) -> Result<Vec<StoryId>> {
        let url = self.top_stories_url()?;
        log::debug!("Fetching top stories from {url}");

        let body = fetch_bytes(&self.client, url).await?;
        let ids: Vec<StoryId> = serde_json::from_slice(&body)?;
        let total = ids.len();
        let ids = truncate_ids(ids, limit);

        log::debug!("Top stories: {} of {} identifiers kept", ids.len(), total);
        Ok(ids)
    }

    async fn fetch_story(&self, id: StoryId) -> Result<Story> {
        let url = self.story_url(id)?;
        let body = fetch_bytes(&self.client, url).await?;
        let story: Story = serde_json::from_slice(&body)?;

        if story.id != id {
            return Err(AppError::validation(format!(
                "requested story {id} but upstream returned {}",
                story.id
            )));
        }
        Ok(story)
    }
}
