//! Service layer for the fetcher.
//!
//! This module contains the outbound collaborators of the pipeline:
//! - Story retrieval (`HackerNewsClient` behind `StorySource`)
//! - Event publishing (`NatsPublisher` behind `EventPublisher`)

mod hacker_news;
mod publisher;

pub use hacker_news::{HackerNewsClient, StorySource, truncate_ids};
pub use publisher::{EventPublisher, NatsPublisher, encode_event};
