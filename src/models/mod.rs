// src/models/mod.rs

//! Domain models for the fetcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod run;
mod story;

// Re-export all public types
pub use config::{
    BrokerConfig, Config, DatabaseConfig, ScheduleConfig, ServerConfig, SourceConfig, WorkerConfig,
};
pub use run::{ItemOutcome, RunSummary};
pub use story::{BrandStats, StoredStory, Story, StoryEvent, StoryId, StoryRecord};
