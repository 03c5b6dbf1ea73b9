//! Per-item outcomes and the per-run summary.

use serde::Serialize;

use crate::models::StoryId;

/// Terminal state of one story within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Stored and announced
    Published(StoryId),
    /// Stored, but the event was lost
    PublishFailed(StoryId),
    /// Already stored by an earlier run or a concurrent worker
    Duplicate(StoryId),
    /// Upstream request or payload decoding failed
    FetchFailed(StoryId),
    /// Repository rejected the insert for a reason other than a duplicate
    PersistFailed(StoryId),
    /// Never started because the run was cancelled
    Cancelled(StoryId),
    /// The worker panicked while handling the item
    Panicked(StoryId),
}

impl ItemOutcome {
    /// Whether a row was written for this item.
    pub fn inserted(&self) -> bool {
        matches!(self, Self::Published(_) | Self::PublishFailed(_))
    }
}

/// Counts of item outcomes for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Identifiers returned by the list phase
    pub listed: usize,
    pub inserted: usize,
    pub published: usize,
    pub duplicates: usize,
    pub fetch_failures: usize,
    pub persist_failures: usize,
    pub publish_failures: usize,
    pub cancelled: usize,
    pub panicked: usize,
}

impl RunSummary {
    pub fn new(listed: usize) -> Self {
        Self {
            listed,
            ..Self::default()
        }
    }

    /// Fold one item outcome into the counts.
    pub fn record(&mut self, outcome: &ItemOutcome) {
        if outcome.inserted() {
            self.inserted += 1;
        }
        match outcome {
            ItemOutcome::Published(_) => self.published += 1,
            ItemOutcome::PublishFailed(_) => self.publish_failures += 1,
            ItemOutcome::Duplicate(_) => self.duplicates += 1,
            ItemOutcome::FetchFailed(_) => self.fetch_failures += 1,
            ItemOutcome::PersistFailed(_) => self.persist_failures += 1,
            ItemOutcome::Cancelled(_) => self.cancelled += 1,
            ItemOutcome::Panicked(_) => self.panicked += 1,
        }
    }

    /// Items that reached any terminal state.
    pub fn completed(&self) -> usize {
        self.inserted
            + self.duplicates
            + self.fetch_failures
            + self.persist_failures
            + self.cancelled
            + self.panicked
    }

    pub fn failures(&self) -> usize {
        self.fetch_failures + self.persist_failures + self.publish_failures + self.panicked
    }
}
