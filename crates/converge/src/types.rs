//! Core result types for converge operations

use serde::{Deserialize, Serialize};

/// Result of a single converge operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Target already matched, nothing written
    NoChange,
    /// Target was created
    Created,
    /// Target was modified
    Modified,
    /// Target was taken out of service
    Removed,
    /// The write was attempted and failed
    Failed { error: String },
    /// The write was not attempted
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a write
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }

    /// Combine two results of steps on the same target.
    ///
    /// A failure wins over everything, then a skip, then any change.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (failed @ Self::Failed { .. }, _) | (_, failed @ Self::Failed { .. }) => failed,
            (skipped @ Self::Skipped { .. }, _) | (_, skipped @ Self::Skipped { .. }) => skipped,
            (Self::NoChange, other) => other,
            (this, Self::NoChange) => this,
            (Self::Created, _) | (_, Self::Created) => Self::Created,
            (this, _) => this,
        }
    }
}

/// Summary of a converge run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of writes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if the run was free of failed writes
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of operations recorded
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}
