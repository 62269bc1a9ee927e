//! Before/after descriptions of pending writes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What a change does to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The target does not exist yet
    Create,
    /// A field of an existing target changes value
    Update,
    /// Part of an existing target goes away
    Delete,
}

impl ChangeKind {
    /// Single-character marker used in listings
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Delete => "-",
        }
    }
}

/// A single difference between current and desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Name of the object being changed
    pub target: String,
    /// Field of the target (e.g. "status", "templates")
    pub field: String,
    /// Kind of change
    pub kind: ChangeKind,
    /// Current value, if any
    pub before: Option<String>,
    /// Desired value, if any
    pub after: Option<String>,
}

impl Change {
    /// A new object, or a new part of `target`, described by `after`
    pub fn create(
        target: impl Into<String>,
        field: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            field: field.into(),
            kind: ChangeKind::Create,
            before: None,
            after: Some(after.into()),
        }
    }

    /// A field moving from `before` to `after`
    pub fn update(
        target: impl Into<String>,
        field: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            field: field.into(),
            kind: ChangeKind::Update,
            before: Some(before.into()),
            after: Some(after.into()),
        }
    }

    /// Removal of the part described by `before`
    pub fn delete(
        target: impl Into<String>,
        field: impl Into<String>,
        before: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            field: field.into(),
            kind: ChangeKind::Delete,
            before: Some(before.into()),
            after: None,
        }
    }

    /// One-line description without the target name
    pub fn describe(&self) -> String {
        match self.kind {
            ChangeKind::Create => format!(
                "create {} {}",
                self.field,
                self.after.as_deref().unwrap_or_default()
            ),
            ChangeKind::Update => format!(
                "{} {} -> {}",
                self.field,
                self.before.as_deref().unwrap_or("(none)"),
                self.after.as_deref().unwrap_or("(none)")
            ),
            ChangeKind::Delete => format!(
                "delete {} {}",
                self.field,
                self.before.as_deref().unwrap_or_default()
            ),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.describe())
    }
}

/// Change counts by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub creations: usize,
    pub updates: usize,
    pub deletions: usize,
}

impl ChangeSummary {
    /// Count a list of changes
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.kind {
                ChangeKind::Create => summary.creations += 1,
                ChangeKind::Update => summary.updates += 1,
                ChangeKind::Delete => summary.deletions += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creations + self.updates + self.deletions
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group changes by target, keeping per-target order
pub fn group_by_target(changes: &[Change]) -> BTreeMap<&str, Vec<&Change>> {
    let mut groups: BTreeMap<&str, Vec<&Change>> = BTreeMap::new();
    for change in changes {
        groups.entry(change.target.as_str()).or_default().push(change);
    }
    groups
}
