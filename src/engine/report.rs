//! Run outcome: fatal errors, per-device issues and the run report

use chrono::{DateTime, Utc};
use converge::{ApplyResult, Change, ExecuteSummary};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The two systems a run talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum System {
    Inventory,
    Monitoring,
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inventory => write!(f, "inventory (NetBox)"),
            Self::Monitoring => write!(f, "monitoring (Zabbix)"),
        }
    }
}

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or auth failure talking to either system
    #[error("{system} unavailable: {source}")]
    UpstreamUnavailable {
        system: System,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The confirmation hook itself failed (e.g. no terminal)
    #[error("confirmation failed: {0}")]
    Confirmation(String),
}

impl SyncError {
    pub fn inventory(err: netboxkit::Error) -> Self {
        Self::UpstreamUnavailable {
            system: System::Inventory,
            source: Box::new(err),
        }
    }

    pub fn monitoring(err: zabbixkit::Error) -> Self {
        Self::UpstreamUnavailable {
            system: System::Monitoring,
            source: Box::new(err),
        }
    }
}

/// A per-device problem that does not stop the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Issue {
    /// Missing name or IP, unmapped class, or duplicate name
    SkippedInvalidDevice { device: String, reason: String },
    /// More than one host holds the device's IP, or the IP belongs to
    /// another desired device's host
    AmbiguousIPConflict {
        device: String,
        ip: String,
        hosts: Vec<String>,
    },
    /// The backend already has a host with that name or interface
    CreateConflict { device: String, detail: String },
    /// The backend refused a write; the device's remaining steps were
    /// abandoned
    WriteRejected {
        host: String,
        step: String,
        detail: String,
    },
}

impl Issue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SkippedInvalidDevice { .. } => "SkippedInvalidDevice",
            Self::AmbiguousIPConflict { .. } => "AmbiguousIPConflict",
            Self::CreateConflict { .. } => "CreateConflict",
            Self::WriteRejected { .. } => "WriteRejected",
        }
    }

    /// Device or host the issue is about
    pub fn subject(&self) -> &str {
        match self {
            Self::SkippedInvalidDevice { device, .. }
            | Self::AmbiguousIPConflict { device, .. }
            | Self::CreateConflict { device, .. } => device,
            Self::WriteRejected { host, .. } => host,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkippedInvalidDevice { device, reason } => {
                write!(f, "{device}: {reason}")
            }
            Self::AmbiguousIPConflict { device, ip, hosts } => {
                write!(f, "{device}: {ip} is held by {}", hosts.join(", "))
            }
            Self::CreateConflict { device, detail } => write!(f, "{device}: {detail}"),
            Self::WriteRejected { host, step, detail } => {
                write!(f, "{host}: {step} rejected: {detail}")
            }
        }
    }
}

/// What a run covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum Scope {
    /// Every desired device plus the stale-host sweep
    Full,
    /// One inventory device, no sweep
    Device(u64),
}

/// Everything a run did, for display or JSON output
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scope: Scope,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: ExecuteSummary,
    /// Writes that were made
    pub changes: Vec<Change>,
    /// Writes the confirmation hook declined
    pub declined: Vec<Change>,
    pub issues: Vec<Issue>,
    /// Hosts disabled by the stale sweep
    pub disabled: Vec<String>,
}

impl RunReport {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            started_at: Utc::now(),
            finished_at: None,
            summary: ExecuteSummary::default(),
            changes: Vec::new(),
            declined: Vec::new(),
            issues: Vec::new(),
            disabled: Vec::new(),
        }
    }

    /// Count one device's (or one stale host's) combined result
    pub fn record(&mut self, result: &ApplyResult) {
        self.summary.add_result(result);
    }

    /// Log and keep a per-device issue
    pub fn issue(&mut self, issue: Issue) {
        match &issue {
            Issue::SkippedInvalidDevice { .. } => log::warn!("{}: {issue}", issue.kind()),
            _ => log::error!("{}: {issue}", issue.kind()),
        }
        self.issues.push(issue);
    }

    pub fn count(&self, kind: &str) -> usize {
        self.issues.iter().filter(|i| i.kind() == kind).count()
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn has_writes(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_json_carries_kind() {
        let issue = Issue::AmbiguousIPConflict {
            device: "r1".into(),
            ip: "10.0.0.1".into(),
            hosts: vec!["a".into(), "b".into()],
        };
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["kind"], "AmbiguousIPConflict");
        assert_eq!(value["hosts"][1], "b");
        assert_eq!(issue.to_string(), "r1: 10.0.0.1 is held by a, b");
    }

    #[test]
    fn test_report_counts() {
        let mut report = RunReport::new(Scope::Full);
        report.issue(Issue::SkippedInvalidDevice {
            device: "r1".into(),
            reason: "missing management IP".into(),
        });
        report.record(&ApplyResult::Skipped {
            reason: "invalid".into(),
        });
        report.record(&ApplyResult::Created);

        assert_eq!(report.count("SkippedInvalidDevice"), 1);
        assert_eq!(report.count("CreateConflict"), 0);
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.skipped, 1);

        let report = report.finish();
        assert!(report.finished_at.is_some());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["scope"]["type"], "full");
    }

    #[test]
    fn test_upstream_error_message() {
        let err = SyncError::monitoring(zabbixkit::Error::http("connection refused", None));
        assert_eq!(
            err.to_string(),
            "monitoring (Zabbix) unavailable: HTTP request failed: connection refused"
        );
    }
}
