//! Terminal rendering of a run report

use colored::Colorize;
use converge::{Change, ChangeKind, ChangeSummary, ExecuteSummary, group_by_target};

use super::report::{Issue, RunReport, Scope};

fn symbol(kind: ChangeKind) -> colored::ColoredString {
    match kind {
        ChangeKind::Create => kind.symbol().green(),
        ChangeKind::Update => kind.symbol().yellow(),
        ChangeKind::Delete => kind.symbol().red(),
    }
}

/// Print a change list grouped by host
pub fn display_changes(title: &str, changes: &[Change]) {
    if changes.is_empty() {
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        title.bold()
    );
    println!("│");
    for (target, host_changes) in group_by_target(changes) {
        println!("│ {}", target.bold());
        for change in host_changes {
            println!(
                "│   {} {}",
                symbol(change.kind),
                change.describe().dimmed()
            );
        }
        println!("│");
    }

    let summary = ChangeSummary::from_changes(changes);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ {} changes ({} create, {} update, {} delete)",
        summary.total().to_string().bold(),
        summary.creations.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.deletions.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print per-device issues, grouped by kind
pub fn display_issues(issues: &[Issue]) {
    if issues.is_empty() {
        return;
    }

    println!();
    println!("{}", "Issues".yellow().bold());
    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by_key(|i| (i.kind(), i.subject()));
    for issue in sorted {
        let marker = match issue {
            Issue::SkippedInvalidDevice { .. } => "⚠".yellow(),
            _ => "✗".red(),
        };
        println!("  {} {} {}", marker, issue.kind().dimmed(), issue);
    }
}

fn print_summary(report: &RunReport) {
    let summary: &ExecuteSummary = &report.summary;
    println!();
    if summary.is_success() {
        println!("  {} Monitoring is in sync", "✓".green().bold());
    } else {
        println!("  {} Sync finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} hosts created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} hosts updated", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} stale hosts disabled", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} hosts unchanged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} devices skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "devices".red());
    }
    let conflicts = report.count("AmbiguousIPConflict") + report.count("CreateConflict");
    if conflicts > 0 {
        println!("    • {conflicts} conflicts need a manual fix");
    }
}

/// Print the whole report
pub fn display_report(report: &RunReport) {
    if let Scope::Device(id) = report.scope {
        println!("{}", format!("Device {id}").cyan().bold());
    }

    if report.changes.is_empty() && report.declined.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
    }
    display_changes("Applied", &report.changes);
    display_changes("Not applied", &report.declined);
    display_issues(&report.issues);
    print_summary(report);
}
