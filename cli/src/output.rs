//! Terminal rendering for `dischargeval analyze` and `providers`.
//!
//! The `*_line` helpers return strings so formatting can be tested with
//! colors switched off; the printing helpers are thin wrappers.

use colored::Colorize;
use dv_core::{Issue, Severity};
use engine::{AnalysisSummary, CheckCompletePayload};

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

/// Run metadata goes to stderr so piped stdout only carries results.
pub fn info(msg: &str) {
    eprintln!("{} {}", "info:".blue().bold(), msg);
}

pub fn hint(msg: &str) {
    println!("{} {}", "hint:".cyan().bold(), msg.dimmed());
}

pub fn severity_label(severity: Severity) -> String {
    let label = format!("[{severity}]");
    match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::Low => label.normal().to_string()
    }
}

/// Fixed-width progress column, e.g. `[ 40.00%]`.
pub fn progress(percent: f64) -> String {
    format!("[{percent:>6.2}%]").dimmed().to_string()
}

/// One line per resolved check: progress, name, then the outcome.
pub fn check_line(check: &CheckCompletePayload) -> String {
    let name = check.check_name.bold();
    let progress = progress(check.progress_percent);

    if check.failed {
        let kind = check
            .failure_kind
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "FAILED".to_string());
        return format!("{progress} {name} {}", kind.red());
    }

    let origin = if check.from_cache {
        "cached".cyan().to_string()
    } else {
        format!("{:.2}s", check.elapsed_seconds).dimmed().to_string()
    };
    format!("{progress} {name} {} issue(s) {origin}", check.issues.len())
}

pub fn issue_lines(issue: &Issue) -> Vec<String> {
    let mut lines = vec![format!(
        "    {} {} {}",
        severity_label(issue.severity),
        issue.issue_type,
        format!("({})", issue.location).dimmed()
    )];
    if !issue.suggestion.is_empty() {
        lines.push(format!(
            "      {} {}",
            "suggest:".cyan().bold(),
            issue.suggestion.dimmed()
        ));
    }
    lines
}

pub fn summary_lines(summary: &AnalysisSummary) -> Vec<String> {
    let mut lines = vec![
        "Summary".bold().to_string(),
        format!(
            "  {} issues: {} high, {} medium, {} low",
            summary.total_issues,
            summary.high_count.to_string().red(),
            summary.medium_count.to_string().yellow(),
            summary.low_count
        ),
        format!(
            "  {} checks in {:.2}s, cache hit rate {:.2}%",
            summary.checks_completed, summary.total_elapsed_seconds, summary.cache_hit_rate_percent
        ),
    ];
    if summary.failed_checks.is_empty() {
        lines.push(format!("{} All checks completed", "✓".green().bold()));
    } else {
        lines.push(format!(
            "{} Checks without a result: {}",
            "warning:".yellow().bold(),
            summary.failed_checks.join(", ")
        ));
    }
    lines
}

pub fn print_check(check: &CheckCompletePayload) {
    println!("{}", check_line(check));
    if !check.failed {
        for issue in &check.issues {
            for line in issue_lines(issue) {
                println!("{line}");
            }
        }
    }
}

pub fn print_summary(summary: &AnalysisSummary) {
    println!();
    for line in summary_lines(summary) {
        println!("{line}");
    }
}
