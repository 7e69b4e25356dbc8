//! Plain-text report of a completed run.

use crate::aggregate::AnalysisSummary;
use chrono::{DateTime, Utc};
use dv_core::{CheckResult, Provider};
use std::fmt::Write;

const WIDTH: usize = 80;

/// Snapshot of a completed run. Holds no document text.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub provider: Provider,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the document bytes.
    pub content_hash: String,
    pub summary: AnalysisSummary,
    pub results: Vec<CheckResult>
}

impl RunReport {
    /// Renders the report, with checks in the order given by `check_order`.
    ///
    /// Checks without issues are omitted from the detail section.
    pub fn render(&self, check_order: &[String]) -> String {
        let mut out = String::new();
        // fmt::Write into a String cannot fail
        let _ = self.write_to(&mut out, check_order);
        out
    }

    fn write_to(&self, out: &mut String, check_order: &[String]) -> std::fmt::Result {
        let heavy = "=".repeat(WIDTH);
        let light = "-".repeat(WIDTH);
        let summary = &self.summary;

        writeln!(out, "{heavy}\n DISCHARGE SUMMARY VALIDATION REPORT\n{heavy}\n")?;
        writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out, "Run ID: {}", self.run_id)?;
        writeln!(out, "LLM Provider: {}", self.provider.as_str().to_uppercase())?;
        writeln!(out, "Processing Time: {:.2} seconds", summary.total_elapsed_seconds)?;
        writeln!(out, "Content Hash: {}\n", self.content_hash)?;

        writeln!(out, "{light}\n EXECUTIVE SUMMARY\n{light}\n")?;
        writeln!(out, "Total Issues Found: {}", summary.total_issues)?;
        writeln!(out, "  - HIGH Severity: {}", summary.high_count)?;
        writeln!(out, "  - MEDIUM Severity: {}", summary.medium_count)?;
        writeln!(out, "  - LOW Severity: {}", summary.low_count)?;
        writeln!(out, "Checks Completed: {}", summary.checks_completed)?;
        writeln!(out, "Cache Hit Rate: {:.1}%", summary.cache_hit_rate_percent)?;
        if !summary.failed_checks.is_empty() {
            writeln!(out, "Failed Checks: {}", summary.failed_checks.join(", "))?;
        }
        writeln!(out, "\n")?;

        writeln!(out, "{heavy}\n DETAILED VALIDATION RESULTS\n{heavy}\n")?;
        for name in check_order {
            let Some(result) = self.results.iter().find(|r| &r.check == name) else {
                continue;
            };
            if result.issues.is_empty() {
                continue;
            }

            writeln!(out, "{light}")?;
            writeln!(out, " {} CHECK", name.to_uppercase().replace('_', " "))?;
            writeln!(out, "{light}")?;
            writeln!(out, "Issues Found: {}", result.issues.len())?;
            writeln!(
                out,
                "From Cache: {}",
                if result.is_from_cache() { "Yes" } else { "No" }
            )?;
            if !result.is_from_cache() {
                writeln!(out, "Processing Time: {:.2}s", result.elapsed.as_secs_f64())?;
            }
            writeln!(out)?;

            for (idx, issue) in result.issues.iter().enumerate() {
                writeln!(out, "\n{}. [{}] {}", idx + 1, issue.severity, issue.issue_type)?;
                writeln!(out, "   Location: {}", or_placeholder(&issue.location))?;
                writeln!(out, "   Current: {}", or_placeholder(&issue.current))?;
                writeln!(out, "   Suggestion: {}", or_placeholder(&issue.suggestion))?;
                writeln!(out, "   Explanation: {}", or_placeholder(&issue.explanation))?;
            }
            writeln!(out, "\n")?;
        }

        write!(out, "{heavy}\n END OF REPORT\n{heavy}\n")
    }
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}
