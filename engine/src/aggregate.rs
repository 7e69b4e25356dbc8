//! Final accounting of a run.

use crate::events::round2;
use dv_core::{CheckResult, Severity};
use serde::Serialize;
use std::time::Duration;

/// Progress after `completed` of `total` checks resolved.
///
/// Rounded to two decimals, but never rounded up to 100 while a check is
/// still outstanding.
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 || completed >= total {
        return 100.0;
    }
    let exact = completed as f64 / total as f64 * 100.0;
    round2(exact).min(99.99)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSummary {
    pub check_name: String,
    pub issue_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub from_cache: bool,
    pub failed: bool,
    pub elapsed_seconds: f64
}

impl CheckSummary {
    fn from_result(result: &CheckResult) -> Self {
        let count = |severity: Severity| result.issues.iter().filter(|i| i.severity == severity).count();
        Self {
            check_name: result.check.clone(),
            issue_count: result.issues.len(),
            high_count: count(Severity::High),
            medium_count: count(Severity::Medium),
            low_count: count(Severity::Low),
            from_cache: result.is_from_cache(),
            failed: result.failed,
            elapsed_seconds: round2(result.elapsed.as_secs_f64())
        }
    }
}

/// Payload of `analysis_complete`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub total_issues: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub total_elapsed_seconds: f64,
    pub cache_hit_rate_percent: f64,
    pub checks_completed: usize,
    pub progress_percent: f64,
    pub failed_checks: Vec<String>,
    pub checks: Vec<CheckSummary>
}

impl AnalysisSummary {
    /// Aggregates `results` in the order they arrived.
    pub fn from_results(results: &[CheckResult], total_checks: usize, wall_clock: Duration) -> Self {
        let checks: Vec<CheckSummary> = results.iter().map(CheckSummary::from_result).collect();
        let cache_hits = results.iter().filter(|r| r.is_from_cache()).count();
        let cache_hit_rate_percent = if results.is_empty() {
            0.0
        } else {
            round2(cache_hits as f64 / results.len() as f64 * 100.0)
        };

        Self {
            total_issues: checks.iter().map(|c| c.issue_count).sum(),
            high_count: checks.iter().map(|c| c.high_count).sum(),
            medium_count: checks.iter().map(|c| c.medium_count).sum(),
            low_count: checks.iter().map(|c| c.low_count).sum(),
            total_elapsed_seconds: round2(wall_clock.as_secs_f64()),
            cache_hit_rate_percent,
            checks_completed: results.len(),
            progress_percent: progress_percent(results.len(), total_checks),
            failed_checks: results
                .iter()
                .filter(|r| r.failed)
                .map(|r| r.check.clone())
                .collect(),
            checks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_core::Issue;
    use errors::ErrorKind;

    fn issue(check: &str, severity: Severity) -> Issue {
        Issue {
            category: check.to_string(),
            issue_type: "x".to_string(),
            severity,
            location: String::new(),
            current: String::new(),
            suggestion: String::new(),
            explanation: String::new()
        }
    }

    #[test]
    fn test_progress_never_reaches_100_early() {
        assert_eq!(progress_percent(0, 5), 0.0);
        assert_eq!(progress_percent(1, 5), 20.0);
        assert_eq!(progress_percent(2, 3), 66.67);
        assert_eq!(progress_percent(2999, 3000), 99.97);
        assert_eq!(progress_percent(29999, 30000), 99.99);
        assert_eq!(progress_percent(3, 3), 100.0);

        let mut last = 0.0;
        for done in 0..=7 {
            let p = progress_percent(done, 7);
            assert!(p >= last);
            last = p;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_summary_accounting() {
        let results = vec![
            CheckResult::computed(
                "linguistic",
                vec![
                    issue("linguistic", Severity::Low),
                    issue("linguistic", Severity::Low)
                ],
                Duration::from_millis(800)
            ),
            CheckResult::from_cache(
                "clinical_safety",
                vec![
                    issue("clinical_safety", Severity::High),
                    issue("clinical_safety", Severity::Medium)
                ]
            ),
            CheckResult::degraded("structural", ErrorKind::Transient, Duration::from_secs(2)),
        ];

        let summary = AnalysisSummary::from_results(&results, 3, Duration::from_millis(2340));
        assert_eq!(summary.total_issues, 4);
        assert_eq!(
            summary.high_count + summary.medium_count + summary.low_count,
            summary.total_issues
        );
        assert_eq!(summary.low_count, 2);
        assert_eq!(summary.checks_completed, 3);
        assert_eq!(summary.progress_percent, 100.0);
        assert_eq!(summary.cache_hit_rate_percent, 33.33);
        assert_eq!(summary.failed_checks, vec!["structural".to_string()]);
        assert_eq!(summary.total_elapsed_seconds, 2.34);
        assert_eq!(summary.checks[1].check_name, "clinical_safety");
        assert!(summary.checks[1].from_cache);
    }
}
