use dv_core::{CheckResult, Provider};
use metrics::{counter, histogram};

/// Metric names recorded by the engine.
pub mod names {
    pub const CHECKS_TOTAL: &str = "dv_checks_total";
    pub const CHECK_DURATION: &str = "dv_check_duration_seconds";
    pub const CHECK_RETRIES: &str = "dv_check_retries_total";
    pub const RUNS_TOTAL: &str = "dv_runs_total";
    pub const ISSUES_TOTAL: &str = "dv_issues_total";
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AnalysisTelemetry;

impl AnalysisTelemetry {
    pub fn new() -> Self {
        Self
    }

    pub fn record_check(&self, provider: Provider, result: &CheckResult) {
        let status = if result.failed {
            "failed"
        } else if result.is_from_cache() {
            "cached"
        } else {
            "computed"
        };
        let labels = [
            ("provider", provider.as_str().to_string()),
            ("check", result.check.clone()),
            ("status", status.to_string())
        ];
        counter!(names::CHECKS_TOTAL, &labels).increment(1);

        if !result.is_from_cache() {
            histogram!(names::CHECK_DURATION,
                "provider" => provider.as_str(),
                "check" => result.check.clone()
            )
            .record(result.elapsed.as_secs_f64());
        }

        for issue in &result.issues {
            counter!(names::ISSUES_TOTAL,
                "check" => result.check.clone(),
                "severity" => issue.severity.to_string()
            )
            .increment(1);
        }
    }

    pub fn record_retry(&self, provider: Provider, check: &str) {
        counter!(names::CHECK_RETRIES,
            "provider" => provider.as_str(),
            "check" => check.to_string()
        )
        .increment(1);
    }

    /// `outcome` is one of `done`, `failed` or `abandoned`.
    pub fn record_run(&self, provider: Option<Provider>, outcome: &'static str) {
        let provider = provider.map_or("unknown", |p| p.as_str());
        counter!(names::RUNS_TOTAL, "provider" => provider, "outcome" => outcome).increment(1);
    }
}
