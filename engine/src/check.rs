//! A single validation concern bound to a gateway and the result cache.

use crate::telemetry::AnalysisTelemetry;
use cache::ResultCache;
use dv_core::{CheckResult, Document, Instructions, IssueDraft, ModelGateway};
use errors::{GatewayError, RunError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::Instrument;

/// Deadline and retry settings for model calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retry_base: Duration,
    pub retry_cap: Duration,
    /// Retries after the first transient failure.
    pub max_retries: u32
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retry_base: Duration::from_millis(500),
            retry_cap: Duration::from_secs(5),
            max_retries: 1
        }
    }
}

impl CallPolicy {
    pub fn from_config(config: &config::AnalysisConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.model_timeout_seconds),
            retry_base: Duration::from_millis(config.retry_base_delay_ms),
            retry_cap: Duration::from_millis(config.retry_max_delay_ms),
            max_retries: 1
        }
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        let cap = self.retry_cap;
        ExponentialBackoff::from_millis(self.retry_base.as_millis().max(1) as u64)
            .map(move |delay| jitter(delay.min(cap)))
    }
}

/// One check of one run: cache first, then the model.
#[derive(Clone)]
pub struct CheckUnit {
    name: String,
    instructions: Instructions,
    gateway: Arc<dyn ModelGateway>,
    cache: Arc<ResultCache>,
    policy: CallPolicy,
    telemetry: AnalysisTelemetry
}

impl CheckUnit {
    pub fn new(
        name: impl Into<String>,
        instructions: Instructions,
        gateway: Arc<dyn ModelGateway>,
        cache: Arc<ResultCache>,
        policy: CallPolicy
    ) -> Self {
        Self {
            name: name.into(),
            instructions,
            gateway,
            cache,
            policy,
            telemetry: AnalysisTelemetry::new()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves the check for `document`.
    ///
    /// Transient and parse failures come back as a failed [`CheckResult`].
    /// Only configuration failures are returned as `Err`.
    pub async fn run(&self, document: &Document) -> Result<CheckResult, RunError> {
        let provider = self.gateway.provider();
        let span = tracing::info_span!("check", check = %self.name, provider = %provider);

        async move {
            let fingerprint = utils::fingerprint(provider, &self.name, document.content());

            if let Some(entry) = self.cache.get(&fingerprint).await {
                tracing::debug!(issues = entry.issues.len(), "Cache hit");
                return Ok(CheckResult::from_cache(&self.name, entry.issues));
            }

            let started = Instant::now();
            match self.call_with_retry(document).await {
                Ok(drafts) => {
                    let elapsed = started.elapsed();
                    let issues: Vec<_> = drafts
                        .into_iter()
                        .map(|draft| draft.into_issue(&self.name))
                        .collect();
                    self.cache.put(&fingerprint, &self.name, &issues, elapsed).await;
                    tracing::info!(
                        issues = issues.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Check computed"
                    );
                    Ok(CheckResult::computed(&self.name, issues, elapsed))
                }
                Err(err) if err.kind().is_run_fatal() => {
                    tracing::error!(error = %err, "Check cannot run");
                    Err(RunError::Gateway {
                        check: self.name.clone(),
                        source: err
                    })
                }
                Err(err) => {
                    tracing::warn!(error = %err, kind = %err.kind(), "Check degraded");
                    Ok(CheckResult::degraded(&self.name, err.kind(), started.elapsed()))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn call_with_retry(&self, document: &Document) -> Result<Vec<IssueDraft>, GatewayError> {
        let mut backoff = self.policy.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.call_once(document).await {
                Ok(drafts) => return Ok(drafts),
                Err(err) => {
                    if !err.is_retryable() || attempt > self.policy.max_retries {
                        return Err(err);
                    }

                    let Some(delay) = backoff.next() else {
                        return Err(err);
                    };
                    self.telemetry.record_retry(self.gateway.provider(), &self.name);
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying model call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn call_once(&self, document: &Document) -> Result<Vec<IssueDraft>, GatewayError> {
        let call = self.gateway.analyze(&self.instructions, document.content());
        match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                provider: self.gateway.provider().to_string(),
                timeout_ms: self.policy.timeout.as_millis() as u64
            })
        }
    }
}
