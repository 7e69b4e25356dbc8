//! Runs every enabled check for one document and streams the outcome.

use crate::aggregate::{AnalysisSummary, progress_percent};
use crate::check::{CallPolicy, CheckUnit};
use crate::events::{AnalysisEvent, CheckCompletePayload, EventChannel, StartedPayload};
use crate::prompts::BuiltinPrompts;
use crate::report::RunReport;
use crate::telemetry::AnalysisTelemetry;
use cache::ResultCache;
use chrono::Utc;
use dv_core::{CheckResult, Document, PromptSource, Provider};
use errors::{ErrorKind, RunError, ValidationError};
use llm::GatewayRegistry;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;

/// Request body of `POST /api/analyze/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisRequest {
    pub content: String,
    #[serde(alias = "llm_provider")]
    pub provider: String
}

impl AnalysisRequest {
    pub fn new(content: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            provider: provider.into()
        }
    }
}

/// Lifecycle of a [`RequestRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RunState {
    Pending,
    Running,
    Completing,
    Done,
    Failed
}

impl RunState {
    fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Pending, RunState::Running)
                | (RunState::Pending, RunState::Failed)
                | (RunState::Running, RunState::Completing)
                | (RunState::Running, RunState::Failed)
                | (RunState::Completing, RunState::Done)
        )
    }
}

/// How a run ended, as seen by the caller of [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: String,
    pub state: RunState,
    /// The subscriber left before the terminal event.
    pub abandoned: bool,
    pub summary: Option<AnalysisSummary>,
    pub error: Option<ErrorKind>
}

/// Live state of one submission.
struct RequestRun {
    run_id: String,
    provider: Option<Provider>,
    state: RunState,
    total: usize,
    results: Vec<CheckResult>,
    started: Instant
}

impl RequestRun {
    fn new() -> Self {
        Self {
            run_id: utils::generate_run_id(),
            provider: None,
            state: RunState::Pending,
            total: 0,
            results: Vec::new(),
            started: Instant::now()
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid run transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Run state changed");
        self.state = next;
    }

    /// Records a resolved check and returns its event payload.
    fn record(&mut self, result: CheckResult) -> CheckCompletePayload {
        self.results.push(result);
        let progress = progress_percent(self.results.len(), self.total);
        let latest = &self.results[self.results.len() - 1];
        CheckCompletePayload::from_result(latest, progress)
    }

    fn is_resolved(&self) -> bool {
        self.results.len() >= self.total
    }

    fn outcome(
        &self,
        abandoned: bool,
        summary: Option<AnalysisSummary>,
        error: Option<ErrorKind>
    ) -> RunOutcome {
        RunOutcome {
            run_id: self.run_id.clone(),
            state: self.state,
            abandoned,
            summary,
            error
        }
    }
}

/// Everything a run needs once its request has been admitted.
struct Admitted {
    provider: Provider,
    document: Document,
    units: Vec<CheckUnit>
}

/// Fans a document out to the enabled checks and aggregates their results.
///
/// Cheap to clone; clones share the registry, the cache and the latest report.
#[derive(Clone)]
pub struct Orchestrator {
    registry: GatewayRegistry,
    prompts: Arc<dyn PromptSource>,
    cache: Arc<ResultCache>,
    checks: Arc<[String]>,
    policy: CallPolicy,
    max_document_bytes: usize,
    telemetry: AnalysisTelemetry,
    latest_report: Arc<RwLock<Option<RunReport>>>
}

impl Orchestrator {
    pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 200_000;

    /// Orchestrator over the built-in prompts and checks.
    pub fn new(registry: GatewayRegistry, cache: Arc<ResultCache>) -> Self {
        Self {
            registry,
            prompts: Arc::new(BuiltinPrompts),
            cache,
            checks: config::BUILTIN_CHECKS.iter().map(|c| c.to_string()).collect(),
            policy: CallPolicy::default(),
            max_document_bytes: Self::DEFAULT_MAX_DOCUMENT_BYTES,
            telemetry: AnalysisTelemetry::new(),
            latest_report: Arc::new(RwLock::new(None))
        }
    }

    pub fn from_config(
        config: &config::AnalysisConfig,
        registry: GatewayRegistry,
        cache: Arc<ResultCache>
    ) -> Self {
        Self::new(registry, cache)
            .with_checks(config.checks.clone())
            .with_policy(CallPolicy::from_config(config))
            .with_max_document_bytes(config.max_document_bytes)
    }

    pub fn with_prompts(mut self, prompts: Arc<dyn PromptSource>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_checks(mut self, checks: Vec<String>) -> Self {
        self.checks = checks.into();
        self
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_document_bytes(mut self, max: usize) -> Self {
        self.max_document_bytes = max;
        self
    }

    pub fn checks(&self) -> &[String] {
        &self.checks
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn registry(&self) -> &GatewayRegistry {
        &self.registry
    }

    /// Report of the most recent run that reached `analysis_complete`.
    pub fn latest_report(&self) -> Option<RunReport> {
        self.latest_report.read().ok().and_then(|guard| guard.clone())
    }

    /// Rendered [`Orchestrator::latest_report`].
    pub fn latest_report_text(&self) -> Option<String> {
        self.latest_report().map(|report| report.render(&self.checks))
    }

    /// Starts a run in the background and returns its event stream.
    pub fn submit(&self, request: AnalysisRequest) -> mpsc::Receiver<AnalysisEvent> {
        let capacity = EventChannel::DEFAULT_CAPACITY.max(self.checks.len() + 2);
        let (channel, events) = EventChannel::pair(capacity);
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run(request, channel).await;
        });
        events
    }

    /// Drives one request to a terminal state, emitting events on `channel`.
    pub async fn run(&self, request: AnalysisRequest, mut channel: EventChannel) -> RunOutcome {
        let mut run = RequestRun::new();
        let span = tracing::info_span!(
            "analysis_run",
            run_id = %run.run_id,
            provider = %request.provider
        );

        async move {
            let outcome = self.drive(&mut run, request, &mut channel).await;
            let label = match (outcome.abandoned, outcome.state) {
                (true, _) => "abandoned",
                (false, RunState::Done) => "done",
                _ => "failed"
            };
            self.telemetry.record_run(run.provider, label);
            tracing::info!(
                state = %outcome.state,
                abandoned = outcome.abandoned,
                checks_completed = run.results.len(),
                "Analysis run finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        run: &mut RequestRun,
        request: AnalysisRequest,
        channel: &mut EventChannel
    ) -> RunOutcome {
        let admitted = match self.admit(request) {
            Ok(admitted) => admitted,
            Err(err) => {
                tracing::warn!(error = %err, kind = %err.kind(), "Run rejected");
                run.transition(RunState::Failed);
                let delivered = channel.emit(AnalysisEvent::error(err.kind(), err.to_string())).await;
                return run.outcome(!delivered, None, Some(err.kind()));
            }
        };

        run.provider = Some(admitted.provider);
        run.total = admitted.units.len();
        run.transition(RunState::Running);

        let started = AnalysisEvent::Started(StartedPayload {
            run_id: run.run_id.clone(),
            total_checks: run.total,
            provider: admitted.provider,
            checks: admitted.units.iter().map(|u| u.name().to_string()).collect()
        });
        if !channel.emit(started).await {
            return run.outcome(true, None, None);
        }

        let mut completions = self.launch(admitted.units, admitted.document.clone());

        while !run.is_resolved() {
            let message = tokio::select! {
                biased;
                message = completions.recv() => message,
                () = channel.closed() => {
                    channel.mark_abandoned();
                    return run.outcome(true, None, None);
                }
            };

            let result = match message {
                Some((_, Ok(result))) => result,
                Some((check, Err(err))) => {
                    tracing::error!(check = %check, error = %err, "Run failed on configuration error");
                    run.transition(RunState::Failed);
                    let delivered = channel.emit(AnalysisEvent::error(err.kind(), err.to_string())).await;
                    return run.outcome(!delivered, None, Some(err.kind()));
                }
                None => {
                    // a check task died without reporting
                    let missing = self.unreported_check(run);
                    tracing::error!(check = %missing, "Check task ended without a result");
                    CheckResult::degraded(missing, ErrorKind::Transient, run.started.elapsed())
                }
            };

            self.telemetry.record_check(admitted.provider, &result);
            let payload = run.record(result);
            if !channel.emit(AnalysisEvent::CheckComplete(payload)).await {
                return run.outcome(true, None, None);
            }
        }

        run.transition(RunState::Completing);
        let summary = AnalysisSummary::from_results(&run.results, run.total, run.started.elapsed());
        self.store_report(run, &admitted.document, &summary);

        let delivered = channel.emit(AnalysisEvent::AnalysisComplete(summary.clone())).await;
        run.transition(RunState::Done);
        run.outcome(!delivered, Some(summary), None)
    }

    /// Validates the request and resolves everything the run needs.
    fn admit(&self, request: AnalysisRequest) -> Result<Admitted, RunError> {
        let provider = Provider::from_str(request.provider.trim()).map_err(|_| {
            ValidationError::UnknownProvider {
                provider: request.provider.clone()
            }
        })?;

        let document = Document::new(request.content);
        document.validate(self.max_document_bytes)?;

        let gateway = self.registry.get(provider)?;
        let units = self
            .checks
            .iter()
            .map(|check| -> Result<CheckUnit, RunError> {
                let instructions = self.prompts.instructions(provider, check).ok_or_else(|| {
                    RunError::MissingInstructions {
                        check: check.clone(),
                        provider: provider.to_string()
                    }
                })?;
                Ok(CheckUnit::new(
                    check.clone(),
                    instructions,
                    gateway.clone(),
                    self.cache.clone(),
                    self.policy
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Admitted {
            provider,
            document,
            units
        })
    }

    /// Spawns one task per check. Tasks outlive the run if it is abandoned.
    fn launch(
        &self,
        units: Vec<CheckUnit>,
        document: Document
    ) -> mpsc::Receiver<(String, Result<CheckResult, RunError>)> {
        let (tx, rx) = mpsc::channel(units.len().max(1));
        for unit in units {
            let tx = tx.clone();
            let document = document.clone();
            tokio::spawn(
                async move {
                    let result = unit.run(&document).await;
                    // the run may already be over
                    let _ = tx.send((unit.name().to_string(), result)).await;
                }
                .in_current_span()
            );
        }
        rx
    }

    fn unreported_check(&self, run: &RequestRun) -> String {
        self.checks
            .iter()
            .find(|check| !run.results.iter().any(|r| &r.check == *check))
            .cloned()
            .unwrap_or_default()
    }

    fn store_report(&self, run: &RequestRun, document: &Document, summary: &AnalysisSummary) {
        let Some(provider) = run.provider else {
            return;
        };
        let report = RunReport {
            run_id: run.run_id.clone(),
            provider,
            generated_at: Utc::now(),
            content_hash: utils::compute_content_hash(document.content()),
            summary: summary.clone(),
            results: run.results.clone()
        };
        match self.latest_report.write() {
            Ok(mut latest) => *latest = Some(report),
            Err(e) => tracing::warn!(error = %e, "Could not store latest report")
        }
    }
}
