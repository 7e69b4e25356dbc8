//! Events emitted by an analysis run and the channel that relays them.

use crate::aggregate::AnalysisSummary;
use dv_core::{CheckResult, Issue, Provider};
use errors::ErrorKind;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedPayload {
    pub run_id: String,
    pub total_checks: usize,
    pub provider: Provider,
    pub checks: Vec<String>
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckCompletePayload {
    pub check_name: String,
    pub issues: Vec<Issue>,
    pub from_cache: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<ErrorKind>,
    pub elapsed_seconds: f64,
    pub progress_percent: f64
}

impl CheckCompletePayload {
    pub fn from_result(result: &CheckResult, progress_percent: f64) -> Self {
        Self {
            check_name: result.check.clone(),
            issues: result.issues.clone(),
            from_cache: result.is_from_cache(),
            failed: result.failed,
            failure_kind: result.failure,
            elapsed_seconds: round2(result.elapsed.as_secs_f64()),
            progress_percent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub kind: ErrorKind
}

/// One server-sent event of an analysis run.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Started(StartedPayload),
    CheckComplete(CheckCompletePayload),
    AnalysisComplete(AnalysisSummary),
    Error(ErrorPayload)
}

impl AnalysisEvent {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            kind
        })
    }

    /// SSE `event:` name.
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisEvent::Started(_) => "started",
            AnalysisEvent::CheckComplete(_) => "check_complete",
            AnalysisEvent::AnalysisComplete(_) => "analysis_complete",
            AnalysisEvent::Error(_) => "error"
        }
    }

    /// SSE `data:` body.
    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            AnalysisEvent::Started(p) => serde_json::to_string(p),
            AnalysisEvent::CheckComplete(p) => serde_json::to_string(p),
            AnalysisEvent::AnalysisComplete(p) => serde_json::to_string(p),
            AnalysisEvent::Error(p) => serde_json::to_string(p)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisEvent::AnalysisComplete(_) | AnalysisEvent::Error(_)
        )
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Single-subscriber relay of run events, in emission order.
///
/// Once the subscriber goes away the channel is marked abandoned and every
/// later emit is dropped.
pub struct EventChannel {
    sender: mpsc::Sender<AnalysisEvent>,
    abandoned: bool
}

impl EventChannel {
    /// Room for a full run of five checks plus the bracketing events.
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new(sender: mpsc::Sender<AnalysisEvent>) -> Self {
        Self {
            sender,
            abandoned: false
        }
    }

    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<AnalysisEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Delivers `event`, returning `false` once the subscriber is gone.
    pub async fn emit(&mut self, event: AnalysisEvent) -> bool {
        if self.abandoned {
            return false;
        }
        if self.sender.send(event).await.is_err() {
            self.mark_abandoned();
        }
        !self.abandoned
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Resolves once the subscriber has dropped its receiver.
    pub async fn closed(&self) {
        self.sender.closed().await;
    }

    pub(crate) fn mark_abandoned(&mut self) {
        if !self.abandoned {
            tracing::info!("Event subscriber disconnected, abandoning run");
            self.abandoned = true;
        }
    }
}
