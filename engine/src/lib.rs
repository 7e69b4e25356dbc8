//! # Analysis Engine
//!
//! Runs the configured checks of a discharge summary concurrently against one
//! model provider, consulting the result cache first, and streams the outcome
//! as [`AnalysisEvent`]s.
//!
//! A run always ends with exactly one terminal event: `analysis_complete`
//! when every check resolved, or `error` when the request was rejected or a
//! provider turned out to be misconfigured.

pub mod aggregate;
pub mod check;
pub mod events;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod telemetry;

pub use aggregate::{AnalysisSummary, CheckSummary, progress_percent};
pub use check::{CallPolicy, CheckUnit};
pub use events::{AnalysisEvent, CheckCompletePayload, ErrorPayload, EventChannel, StartedPayload};
pub use orchestrator::{AnalysisRequest, Orchestrator, RunOutcome, RunState};
pub use prompts::BuiltinPrompts;
pub use report::RunReport;
pub use telemetry::AnalysisTelemetry;
