use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use cache::ResultCache;
use clap::Args;
use config::Config;
use dv_core::{PlainTextExtractor, Provider, TextExtractor};
use engine::{AnalysisEvent, AnalysisRequest, Orchestrator};
use llm::GatewayRegistry;

use super::ProviderChoice;
use crate::output;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Discharge summary to analyze (UTF-8 text)
    pub file: PathBuf,

    /// Model provider to run the checks with
    #[arg(long, short, value_enum, default_value = "gemini")]
    pub provider: ProviderChoice,

    /// Print every event as a JSON line instead of a formatted summary
    #[arg(long)]
    pub json: bool,

    /// Write the plain-text report to this path after a completed run
    #[arg(long)]
    pub report: Option<PathBuf>
}

pub async fn run(args: AnalyzeArgs, config: Config) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let file_name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = PlainTextExtractor
        .extract(&file_name, bytes)
        .map_err(|e| anyhow::anyhow!("VALIDATION: {e}"))?;

    let provider = Provider::from(args.provider);
    let cache = Arc::new(ResultCache::from_config(&config.cache).await);
    let registry = GatewayRegistry::from_config(&config.providers);
    let orchestrator = Orchestrator::from_config(&config.analysis, registry, cache);

    tracing::debug!(file = %args.file.display(), %provider, "Submitting analysis");
    let mut events = orchestrator.submit(AnalysisRequest::new(content, provider.as_str()));

    let mut failure = None;
    while let Some(event) = events.recv().await {
        if args.json {
            println!(
                "{}",
                serde_json::json!({
                    "event": event.name(),
                    "data": serde_json::from_str::<serde_json::Value>(&event.data()?)?
                })
            );
        } else {
            print_event(&event);
        }
        if let AnalysisEvent::Error(payload) = &event {
            failure = Some(format!("{}: {}", payload.kind, payload.message));
        }
    }

    if let Some(message) = failure {
        bail!(message);
    }

    if let Some(path) = &args.report {
        let text = orchestrator
            .latest_report_text()
            .context("Run finished without a report")?;
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if !args.json {
            output::info(&format!("Report written to {}", path.display()));
        }
    }

    Ok(())
}

fn print_event(event: &AnalysisEvent) {
    match event {
        AnalysisEvent::Started(started) => {
            output::header(&format!(
                "Analyzing with {} ({} checks)",
                started.provider, started.total_checks
            ));
            output::info(&format!("run {}", started.run_id));
            println!();
        }
        AnalysisEvent::CheckComplete(check) => output::print_check(check),
        AnalysisEvent::AnalysisComplete(summary) => output::print_summary(summary),
        AnalysisEvent::Error(_) => {}
    }
}
