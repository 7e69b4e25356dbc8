use anyhow::Result;
use clap::Args;
use colored::Colorize;
use config::Config;
use dv_core::{ModelGateway, Provider};
use llm::GatewayRegistry;

use crate::output;

#[derive(Args)]
pub struct ProvidersArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(args: ProvidersArgs, config: Config) -> Result<()> {
    let registry = GatewayRegistry::from_config(&config.providers);

    let mut statuses = Vec::with_capacity(Provider::ALL.len());
    for provider in Provider::ALL {
        let healthy = match registry.get(provider) {
            Ok(gateway) => Some(gateway.health_check().await),
            Err(_) => None
        };
        statuses.push((provider, healthy));
    }

    if args.json {
        let body: serde_json::Map<_, _> = statuses
            .iter()
            .map(|(provider, healthy)| {
                (
                    provider.to_string(),
                    serde_json::json!({
                        "configured": healthy.is_some(),
                        "healthy": healthy.unwrap_or(false)
                    })
                )
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    output::header("Model Providers");
    for (provider, healthy) in &statuses {
        let status = match healthy {
            Some(true) => "reachable".green(),
            Some(false) => "unreachable".red(),
            None => "not configured".dimmed()
        };
        println!("  {:<8} {status}", provider.as_str());
    }

    if statuses.iter().all(|(_, healthy)| healthy.is_none()) {
        println!();
        output::hint("Set GEMINI_API_KEY or ANTHROPIC_API_KEY to enable a provider");
    }

    Ok(())
}
