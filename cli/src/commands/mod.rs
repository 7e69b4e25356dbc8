pub mod analyze;
pub mod completion;
pub mod providers;
pub mod serve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use dv_core::Provider;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "dischargeval",
    author,
    version,
    about = "Discharge Validator - LLM-backed discharge summary checks",
    long_about = "Runs linguistic, structural, terminology and safety checks on discharge \
                  summaries against Gemini or Claude.\n\nConfiguration comes from an optional \
                  TOML/YAML file, overridden by environment variables such as GEMINI_API_KEY, \
                  ANTHROPIC_API_KEY and REDIS_ENABLED."
)]
pub struct Cli {
    /// Configuration file (TOML or YAML)
    #[arg(long, short, global = true, env = "DV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (overrides the configured level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP/SSE server")]
    Serve(serve::ServeArgs),

    #[command(about = "Analyze a discharge summary file and print the results")]
    Analyze(analyze::AnalyzeArgs),

    #[command(about = "Test the connection to every configured provider")]
    Providers(providers::ProvidersArgs),

    #[command(about = "Generate shell completions")]
    Completion(completion::CompletionArgs)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderChoice {
    Gemini,
    Claude
}

impl From<ProviderChoice> for Provider {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Gemini => Provider::Gemini,
            ProviderChoice::Claude => Provider::Claude
        }
    }
}

/// Loads and validates the effective configuration.
pub fn load(path: Option<&Path>) -> Result<Config> {
    config::load_config(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Invalid configuration".to_string()
    })
}
