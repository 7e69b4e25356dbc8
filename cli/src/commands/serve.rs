use anyhow::{Context, Result};
use clap::Args;
use config::Config;

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address (overrides server.host / API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides server.port / API_PORT)
    #[arg(long, short)]
    pub port: Option<u16>
}

pub async fn run(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    server::run_server(config)
        .await
        .context("Server terminated with an error")
}
