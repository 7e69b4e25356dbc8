//! Server setup and lifecycle.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::error::{Result, ServerError};
use crate::routes::create_router;
use crate::state::AppState;
use config::Config;

/// The Discharge Validator HTTP server.
pub struct DischargeValidatorServer {
    state: Arc<AppState>
}

impl DischargeValidatorServer {
    /// Builds the application state from `config`.
    ///
    /// Installs the global Prometheus recorder when metrics are enabled, so at
    /// most one server with metrics can be created per process.
    pub async fn new(config: Config) -> Result<Self> {
        let metrics_enabled = config.observability.metrics_enabled;
        let mut state = AppState::new(config).await;
        if metrics_enabled {
            state = state.with_metrics(install_metrics_recorder()?);
        }
        Ok(Self::with_state(Arc::new(state)))
    }

    /// Creates a server instance from an existing `AppState`.
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Runs the HTTP server until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let server = &self.state.config.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| ServerError::Configuration(format!("Invalid address: {e}")))?;

        let router = create_router(self.state.clone());

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!(
            %addr,
            checks = ?self.state.orchestrator.checks(),
            providers = ?self.state.orchestrator.registry().configured(),
            cache = self.state.orchestrator.cache().backend_kind(),
            "Discharge Validator server starting"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {e}")))?;

        tracing::info!("Discharge Validator server stopped");
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

/// Installs the process-wide Prometheus recorder.
pub fn install_metrics_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Creates and runs the server.
pub async fn run_server(config: Config) -> Result<()> {
    DischargeValidatorServer::new(config).await?.run().await
}
