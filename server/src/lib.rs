//! # Discharge Validator Server
//!
//! HTTP server that streams analysis runs to clients as Server-Sent Events.
//!
//! ## Endpoints
//!
//! - `POST /api/analyze/stream` - Analyze a document, streaming SSE events
//! - `GET /api/cache/stats` - Result cache statistics
//! - `POST /api/cache/clear` - Drop every cached result
//! - `GET /api/report/latest` - Plain-text report of the latest completed run
//! - `GET /api/report/download` - Same report as an attachment
//! - `GET /health` - Cache connectivity and configured providers
//! - `GET /metrics` - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod sse;
pub mod state;

pub use error::ServerError;
pub use routes::create_router;
pub use server::{DischargeValidatorServer, install_metrics_recorder, run_server};
pub use state::AppState;
