//! # Model Gateways
//!
//! [`dv_core::ModelGateway`] implementations for Gemini and Claude over their
//! HTTP APIs, a scripted [`MockGateway`], and the provider registry.

pub mod claude;
pub mod gemini;
mod http;
pub mod mock;
pub mod registry;

pub use claude::ClaudeGateway;
pub use gemini::GeminiGateway;
pub use mock::{MockGateway, MockReply};
pub use registry::GatewayRegistry;
