//! # Discharge Validator Core
//!
//! Shared types and traits for the Discharge Validator.
//!
//! This crate provides:
//! - The document, issue and check-result model
//! - The issue-list response schema and its parser
//! - Seams for model providers, prompt templates and text extraction

pub mod response;
pub mod traits;
pub mod types;

pub use response::{IssueDraft, extract_json, parse_issue_list};
pub use traits::{ModelGateway, PlainTextExtractor, PromptSource, TextExtractor};
pub use types::{
    CheckResult, Document, Fingerprint, Instructions, Issue, Origin, Provider, Severity
};
