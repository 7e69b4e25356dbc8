//! Shared test fixtures for the Discharge Validator workspace.
//!
//! Provides a single shared Redis testcontainer per test process, lazily
//! started and cleaned up when the process exits, plus sample documents.

mod fixtures;

pub use fixtures::*;
