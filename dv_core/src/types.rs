use errors::{ErrorKind, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};

/// Interchangeable model backend a document can be analyzed with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Provider {
    Gemini,
    Claude
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Gemini, Provider::Claude];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Claude => "claude"
        }
    }
}

/// Issue severity. Ordering follows clinical priority: `High > Medium > Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumString,
    Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Severity {
    Low,
    Medium,
    High
}

/// One detected problem in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Name of the check that produced the issue.
    pub category: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub location: String,
    pub current: String,
    pub suggestion: String,
    pub explanation: String
}

/// Where a check result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Origin {
    Cache,
    Computed
}

/// Outcome of one check for one request.
///
/// A failed result carries no issues; `failed` distinguishes it from a check
/// that ran and confirmed the document clean.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub check: String,
    pub issues: Vec<Issue>,
    pub origin: Origin,
    pub elapsed: Duration,
    pub failed: bool,
    pub failure: Option<ErrorKind>
}

impl CheckResult {
    #[must_use]
    pub fn from_cache(check: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            check: check.into(),
            issues,
            origin: Origin::Cache,
            elapsed: Duration::ZERO,
            failed: false,
            failure: None
        }
    }

    #[must_use]
    pub fn computed(check: impl Into<String>, issues: Vec<Issue>, elapsed: Duration) -> Self {
        Self {
            check: check.into(),
            issues,
            origin: Origin::Computed,
            elapsed,
            failed: false,
            failure: None
        }
    }

    #[must_use]
    pub fn degraded(check: impl Into<String>, failure: ErrorKind, elapsed: Duration) -> Self {
        Self {
            check: check.into(),
            issues: Vec::new(),
            origin: Origin::Computed,
            elapsed,
            failed: true,
            failure: Some(failure)
        }
    }

    #[must_use]
    pub fn is_from_cache(&self) -> bool {
        self.origin == Origin::Cache
    }
}

/// Content-addressed cache key: SHA-256 of provider, check and document bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of the hex rendering.
    pub const LEN: usize = 64;

    /// Wraps an already computed hex digest.
    ///
    /// Returns `None` unless `hex` is exactly 64 lowercase hex characters.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        let valid = hex.len() == Self::LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then_some(Self(hex))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document accepted for analysis. Cheap to clone; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    content: Arc<str>
}

impl Document {
    #[must_use]
    pub fn new(content: impl Into<Arc<str>>) -> Self {
        Self {
            content: content.into()
        }
    }

    /// Accepts raw bytes, rejecting anything that is not valid UTF-8.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ValidationError> {
        String::from_utf8(bytes)
            .map(Self::new)
            .map_err(|e| ValidationError::InvalidEncoding {
                valid_up_to: e.utf8_error().valid_up_to()
            })
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks the document against the admission rules of a run.
    pub fn validate(&self, max_bytes: usize) -> Result<(), ValidationError> {
        if self.is_blank() {
            return Err(ValidationError::EmptyDocument);
        }
        if self.len() > max_bytes {
            return Err(ValidationError::DocumentTooLarge {
                length: self.len(),
                max: max_bytes
            });
        }
        Ok(())
    }
}

/// Provider-specific instructions for one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    /// System message, when the provider supports one.
    pub system: Option<String>,
    /// Prompt template with a `{content}` placeholder for the document.
    pub template: String
}

impl Instructions {
    pub const CONTENT_PLACEHOLDER: &'static str = "{content}";

    #[must_use]
    pub fn new(system: Option<String>, template: impl Into<String>) -> Self {
        Self {
            system,
            template: template.into()
        }
    }

    /// Substitutes the document into the template.
    ///
    /// Templates without a placeholder get the document appended.
    #[must_use]
    pub fn render(&self, content: &str) -> String {
        if self.template.contains(Self::CONTENT_PLACEHOLDER) {
            self.template.replace(Self::CONTENT_PLACEHOLDER, content)
        } else {
            format!("{}\n\n{}", self.template, content)
        }
    }
}
