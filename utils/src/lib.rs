//! # Discharge Validator Utilities
//!
//! Content fingerprinting and identifier generation.

use dv_core::{Fingerprint, Provider};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const SEPARATOR: [u8; 1] = [0x00];

/// Derive the content-addressed cache key for one check of one document.
///
/// Hashes the provider name, the check name and the exact document bytes,
/// each separated by a NUL byte. No normalization is applied: any byte
/// difference, whitespace included, yields a different fingerprint.
///
/// # Examples
///
/// ```
/// use dv_core::Provider;
/// use utils::fingerprint;
///
/// let key = fingerprint(Provider::Gemini, "linguistic", "Patient stable.");
/// assert_eq!(key.as_str().len(), 64);
/// ```
#[must_use]
pub fn fingerprint(provider: Provider, check: &str, content: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_str().as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(check.as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(content.as_bytes());
    let digest = hex::encode(hasher.finalize());

    match Fingerprint::from_hex(digest) {
        Some(fp) => fp,
        None => unreachable!("sha256 hex digest is always 64 lowercase characters")
    }
}

/// Compute SHA-256 hash of content string
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate UUID v4 string
#[must_use]
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}
