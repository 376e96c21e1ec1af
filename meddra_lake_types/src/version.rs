//! Normalization of raw MedDRA version tokens into the canonical
//! `<major>.<minor>` partition key.
//!
//! The converter applies this to data column values and the discoverer
//! applies it to storage folder tokens. Both sides must produce bit-identical
//! strings for the same logical version, so there is exactly one
//! implementation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CANONICAL_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

/// A version token that could not be reduced to canonical form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("version token {token:?} does not reduce to <major>.<minor>")]
pub struct InvalidVersion {
    /// The raw token as received, before any stripping.
    pub token: String,
}

/// A normalized `<major>.<minor>` version string, e.g. `26.1`.
///
/// This is the partition key for the whole system. It is produced by string
/// surgery only, never by numeric parsing, so `5.10` and `5.1` stay distinct
/// and no locale or float rounding can change the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalVersion(String);

impl CanonicalVersion {
    /// Normalize a raw version token.
    ///
    /// Strips every character that is not an ASCII digit or `.`, appends
    /// `.0` when the remainder has no dot, and accepts only a full
    /// `^\d+(\.\d+)?$` match. Tokens like `"v5"` become `5.0`; `"5.1"` stays
    /// `5.1`; `"abc"`, `""`, `"5."` and `"1.2.3"` are rejected.
    pub fn normalize(token: &str) -> Result<Self, InvalidVersion> {
        let stripped: String = token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let candidate = if stripped.contains('.') {
            stripped
        } else {
            format!("{stripped}.0")
        };

        if CANONICAL_VERSION_RE.is_match(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(InvalidVersion {
                token: token.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
