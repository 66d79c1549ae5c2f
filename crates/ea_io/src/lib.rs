//! crates/ea_io/src/lib.rs
//! File-facing layer of the allocation engine.
//!
//! - `manifest`: which input files make up a run, with optional digests
//! - `loader`: wire JSON → typed `ea_core` records
//! - `canonical_json`: sorted-key compact JSON and atomic writes
//! - `hasher`: SHA-256 digests and `ASG:` / `LOT:` / `RUN:` id builders
//!
//! Offline only: any path carrying a URL scheme is rejected.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod manifest;

/// Unified error for ea_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, fsync).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON parse/serialize errors with a location hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// A single input record is missing a required field or carries a bad value.
    #[error("malformed {kind} record #{index}: {msg}")]
    Record {
        kind: &'static str,
        index: usize,
        msg: String,
    },

    #[error("hash error: {0}")]
    Hash(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    /// Generic validation / invariants.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json keeps no pointer; report line/column instead.
        IoError::Json {
            pointer: format!("line {} column {}", e.line(), e.column()),
            msg: e.to_string(),
        }
    }
}

impl From<manifest::ManifestError> for IoError {
    fn from(e: manifest::ManifestError) -> Self {
        IoError::Manifest(e.to_string())
    }
}

/// True if `s` looks like a URL (any `<scheme>://`, or bare `http:` / `https:`).
#[inline]
pub fn looks_like_url(s: &str) -> bool {
    let t = s.trim();
    t.contains("://") || t.starts_with("http:") || t.starts_with("https:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection() {
        assert!(looks_like_url("https://example.org/students.json"));
        assert!(looks_like_url("file:///tmp/x.json"));
        assert!(looks_like_url(" http:x"));
        assert!(!looks_like_url("inputs/students.json"));
        assert!(!looks_like_url("/abs/path/courses.json"));
    }
}
