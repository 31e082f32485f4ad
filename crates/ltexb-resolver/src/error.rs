use std::path::Path;

use thiserror::Error;

/// Errors surfaced by the resolution pipeline.
///
/// Placement collisions are deliberately absent: an already-occupied
/// destination is logged and treated as success (see `extract::place`).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// An override path or static platform table entry is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection failure, non-2xx status, or a malformed redirect.
    #[error("network error: {0}")]
    Network(String),

    /// Downloaded artifact does not match its expected SHA-256 digest.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// Unrecognized archive format or an archive without a payload root.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Failure spawning or supervising a child process.
    #[error("process error: {0}")]
    Process(String),

    /// Every rung of a dependency's resolution ladder failed.
    #[error("could not resolve {dependency} after exhausting all strategies")]
    Exhausted { dependency: &'static str },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ResolveError::Config(msg.into())
    }

    pub(crate) fn network(msg: impl Into<String>) -> Self {
        ResolveError::Network(msg.into())
    }

    pub(crate) fn extraction(msg: impl Into<String>) -> Self {
        ResolveError::Extraction(msg.into())
    }

    pub(crate) fn bad_override(path: &Path, reason: &str) -> Self {
        ResolveError::Config(format!("override {} {}", path.display(), reason))
    }
}
