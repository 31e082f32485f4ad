use std::path::PathBuf;

use crate::error::ResolveError;

/// Validates and normalizes a configured override path.
///
/// `~` is expanded, the path must exist, and the result is canonicalized
/// so later comparisons and launches see one stable form.
pub fn resolve_override(raw: &str) -> Result<PathBuf, ResolveError> {
    if raw.trim().is_empty() {
        return Err(ResolveError::config("override path is empty"));
    }
    let expanded = ltexb_util::expand_user(raw);
    if !expanded.exists() {
        return Err(ResolveError::bad_override(&expanded, "does not exist"));
    }
    expanded
        .canonicalize()
        .map_err(|e| ResolveError::bad_override(&expanded, &format!("cannot be resolved: {e}")))
}
