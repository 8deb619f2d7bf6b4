use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub mod consolidate;
pub mod dedupe;
pub mod imports;

/// Write `updated` over `path` unless it equals `original` or this is a dry
/// run. Returns whether the content differs.
pub fn write_if_changed(path: &Path, original: &str, updated: &str, dry_run: bool) -> Result<bool> {
    if original == updated {
        return Ok(false);
    }
    if dry_run {
        tracing::debug!("dry-run: would rewrite {}", path.display());
    } else {
        fs::write(path, updated).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(true)
}
