use crate::rewrite::dedupe::dedupe_method;
use crate::rewrite::write_if_changed;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Execute the dedupe command
pub fn dedupe(method: &str, files: &[String], dry_run: bool) -> Result<()> {
    let mut total = 0usize;
    for file in files {
        total += dedupe_file(Path::new(file), method, dry_run)?;
    }
    tracing::info!(
        "removed {} duplicate definitions of {} across {} files",
        total,
        method,
        files.len()
    );
    Ok(())
}

/// Returns the number of duplicates removed from `path`.
pub fn dedupe_file(path: &Path, method: &str, dry_run: bool) -> Result<usize> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let outcome =
        dedupe_method(&content, method).with_context(|| format!("in {}", path.display()))?;
    tracing::debug!(
        "{}: {} definitions of {}",
        path.display(),
        outcome.found,
        method
    );
    for line in &outcome.removed {
        tracing::info!("{}: removing duplicate {} at line {}", path.display(), method, line);
    }
    write_if_changed(path, &content, &outcome.text, dry_run)?;
    Ok(outcome.removed.len())
}
