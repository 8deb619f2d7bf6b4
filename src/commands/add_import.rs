use crate::rewrite::imports::{ImportInsertion, add_import_file, import_statement};
use anyhow::{Result, bail};
use std::path::Path;

/// Execute the add-import command
pub fn add_import(uri: &str, files: &[String], dry_run: bool) -> Result<()> {
    let statement = import_statement(uri);
    let (added, failed) = add_import_to_files(&statement, files, dry_run);
    tracing::info!(
        "added {} to {}/{} files{}",
        statement,
        added,
        files.len(),
        if dry_run { " (dry-run)" } else { "" }
    );
    if failed > 0 {
        bail!("{} of {} files could not be updated", failed, files.len());
    }
    Ok(())
}

/// Returns (files updated, files that failed). Every file is attempted.
pub fn add_import_to_files(statement: &str, files: &[String], dry_run: bool) -> (usize, usize) {
    let mut added = 0usize;
    let mut failed = 0usize;
    for file in files {
        match add_import_file(Path::new(file), statement, dry_run) {
            Ok(ImportInsertion::Inserted(_)) => {
                tracing::info!("updated: {}", file);
                added += 1;
            }
            Ok(ImportInsertion::AlreadyPresent) => tracing::debug!("already imported: {}", file),
            Ok(ImportInsertion::NoImports) => tracing::warn!("no imports found in {}, skipped", file),
            Err(e) => {
                tracing::warn!("{:#}", e);
                failed += 1;
            }
        }
    }
    (added, failed)
}
