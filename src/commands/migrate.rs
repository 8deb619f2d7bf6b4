use crate::config::{AppConfig, MigrateConfig};
use crate::rewrite::imports::migrate_file;
use crate::utils::{SourceFilter, collect_source_files};
use anyhow::{Context, Result, bail};
use std::path::Path;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub scanned: usize,
    pub files_updated: usize,
    pub changes: usize,
    /// Files that could not be read or written; the walk goes on without them.
    pub failed: usize,
}

/// Execute the migrate command
pub fn migrate(config: Option<&str>, dry_run: bool) -> Result<()> {
    let cfg = AppConfig::load(config.map(Path::new)).context("failed to load config")?;
    if cfg.migrate.mappings.is_empty() {
        tracing::warn!("no [[migrate.mapping]] entries configured, nothing to do");
        return Ok(());
    }
    tracing::info!(
        mappings = cfg.migrate.mappings.len(),
        dry_run,
        "migration start"
    );
    let stats = migrate_tree(&cfg.migrate, dry_run)?;
    tracing::info!(
        "migration complete: scanned={}, files updated={}, import changes={}, failed={}",
        stats.scanned,
        stats.files_updated,
        stats.changes,
        stats.failed
    );
    if stats.failed > 0 {
        bail!(
            "migration incomplete: {} of {} files could not be migrated",
            stats.failed,
            stats.scanned
        );
    }
    Ok(())
}

pub fn migrate_tree(cfg: &MigrateConfig, dry_run: bool) -> Result<MigrationStats> {
    let filter = SourceFilter::new(&cfg.extensions).skip_dirs(&cfg.skip_dirs);
    let mut stats = MigrationStats::default();
    for root in &cfg.roots {
        if !root.exists() {
            tracing::warn!("skipping missing root {}", root.display());
            continue;
        }
        let files = collect_source_files(root, &filter)?;
        stats.scanned += files.len();
        for file in files {
            let changes = match migrate_file(&file, &cfg.mappings, dry_run) {
                Ok(changes) => changes,
                Err(e) => {
                    tracing::warn!("migrating {} failed: {:#}", file.display(), e);
                    stats.failed += 1;
                    continue;
                }
            };
            if changes > 0 {
                tracing::info!("updated: {} ({} changes)", file.display(), changes);
                stats.files_updated += 1;
                stats.changes += changes;
            }
        }
    }
    Ok(stats)
}
