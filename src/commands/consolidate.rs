use crate::config::{AppConfig, ConsolidateConfig};
use crate::rewrite::consolidate::Consolidator;
use crate::rewrite::write_if_changed;
use crate::utils::{SourceFilter, collect_source_files, display_path};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// Execute the consolidate command
pub fn consolidate(config: Option<&str>, path: Option<&str>, dry_run: bool) -> Result<()> {
    let mut cfg = AppConfig::load(config.map(Path::new)).context("failed to load config")?;
    if let Some(p) = path {
        cfg.consolidate.root = PathBuf::from(p);
    }
    let stats = consolidate_tree(&cfg.consolidate, dry_run)?;
    tracing::info!(
        "consolidated {} imports in {} files{}",
        stats.imports_folded,
        stats.files_updated,
        if dry_run { " (dry-run)" } else { "" }
    );
    if stats.failed > 0 {
        bail!(
            "consolidation incomplete: {} files could not be rewritten",
            stats.failed
        );
    }
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConsolidateStats {
    pub files_updated: usize,
    pub imports_folded: usize,
    pub failed: usize,
}

pub fn consolidate_tree(cfg: &ConsolidateConfig, dry_run: bool) -> Result<ConsolidateStats> {
    let consolidator = Consolidator::new(cfg)?;
    tracing::debug!("barrel import: {}", consolidator.barrel());
    let filter = SourceFilter::new(&["dart".to_string()]);
    let files = collect_source_files(&cfg.root, &filter)?;

    let mut stats = ConsolidateStats::default();
    for file in files {
        let rel = display_path(&cfg.root, &file);
        if consolidator.should_skip(&rel) {
            tracing::trace!("skip {}", rel);
            continue;
        }
        let content = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("failed to read {}: {}", file.display(), e);
                stats.failed += 1;
                continue;
            }
        };
        let Some((updated, count)) = consolidator.consolidate_text(&content) else {
            continue;
        };
        match write_if_changed(&file, &content, &updated, dry_run) {
            Ok(true) => {
                tracing::info!("{} ({} imports consolidated)", rel, count);
                stats.files_updated += 1;
                stats.imports_folded += count;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("{:#}", e);
                stats.failed += 1;
            }
        }
    }
    Ok(stats)
}
