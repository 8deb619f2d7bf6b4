use anyhow::{Context, Result, bail};
use glob::Pattern;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Which files a tree walk should yield.
#[derive(Debug, Default)]
pub struct SourceFilter {
    pub extensions: Vec<String>,
    /// Directory names that are never descended into.
    pub skip_dirs: Vec<String>,
    /// Glob patterns matched against the path relative to the walk root.
    pub exclude: Vec<Pattern>,
}

impl SourceFilter {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.to_vec(),
            ..Self::default()
        }
    }

    pub fn skip_dirs(mut self, dirs: &[String]) -> Self {
        self.skip_dirs = dirs.to_vec();
        self
    }

    pub fn exclude(mut self, globs: &[String]) -> Result<Self> {
        self.exclude = globs
            .iter()
            .map(|g| Pattern::new(g).with_context(|| format!("invalid exclude pattern {:?}", g)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    fn wants(&self, root: &Path, path: &Path) -> bool {
        let ext_ok = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|e| self.extensions.iter().any(|x| x == e));
        if !ext_ok {
            return false;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        let rel = rel.to_string_lossy().replace('\\', "/");
        !self.exclude.iter().any(|p| p.matches(&rel))
    }
}

/// Collect matching files under `root`, sorted for deterministic output.
pub fn collect_source_files(root: &Path, filter: &SourceFilter) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("{} does not exist", root.display());
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !filter
                .skip_dirs
                .iter()
                .any(|d| e.file_name() == OsStr::new(d))
    });
    for entry in walker.filter_map(Result::ok) {
        let path = entry.path();
        if entry.file_type().is_file() && filter.wants(root, path) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    tracing::debug!("collected {} files under {}", files.len(), root.display());
    Ok(files)
}

/// Path as displayed in reports: relative to `root` when possible.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
