use crate::config::{AppConfig, WidgetsConfig};
use crate::lint::widgets::{WidgetInfo, analyze_widgets};
use crate::utils::{SourceFilter, collect_source_files, display_path};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::OutputFormat;

#[derive(Debug, Serialize)]
pub struct WidgetEntry {
    pub file: String,
    #[serde(flatten)]
    pub widget: WidgetInfo,
}

#[derive(Debug, Serialize)]
pub struct CategoryReport {
    pub name: String,
    pub widgets: Vec<WidgetEntry>,
}

#[derive(Debug, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct CallbackCount {
    #[serde(rename = "type")]
    pub ty: String,
    pub count: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct WidgetSummary {
    pub widgets: usize,
    pub widgets_ok: usize,
    pub widgets_with_issues: usize,
    pub errors: usize,
    /// Most frequent first.
    pub callback_types: Vec<CallbackCount>,
}

#[derive(Debug, Serialize)]
pub struct WidgetReport {
    /// Only categories whose directory exists.
    pub categories: Vec<CategoryReport>,
    pub failures: Vec<FileFailure>,
    pub summary: WidgetSummary,
}

/// Execute the widgets command
pub fn widgets(config: Option<&str>, path: Option<&str>, format: OutputFormat) -> Result<()> {
    let cfg = AppConfig::load(config.map(Path::new)).context("failed to load config")?;
    let root = path
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.widgets.root.clone());
    tracing::info!(root=%root.display(), "widget report start");

    let report = widgets_tree(&root, &cfg.widgets, &cfg.verify.layers)?;
    match format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("failed to serialize report")?;
            println!("{}", json);
        }
    }

    let s = &report.summary;
    if s.errors > 0 {
        bail!(
            "widget verification failed: {} errors, {} of {} widgets with issues",
            s.errors,
            s.widgets_with_issues,
            s.widgets
        );
    }
    tracing::info!("widget verification passed ({} widgets)", s.widgets);
    Ok(())
}

/// Analyze every widget file under each category directory of `root`.
/// Files starting with `_` and `index.dart` barrels are not widgets.
pub fn widgets_tree(root: &Path, cfg: &WidgetsConfig, layers: &[String]) -> Result<WidgetReport> {
    if !root.exists() {
        bail!("{} does not exist", root.display());
    }
    let filter = SourceFilter::new(&["dart".to_string()]);

    let mut categories = Vec::new();
    let mut failures = Vec::new();
    for name in &cfg.categories {
        let dir = root.join(name);
        if !dir.is_dir() {
            tracing::debug!("no {} directory under {}", name, root.display());
            continue;
        }
        let mut widgets = Vec::new();
        for file in collect_source_files(&dir, &filter)? {
            let is_widget_file = file
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_') && n != "index.dart");
            if !is_widget_file {
                continue;
            }
            let rel = display_path(root, &file);
            match fs::read_to_string(&file) {
                Ok(text) => widgets.extend(
                    analyze_widgets(&file, &text, layers)
                        .into_iter()
                        .map(|widget| WidgetEntry {
                            file: rel.clone(),
                            widget,
                        }),
                ),
                Err(e) => {
                    tracing::warn!("failed to read {}: {}", file.display(), e);
                    failures.push(FileFailure {
                        file: rel,
                        error: format!("failed to read file: {}", e),
                    });
                }
            }
        }
        categories.push(CategoryReport {
            name: name.clone(),
            widgets,
        });
    }

    let summary = summarize(&categories, failures.len());
    Ok(WidgetReport {
        categories,
        failures,
        summary,
    })
}

fn all_widgets(categories: &[CategoryReport]) -> impl Iterator<Item = &WidgetInfo> {
    categories
        .iter()
        .flat_map(|c| c.widgets.iter())
        .map(|e| &e.widget)
}

fn summarize(categories: &[CategoryReport], failures: usize) -> WidgetSummary {
    let all = || all_widgets(categories);
    let widgets = all().count();
    let widgets_with_issues = all().filter(|w| !w.is_ok()).count();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for cb in all().flat_map(|w| w.callbacks.iter()) {
        *counts.entry(cb.ty.as_str()).or_default() += 1;
    }
    let mut callback_types: Vec<CallbackCount> = counts
        .into_iter()
        .map(|(ty, count)| CallbackCount {
            ty: ty.to_string(),
            count,
        })
        .collect();
    callback_types.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ty.cmp(&b.ty)));

    WidgetSummary {
        widgets,
        widgets_ok: widgets - widgets_with_issues,
        widgets_with_issues,
        errors: all().map(|w| w.errors.len()).sum::<usize>() + failures,
        callback_types,
    }
}

fn print_text(report: &WidgetReport) {
    for category in &report.categories {
        println!("== {} ==", category.name);
        if category.widgets.is_empty() {
            println!("  (no widgets found)");
        }
        for entry in &category.widgets {
            let w = &entry.widget;
            let status = if w.is_ok() { "ok" } else { "FAIL" };
            println!("  {} {} ({}:{})", status, w.class_name, entry.file, w.line);
            if !w.parameters.is_empty() {
                let mut names: Vec<&str> = w.parameters.iter().map(|p| p.name.as_str()).collect();
                let extra = names.len().saturating_sub(5);
                names.truncate(5);
                let more = if extra > 0 {
                    format!(" (+{} more)", extra)
                } else {
                    String::new()
                };
                println!("      parameters: {}{}", names.join(", "), more);
            }
            for cb in &w.callbacks {
                println!("      callback: {} {}", cb.ty, cb.name);
            }
            for err in &w.errors {
                println!("      error: {}", err);
            }
        }
    }
    for f in &report.failures {
        println!("{}: {}", f.file, f.error);
    }

    let s = &report.summary;
    println!(
        "== {} widgets, {} ok, {} with issues, {} errors ==",
        s.widgets, s.widgets_ok, s.widgets_with_issues, s.errors
    );
    let structure: Vec<String> = report
        .categories
        .iter()
        .map(|c| format!("{}={}", c.name, c.widgets.len()))
        .collect();
    println!("structure: {}", structure.join(", "));
    if !s.callback_types.is_empty() {
        let top: Vec<String> = s
            .callback_types
            .iter()
            .take(5)
            .map(|c| format!("{}={}", c.ty, c.count))
            .collect();
        println!("callback types: {}", top.join(", "));
    }
}
