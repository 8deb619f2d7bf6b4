use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::scanner;

pub mod checks;
pub mod widgets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One reported problem in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Finding {
    pub fn error(rule: &'static str, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            rule,
            line,
            message: message.into(),
        }
    }

    pub fn warning(rule: &'static str, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            rule,
            line,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<scanner::Diagnostic> for Finding {
    fn from(d: scanner::Diagnostic) -> Self {
        Finding::error("brackets", Some(d.line), d.message)
    }
}

/// Compiled settings shared by every file of a verify run.
#[derive(Debug)]
pub struct LintOptions {
    override_re: Option<Regex>,
    layers: Vec<String>,
}

impl LintOptions {
    pub fn new(override_methods: &[String], layers: &[String]) -> Result<Self> {
        let override_re = if override_methods.is_empty() {
            None
        } else {
            let names = override_methods
                .iter()
                .map(|m| regex::escape(m))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"^\s*(?:Widget|void|State<\w+>)\s+({})\s*\(", names);
            Some(Regex::new(&pattern).context("failed to build override pattern")?)
        };
        Ok(Self {
            override_re,
            layers: layers.to_vec(),
        })
    }
}

/// Run every check over one file's text.
///
/// `path` only decides which checks apply (layer membership, barrel files);
/// the file itself is never touched.
pub fn analyze(path: &Path, text: &str, opts: &LintOptions) -> Vec<Finding> {
    let mut findings: Vec<Finding> = scanner::scan(text).into_iter().map(Finding::from).collect();

    if let Some(re) = &opts.override_re {
        findings.extend(checks::missing_overrides(text, re));
    }
    findings.extend(checks::missing_state_classes(text));
    findings.extend(checks::import_statements(text));

    let is_barrel = path.file_name().is_some_and(|n| n == "index.dart");
    if !is_barrel {
        findings.extend(checks::layering(path, text, &opts.layers));
    }
    findings
}
