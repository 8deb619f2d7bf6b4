use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Mapping;

use super::write_if_changed;

/// Apply each mapping in order as a plain substring replacement.
///
/// Later mappings see the output of earlier ones. Returns the rewritten text
/// and how many mappings matched.
pub fn migrate_text(content: &str, mappings: &[Mapping]) -> (String, usize) {
    let mut text = content.to_string();
    let mut changes = 0usize;
    for m in mappings {
        if text.contains(&m.from) {
            text = text.replace(&m.from, &m.to);
            changes += 1;
        }
    }
    (text, changes)
}

/// Migrate one file in place. Returns the number of mappings applied, or 0
/// when the file was left untouched.
pub fn migrate_file(path: &Path, mappings: &[Mapping], dry_run: bool) -> Result<usize> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let (updated, changes) = migrate_text(&content, mappings);
    if write_if_changed(path, &content, &updated, dry_run)? {
        Ok(changes)
    } else {
        Ok(0)
    }
}

/// Result of inserting one import statement into a file.
#[derive(Debug, PartialEq, Eq)]
pub enum ImportInsertion {
    Inserted(String),
    AlreadyPresent,
    /// The file has no terminated `import` line to anchor on.
    NoImports,
}

/// `import '<uri>';`, or `uri` itself when it already is a statement.
pub fn import_statement(uri: &str) -> String {
    let uri = uri.trim();
    if uri.starts_with("import ") {
        if uri.ends_with(';') {
            uri.to_string()
        } else {
            format!("{};", uri)
        }
    } else {
        format!("import '{}';", uri)
    }
}

/// Insert `statement` on its own line after the last `import ...;` line.
pub fn insert_import(content: &str, statement: &str) -> ImportInsertion {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    if lines.iter().any(|l| l.trim() == statement) {
        return ImportInsertion::AlreadyPresent;
    }
    let Some(last) = lines.iter().rposition(|l| {
        let t = l.trim();
        t.starts_with("import ") && t.ends_with(';')
    }) else {
        return ImportInsertion::NoImports;
    };

    let mut out = String::with_capacity(content.len() + statement.len() + 2);
    for (i, line) in lines.iter().enumerate() {
        out.push_str(line);
        if i == last {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(statement);
            out.push('\n');
        }
    }
    ImportInsertion::Inserted(out)
}

pub fn add_import_file(path: &Path, statement: &str, dry_run: bool) -> Result<ImportInsertion> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let outcome = insert_import(&content, statement);
    if let ImportInsertion::Inserted(updated) = &outcome {
        write_if_changed(path, &content, updated, dry_run)?;
    }
    Ok(outcome)
}
