use anyhow::{Context, Result, bail};
use regex::Regex;
use std::ops::Range;

use crate::scanner::{Bracket, Lexer, matching_close};

#[derive(Debug, PartialEq, Eq)]
pub struct DedupeOutcome {
    pub text: String,
    /// Definitions found, including the one kept.
    pub found: usize,
    /// Start lines of the removed duplicates.
    pub removed: Vec<usize>,
}

enum Candidate {
    Definition(Range<usize>),
    /// Body opened but never closed; reported and left alone.
    Unclosed,
}

/// Classify a signature match whose `(` sits at `paren`.
fn candidate(text: &str, brackets: &[Bracket], start: usize, paren: usize) -> Option<Candidate> {
    // a `(` missing from the bracket list was inside a string or comment
    let params = brackets.iter().position(|b| b.offset == paren && b.ch == '(')?;
    let Some(params_end) = matching_close(brackets, params) else {
        return Some(Candidate::Unclosed);
    };
    let body = params_end + 1;
    let open = brackets.get(body).filter(|b| b.ch == '{')?;
    // only whitespace or `async` may sit between `)` and `{`; anything else
    // means this was a call, not a definition
    let between = &text[brackets[params_end].offset + 1..open.offset];
    if !matches!(between.trim(), "" | "async") {
        return None;
    }
    let Some(close) = matching_close(brackets, body) else {
        return Some(Candidate::Unclosed);
    };
    let mut end = brackets[close].offset + 1;
    let rest = &text[end..];
    if rest.starts_with("\r\n") {
        end += 2;
    } else if rest.starts_with('\n') {
        end += 1;
    }
    Some(Candidate::Definition(start..end))
}

/// Keep the first definition of method `name` and remove every later one.
///
/// Definitions are found at line start, optionally after `async`, `static`,
/// `get`, or `function`; body extents come from the bracket lexer so braces in
/// strings and comments do not count.
pub fn dedupe_method(text: &str, name: &str) -> Result<DedupeOutcome> {
    let pattern = format!(
        r"(?m)^[ \t]*(?:(?:async|static|get|function)\s+)*{}\s*\(",
        regex::escape(name)
    );
    let signature = Regex::new(&pattern).context("failed to build method pattern")?;
    let brackets: Vec<Bracket> = Lexer::new(text).collect();
    let line_at = |offset: usize| text[..offset].bytes().filter(|b| *b == b'\n').count() + 1;

    let mut definitions: Vec<Range<usize>> = Vec::new();
    for m in signature.find_iter(text) {
        let start = m.start();
        // nested inside an earlier definition
        if definitions.last().is_some_and(|d| start < d.end) {
            continue;
        }
        match candidate(text, &brackets, start, m.end() - 1) {
            Some(Candidate::Definition(span)) => definitions.push(span),
            Some(Candidate::Unclosed) => {
                tracing::warn!(
                    "definition of {} at line {} never closes, left in place",
                    name,
                    line_at(start)
                );
            }
            None => {}
        }
    }

    if definitions.is_empty() {
        bail!("no definition of method {} found", name);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut removed = Vec::new();
    for span in definitions.iter().skip(1) {
        out.push_str(&text[cursor..span.start]);
        removed.push(line_at(span.start));
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);

    Ok(DedupeOutcome {
        text: out,
        found: definitions.len(),
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAVBAR: &str = "\
class Navbar {
    constructor() {
        this.items = [];
    }

    render() {
        return `<nav>${this.items}</nav>`;
    }

    toggleMenu() {
        const open = '{';
        this.open = !this.open;
    }

    toggleMenu() {
        // stale copy }
        this.open = false;
    }

    close() {
        this.toggleMenu();
    }
}
";

    #[test]
    fn removes_later_duplicate() {
        let out = dedupe_method(NAVBAR, "toggleMenu").unwrap();
        assert_eq!(out.found, 2);
        assert_eq!(out.removed, vec![15]);
        assert_eq!(out.text.matches("toggleMenu() {").count(), 1);
        assert!(out.text.contains("const open = '{';"));
        assert!(!out.text.contains("stale copy"));
        // call sites are not definitions
        assert!(out.text.contains("this.toggleMenu();"));
        assert!(out.text.contains("    close() {\n"));
        assert!(crate::scanner::scan(&out.text).is_empty());
    }

    #[test]
    fn single_definition_is_unchanged() {
        let out = dedupe_method(NAVBAR, "close").unwrap();
        assert_eq!(out.found, 1);
        assert!(out.removed.is_empty());
        assert_eq!(out.text, NAVBAR);
    }

    #[test]
    fn missing_method_is_an_error() {
        let err = dedupe_method(NAVBAR, "open").unwrap_err();
        assert!(err.to_string().contains("no definition of method open"));
    }

    #[test]
    fn bare_call_at_line_start_is_not_a_definition() {
        let text = "function init() {\n  setup();\n}\nfunction setup() {\n}\nsetup();\n";
        let out = dedupe_method(text, "setup").unwrap();
        assert_eq!(out.found, 1);
        assert_eq!(out.text, text);
    }

    #[test]
    fn function_and_async_forms() {
        let text = "function load() {\n  a();\n}\nasync function load() {\n  b();\n}\nasync load() async {\n}\n";
        let out = dedupe_method(text, "load").unwrap();
        assert_eq!(out.found, 3);
        assert_eq!(out.removed, vec![4, 7]);
        assert_eq!(out.text, "function load() {\n  a();\n}\n");
    }

    #[test]
    fn signature_inside_comment_is_ignored() {
        let text = "/*\nrender() {\n*/\nrender() {\n  x();\n}\n";
        let out = dedupe_method(text, "render").unwrap();
        assert_eq!(out.found, 1);
        assert_eq!(out.text, text);
    }

    #[test]
    fn unclosed_duplicate_is_left_in_place() {
        let text = "go() {\n}\ngo() {\n  oops(\n";
        let out = dedupe_method(text, "go").unwrap();
        assert_eq!(out.found, 1);
        assert_eq!(out.text, text);
    }
}
