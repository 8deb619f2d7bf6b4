use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use super::checks;
use crate::scanner::{Bracket, Lexer, matching_close};

static WIDGET_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"class\s+(\w+)\s+extends\s+(StatelessWidget|StatefulWidget|ConsumerWidget|ConsumerStatefulWidget|HookConsumerWidget)\b",
    )
    .unwrap()
});
static BUILD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bWidget\s+build\s*\(").unwrap());
static CONSTRUCTOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:const\s+)?(\w+)\s*\(").unwrap());
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:late\s+)?final\s+([^=;]+?)\s+(\w+)\s*(?:=[^;]*)?;").unwrap()
});
static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:@\w+\s+)*(required\s+)?(?:(.+?)\s+)?(?:this\.|super\.)?(\w+)$").unwrap()
});

pub const MALFORMED_CONSTRUCTOR: &str = "constructor not found or malformed";
pub const MISSING_BUILD: &str = "missing build method";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub required: bool,
    /// Declared type, from the parameter itself or the matching `final` field.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Callback {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Signature summary of one widget class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetInfo {
    pub class_name: String,
    pub kind: String,
    pub line: usize,
    pub parameters: Vec<Parameter>,
    pub callbacks: Vec<Callback>,
    pub errors: Vec<String>,
}

impl WidgetInfo {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `VoidCallback`, `Function`, `*Callback` and inline `Function(...)` types.
pub fn is_callback_type(ty: &str) -> bool {
    let t = ty.trim().trim_end_matches('?');
    t == "VoidCallback" || t == "Function" || t.ends_with("Callback") || t.contains("Function(")
}

enum Constructor<'a> {
    /// Text between the parentheses.
    Found(&'a str),
    Malformed,
}

/// Split a parameter list on top-level commas. Each entry carries whether it
/// sat inside the `{...}` or `[...]` optional group.
fn split_params(list: &str) -> Vec<(String, bool)> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_group = false;
    for ch in list.chars() {
        match ch {
            '{' | '[' if depth == 0 && current.trim().is_empty() => {
                in_group = true;
                continue;
            }
            '}' | ']' if depth == 0 => {
                entries.push((std::mem::take(&mut current), in_group));
                in_group = false;
                continue;
            }
            ',' if depth == 0 => {
                entries.push((std::mem::take(&mut current), in_group));
                continue;
            }
            '(' | '<' | '[' | '{' => depth += 1,
            ')' | '>' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(ch);
    }
    entries.push((current, in_group));
    entries
        .into_iter()
        .map(|(e, g)| (e.trim().to_string(), g))
        .filter(|(e, _)| !e.is_empty())
        .collect()
}

fn parse_param(entry: &str, in_group: bool) -> Option<Parameter> {
    let decl = entry.split_once('=').map_or(entry, |(d, _)| d).trim();
    let caps = PARAM_RE.captures(decl)?;
    let name = caps.get(3)?.as_str();
    if name == "key" {
        return None;
    }
    Some(Parameter {
        name: name.to_string(),
        required: caps.get(1).is_some() || !in_group,
        ty: caps.get(2).map(|t| t.as_str().trim().to_string()),
    })
}

fn find_constructor<'a>(
    text: &'a str,
    brackets: &[Bracket],
    name: &str,
    body: Range<usize>,
) -> Option<Constructor<'a>> {
    for caps in CONSTRUCTOR_RE.captures_iter(&text[body.clone()]) {
        if caps.get(1).is_none_or(|m| m.as_str() != name) {
            continue;
        }
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let paren = body.start + whole.end() - 1;
        // not structural: inside a string or comment
        let Some(open) = brackets.iter().position(|b| b.offset == paren && b.ch == '(') else {
            continue;
        };
        let Some(close) = matching_close(brackets, open) else {
            return Some(Constructor::Malformed);
        };
        let close_at = brackets[close].offset;
        if brackets[close].ch != ')' {
            return Some(Constructor::Malformed);
        }
        // a declaration ends in `;`, an initializer list, or a body; a call
        // at line start is followed by anything else
        let follows = text[close_at + 1..].trim_start().chars().next();
        if matches!(follows, Some(';' | ':' | '{')) {
            return Some(Constructor::Found(&text[paren + 1..close_at]));
        }
    }
    None
}

/// Widget classes declared in `text` with their constructor parameters,
/// callbacks and structural problems.
pub fn extract_widgets(text: &str) -> Vec<WidgetInfo> {
    let brackets: Vec<Bracket> = Lexer::new(text).collect();
    let has_build = BUILD_RE.is_match(text);
    let states = checks::state_class_names(text);

    let mut widgets = Vec::new();
    for caps in WIDGET_CLASS_RE.captures_iter(text) {
        let (Some(whole), Some(name), Some(kind)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let mut errors = Vec::new();
        let body = brackets
            .iter()
            .position(|b| b.offset >= whole.end() && b.ch == '{')
            .and_then(|open| {
                let close = matching_close(&brackets, open)?;
                Some(brackets[open].offset..brackets[close].offset)
            });

        let mut parameters = Vec::new();
        let mut callbacks = Vec::new();
        let ctor = body
            .clone()
            .and_then(|b| find_constructor(text, &brackets, name.as_str(), b));
        match (ctor, &body) {
            (Some(Constructor::Found(list)), Some(b)) => {
                let fields: HashMap<&str, &str> = FIELD_RE
                    .captures_iter(&text[b.clone()])
                    .filter_map(|c| Some((c.get(2)?.as_str(), c.get(1)?.as_str())))
                    .collect();
                for (entry, in_group) in split_params(list) {
                    let Some(mut param) = parse_param(&entry, in_group) else {
                        continue;
                    };
                    if param.ty.is_none() {
                        param.ty = fields.get(param.name.as_str()).map(|t| t.to_string());
                    }
                    if let Some(ty) = param.ty.as_deref().filter(|t| is_callback_type(t)) {
                        callbacks.push(Callback {
                            name: param.name.clone(),
                            ty: ty.trim_end_matches('?').to_string(),
                        });
                    }
                    parameters.push(param);
                }
            }
            _ => errors.push(MALFORMED_CONSTRUCTOR.to_string()),
        }

        if !has_build {
            errors.push(MISSING_BUILD.to_string());
        }
        let stateful = matches!(kind.as_str(), "StatefulWidget" | "ConsumerStatefulWidget");
        if stateful && !states.contains(name.as_str()) {
            errors.push(format!("missing State class '_{}State'", name.as_str()));
        }

        widgets.push(WidgetInfo {
            class_name: name.as_str().to_string(),
            kind: kind.as_str().to_string(),
            line: checks::line_of(text, name.start()),
            parameters,
            callbacks,
            errors,
        });
    }
    widgets
}

/// `extract_widgets` plus layer violations, which are attached to every
/// widget of the file.
pub fn analyze_widgets(path: &Path, text: &str, layers: &[String]) -> Vec<WidgetInfo> {
    let mut widgets = extract_widgets(text);
    let violations: Vec<String> = checks::layering(path, text, layers)
        .into_iter()
        .map(|f| f.message)
        .collect();
    for w in &mut widgets {
        w.errors.extend(violations.iter().cloned());
    }
    widgets
}
