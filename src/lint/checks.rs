use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use super::Finding;

static STATEFUL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"class\s+(\w+)\s+extends\s+(?:StatefulWidget|ConsumerStatefulWidget)\b").unwrap()
});
static STATE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+_(\w+)State\s+extends\b").unwrap());
static IMPORT_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap());
static LIBRARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*library\b").unwrap());

/// `library name;` or the unnamed `library;`.
pub(crate) fn is_library_directive(line: &str) -> bool {
    LIBRARY_RE.is_match(line)
}

pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Lifecycle methods whose previous non-blank line is not `@override`.
pub fn missing_overrides(text: &str, method_re: &Regex) -> Vec<Finding> {
    let lines: Vec<&str> = text.lines().collect();
    let mut findings = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = method_re.captures(line) else {
            continue;
        };
        let prev = lines[..idx].iter().rev().map(|l| l.trim()).find(|l| !l.is_empty());
        // a definition with nothing above it has no place for an annotation
        if prev.is_some_and(|p| !p.starts_with("@override")) {
            findings.push(Finding::warning(
                "override",
                Some(idx + 1),
                format!("method '{}' might need @override annotation", &caps[1]),
            ));
        }
    }
    findings
}

/// Widget names `X` that have a `class _XState extends` in `text`.
pub(crate) fn state_class_names(text: &str) -> HashSet<&str> {
    STATE_CLASS_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Public stateful widgets without a matching `_<Name>State` class.
pub fn missing_state_classes(text: &str) -> Vec<Finding> {
    let states = state_class_names(text);
    STATEFUL_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            if name.as_str().starts_with('_') || states.contains(name.as_str()) {
                return None;
            }
            Some(Finding::error(
                "state-class",
                Some(line_of(text, name.start())),
                format!(
                    "StatefulWidget '{}' is missing State class '_{}State'",
                    name.as_str(),
                    name.as_str()
                ),
            ))
        })
        .collect()
}

/// Import lines without a terminating semicolon, and imports placed before
/// the `library` directive.
pub fn import_statements(text: &str) -> Vec<Finding> {
    let library_line = text
        .lines()
        .position(is_library_directive)
        .map(|i| i + 1);

    let mut findings = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let stripped = line.trim();
        if !stripped.starts_with("import ") {
            continue;
        }
        let lineno = idx + 1;
        if library_line.is_some_and(|lib| lineno < lib) {
            findings.push(Finding::error(
                "library-order",
                Some(lineno),
                "import statement before library directive",
            ));
        }
        if !stripped.ends_with(';') {
            findings.push(Finding::error(
                "import-semicolon",
                Some(lineno),
                "import statement missing semicolon",
            ));
        }
    }
    findings
}

/// Rank of the layer `path` lives in, by `/<layer>/` component.
fn layer_of(path: &Path, layers: &[String]) -> Option<usize> {
    let normalized = format!("/{}", path.to_string_lossy().replace('\\', "/"));
    layers
        .iter()
        .position(|layer| normalized.contains(&format!("/{}/", layer)))
}

/// Imports from a layer ranked above the file's own layer.
pub fn layering(path: &Path, text: &str, layers: &[String]) -> Vec<Finding> {
    let Some(rank) = layer_of(path, layers) else {
        return Vec::new();
    };
    let own = &layers[rank];
    let higher = &layers[rank + 1..];

    let mut findings = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let Some(caps) = IMPORT_TARGET_RE.captures(line) else {
            continue;
        };
        let target = &caps[1];
        if let Some(up) = higher.iter().find(|h| target.contains(&format!("{}/", h))) {
            findings.push(Finding::error(
                "layering",
                Some(idx + 1),
                format!("{} imports from higher layer {}: {}", own, up, target),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method_re() -> Regex {
        Regex::new(r"^\s*(?:Widget|void|State<\w+>)\s+(build|dispose|createState)\s*\(").unwrap()
    }

    fn layers() -> Vec<String> {
        vec!["atoms".into(), "molecules".into(), "organisms".into()]
    }

    #[test]
    fn override_found_across_blank_lines() {
        let text = "  @override\n\n  void dispose() {}\n";
        assert!(missing_overrides(text, &method_re()).is_empty());
    }

    #[test]
    fn override_missing_is_reported_with_line() {
        let text = "class A {\n  final x = 1;\n  Widget build(BuildContext c) => x;\n}\n";
        let findings = missing_overrides(text, &method_re());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, Some(3));
        assert!(findings[0].message.contains("'build'"));
    }

    #[test]
    fn override_on_first_line_is_not_reported() {
        assert!(missing_overrides("void dispose() {}\n", &method_re()).is_empty());
    }

    #[test]
    fn generic_state_return_type_matches() {
        let text = "class W {\n  State<W> createState() => _WState();\n}\n";
        assert_eq!(missing_overrides(text, &method_re()).len(), 1);
    }

    #[test]
    fn stateful_widget_with_state_class_passes() {
        let text = "class Counter extends StatefulWidget {}\nclass _CounterState extends State<Counter> {}\n";
        assert!(missing_state_classes(text).is_empty());
    }

    #[test]
    fn stateful_widget_without_state_class_fails() {
        let text = "// header\nclass Picker extends ConsumerStatefulWidget {}\n";
        let findings = missing_state_classes(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, Some(2));
        assert_eq!(
            findings[0].message,
            "StatefulWidget 'Picker' is missing State class '_PickerState'"
        );
    }

    #[test]
    fn private_stateful_widgets_are_ignored() {
        assert!(missing_state_classes("class _Inner extends StatefulWidget {}\n").is_empty());
    }

    #[test]
    fn import_without_semicolon() {
        let text = "import 'package:a/a.dart';\nimport 'package:b/b.dart'\n";
        let findings = import_statements(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "import-semicolon");
        assert_eq!(findings[0].line, Some(2));
    }

    #[test]
    fn import_before_library_directive() {
        let text = "import 'a.dart';\nlibrary widgets;\nimport 'b.dart';\n";
        let findings = import_statements(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "library-order");
        assert_eq!(findings[0].line, Some(1));
    }

    #[test]
    fn import_before_unnamed_library_directive() {
        let text = "import 'a.dart';\nlibrary;\n";
        let findings = import_statements(text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "library-order");
    }

    #[test]
    fn library_directive_forms() {
        assert!(is_library_directive("library;"));
        assert!(is_library_directive("library widgets;"));
        assert!(is_library_directive("  library  widgets ;"));
        assert!(!is_library_directive("library_name = 1;"));
        assert!(!is_library_directive("// library widgets;"));
    }

    #[test]
    fn atom_importing_molecule_and_organism() {
        let text = "import '../../molecules/cards/card.dart';\nimport 'package:app/shared/widgets/organisms/sheet.dart';\nimport '../display/badge.dart';\n";
        let findings = layering(Path::new("lib/shared/widgets/atoms/buttons/b.dart"), text, &layers());
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.starts_with("atoms imports from higher layer molecules"));
        assert!(findings[1].message.starts_with("atoms imports from higher layer organisms"));
    }

    #[test]
    fn molecule_may_import_atoms() {
        let text = "import '../../atoms/buttons/b.dart';\n";
        assert!(layering(Path::new("widgets/molecules/x.dart"), text, &layers()).is_empty());
    }

    #[test]
    fn organisms_are_unconstrained() {
        let text = "import '../molecules/x.dart';\nimport '../atoms/y.dart';\n";
        assert!(layering(Path::new("organisms/z.dart"), text, &layers()).is_empty());
    }

    #[test]
    fn files_outside_layers_are_skipped() {
        let text = "import 'organisms/x.dart';\n";
        assert!(layering(Path::new("lib/features/home/page.dart"), text, &layers()).is_empty());
    }
}
