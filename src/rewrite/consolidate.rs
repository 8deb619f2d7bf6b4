use anyhow::{Context, Result, bail};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::config::ConsolidateConfig;
use crate::lint::checks::is_library_directive;

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapses per-widget imports into the single barrel import.
#[derive(Debug)]
pub struct Consolidator {
    patterns: [Regex; 2],
    barrel: String,
    widgets_dir: String,
    skip: Vec<String>,
}

impl Consolidator {
    pub fn new(cfg: &ConsolidateConfig) -> Result<Self> {
        let Some(package) = cfg.package.as_deref() else {
            bail!("[consolidate] package is not set");
        };
        if cfg.categories.is_empty() {
            bail!("[consolidate] categories is empty");
        }
        let dir = regex::escape(&cfg.widgets_dir);
        let cats = cfg
            .categories
            .iter()
            .map(|c| regex::escape(c))
            .collect::<Vec<_>>()
            .join("|");
        let relative = format!(r"(?m)^[ \t]*import\s+'[./]+{}/(?:{})/[^']+';[ \t]*\n?", dir, cats);
        let package_form = format!(
            r"(?m)^[ \t]*import\s+'package:{}/{}/(?:{})/[^']+';[ \t]*\n?",
            regex::escape(package),
            dir,
            cats
        );
        Ok(Self {
            patterns: [
                Regex::new(&relative).context("failed to build relative import pattern")?,
                Regex::new(&package_form).context("failed to build package import pattern")?,
            ],
            barrel: format!("import 'package:{}/{}/index.dart';", package, cfg.widgets_dir),
            widgets_dir: cfg.widgets_dir.clone(),
            skip: cfg.skip.clone(),
        })
    }

    pub fn barrel(&self) -> &str {
        &self.barrel
    }

    /// Files that must keep their direct imports: the widget tree itself,
    /// barrel files, and configured skip paths. `rel_path` uses `/`.
    pub fn should_skip(&self, rel_path: &str) -> bool {
        let anchored = format!("/{}", rel_path);
        self.skip.iter().any(|s| rel_path.contains(s.as_str()))
            || Path::new(rel_path).file_name().is_some_and(|n| n == "index.dart")
            || anchored.contains(&format!("/{}/", self.widgets_dir))
    }

    /// Rewrite one file's text. `None` when there was nothing to consolidate;
    /// otherwise the new text and how many imports were folded away.
    pub fn consolidate_text(&self, content: &str) -> Option<(String, usize)> {
        let found: usize = self
            .patterns
            .iter()
            .map(|re| re.find_iter(content).count())
            .sum();
        if found == 0 {
            return None;
        }

        let mut text = content.to_string();
        for re in &self.patterns {
            text = re.replace_all(&text, "").into_owned();
        }

        if !text.contains(&self.barrel) {
            let mut lines: Vec<&str> = text.split('\n').collect();
            let at = insertion_index(&lines);
            lines.insert(at, &self.barrel);
            text = lines.join("\n");
        }

        let text = BLANK_RUN_RE.replace_all(&text, "\n\n").into_owned();
        Some((text, found))
    }
}

/// Line index just past the leading directive block (`library`/`import`),
/// looking through blank lines, comments, and continuation lines. Without
/// directives, the index just past the file's leading `//` header.
fn insertion_index(lines: &[&str]) -> usize {
    let mut at = lines.iter().take_while(|l| l.starts_with("//")).count();
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("import ") || is_library_directive(line) {
            at = i + 1;
        } else if line.starts_with("part ")
            || (!line.trim().is_empty() && !line.starts_with("//") && !line.starts_with('\''))
        {
            break;
        }
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn consolidator() -> Consolidator {
        Consolidator::new(&ConsolidateConfig {
            root: PathBuf::from("lib"),
            package: Some("myapp".into()),
            widgets_dir: "shared/widgets".into(),
            categories: vec!["atoms".into(), "molecules".into(), "organisms".into()],
            skip: vec!["widgetbook".into()],
        })
        .unwrap()
    }

    #[test]
    fn folds_widget_imports_into_barrel() {
        let src = "\
import 'package:flutter/material.dart';
import '../../../../shared/widgets/atoms/buttons/toss_button.dart';
import 'package:myapp/shared/widgets/organisms/dialogs/toss_dialog.dart';
import '../providers/page_provider.dart';

class Page {}
";
        let (out, count) = consolidator().consolidate_text(src).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            out,
            "\
import 'package:flutter/material.dart';
import '../providers/page_provider.dart';
import 'package:myapp/shared/widgets/index.dart';

class Page {}
"
        );
    }

    #[test]
    fn existing_barrel_is_not_duplicated() {
        let src = "import 'package:myapp/shared/widgets/index.dart';\nimport '../shared/widgets/atoms/badge.dart';\n\nvoid f() {}\n";
        let (out, count) = consolidator().consolidate_text(src).unwrap();
        assert_eq!(count, 1);
        assert_eq!(out.matches("shared/widgets/index.dart").count(), 1);
        assert!(!out.contains("atoms/badge"));
    }

    #[test]
    fn untouched_when_nothing_matches() {
        let src = "import 'package:myapp/shared/themes/colors.dart';\n";
        assert!(consolidator().consolidate_text(src).is_none());
        // categories outside the configured set stay as they are
        let src = "import '../shared/widgets/templates/scaffold.dart';\n";
        assert!(consolidator().consolidate_text(src).is_none());
    }

    #[test]
    fn barrel_goes_after_library_directive() {
        let src = "library page;\n\nimport '../shared/widgets/atoms/a.dart';\n\nclass X {}\n";
        let (out, _) = consolidator().consolidate_text(src).unwrap();
        assert_eq!(
            out,
            "library page;\nimport 'package:myapp/shared/widgets/index.dart';\n\nclass X {}\n"
        );
    }

    #[test]
    fn barrel_goes_after_unnamed_library_directive() {
        let src = "library;\n\nimport '../shared/widgets/atoms/a.dart';\n\nclass X {}\n";
        let (out, _) = consolidator().consolidate_text(src).unwrap();
        assert_eq!(
            out,
            "library;\nimport 'package:myapp/shared/widgets/index.dart';\n\nclass X {}\n"
        );
    }

    #[test]
    fn barrel_stays_below_leading_header() {
        let src = "// Copyright 2024\nimport '../shared/widgets/atoms/a.dart';\n\nclass X {}\n";
        let (out, _) = consolidator().consolidate_text(src).unwrap();
        assert_eq!(
            out,
            "// Copyright 2024\nimport 'package:myapp/shared/widgets/index.dart';\n\nclass X {}\n"
        );
    }

    #[test]
    fn skip_rules() {
        let c = consolidator();
        assert!(c.should_skip("shared/widgets/atoms/buttons/b.dart"));
        assert!(c.should_skip("features/home/index.dart"));
        assert!(c.should_skip("index.dart"));
        assert!(!c.should_skip("features/home/my_index.dart"));
        assert!(c.should_skip("widgetbook/stories.dart"));
        assert!(!c.should_skip("features/home/home_page.dart"));
    }

    #[test]
    fn package_is_required() {
        let result = Consolidator::new(&ConsolidateConfig {
            root: PathBuf::from("lib"),
            package: None,
            widgets_dir: "shared/widgets".into(),
            categories: vec!["atoms".into()],
            skip: vec![],
        });
        assert!(result.is_err());
    }

    #[test]
    fn barrel_text() {
        assert_eq!(
            consolidator().barrel(),
            "import 'package:myapp/shared/widgets/index.dart';"
        );
    }
}
