use crate::config::{AppConfig, VerifyConfig};
use crate::lint::{Finding, LintOptions, analyze};
use crate::utils::{SourceFilter, collect_source_files, display_path};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: String,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub files: usize,
    pub files_with_errors: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    /// Only files with at least one finding.
    pub files: Vec<FileReport>,
    pub summary: Summary,
}

/// Execute the verify command
pub fn verify(config: Option<&str>, path: Option<&str>, format: OutputFormat) -> Result<()> {
    let cfg = AppConfig::load(config.map(Path::new)).context("failed to load config")?;
    let root = path
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.verify.root.clone());
    tracing::info!(root=%root.display(), "verify start");

    let report = verify_tree(&root, &cfg.verify)?;
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
            "verification failed: {} errors in {} files (out of {})",
            s.errors,
            s.files_with_errors,
            s.files
        );
    }
    tracing::info!("verification passed ({} files)", s.files);
    Ok(())
}

/// Lint every matching file under `root`. Read failures become a single
/// error finding for that file; the walk continues.
pub fn verify_tree(root: &Path, cfg: &VerifyConfig) -> Result<VerifyReport> {
    let opts = LintOptions::new(&cfg.override_methods, &cfg.layers)?;
    let filter = SourceFilter::new(&cfg.extensions).exclude(&cfg.exclude)?;
    let files = collect_source_files(root, &filter)?;

    let mut summary = Summary {
        files: files.len(),
        ..Summary::default()
    };
    let mut reports = Vec::new();
    for file in &files {
        let findings = match fs::read_to_string(file) {
            Ok(text) => analyze(file, &text, &opts),
            Err(e) => {
                tracing::warn!("failed to read {}: {}", file.display(), e);
                vec![Finding::error("read", None, format!("failed to read file: {}", e))]
            }
        };
        if findings.is_empty() {
            tracing::trace!("clean: {}", file.display());
            continue;
        }
        let errors = findings.iter().filter(|f| f.is_error()).count();
        summary.errors += errors;
        summary.warnings += findings.len() - errors;
        if errors > 0 {
            summary.files_with_errors += 1;
        }
        reports.push(FileReport {
            path: display_path(root, file),
            findings,
        });
    }

    Ok(VerifyReport {
        files: reports,
        summary,
    })
}

fn print_text(report: &VerifyReport) {
    for file in &report.files {
        println!("{}", file.path);
        for f in &file.findings {
            let severity = if f.is_error() { "error" } else { "warning" };
            match f.line {
                Some(line) => println!("  {}[{}] line {}: {}", severity, f.rule, line, f.message),
                None => println!("  {}[{}]: {}", severity, f.rule, f.message),
            }
        }
    }
    let s = &report.summary;
    println!(
        "== {} files, {} ok, {} with errors, {} errors, {} warnings ==",
        s.files,
        s.files - s.files_with_errors,
        s.files_with_errors,
        s.errors,
        s.warnings
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_config_file(dir: &Path, root: &Path) -> Result<String> {
        let config_file = dir.join("dart-tidy.toml");
        let mut file = fs::File::create(&config_file)?;
        writeln!(file, "[verify]")?;
        writeln!(file, "root = {:?}", root.to_string_lossy())?;
        writeln!(file, "exclude = [\"**/*.g.dart\"]")?;
        Ok(config_file.to_string_lossy().to_string())
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, content).unwrap();
    }

    #[test]
    fn test_verify_invalid_config() {
        let result = verify(Some("nonexistent_config.toml"), None, OutputFormat::Text);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("failed to load config")
        );
    }

    #[test]
    fn test_verify_clean_tree_passes() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("widgets");
        write(&root, "atoms/a.dart", "void main() {\n  print('}');\n}\n");

        let config_file = create_test_config_file(temp_dir.path(), &root).unwrap();
        assert!(verify(Some(&config_file), None, OutputFormat::Json).is_ok());
    }

    #[test]
    fn test_verify_fails_on_structural_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("widgets");
        write(&root, "atoms/a.dart", "void main() {\n");

        let config_file = create_test_config_file(temp_dir.path(), &root).unwrap();
        let err = verify(Some(&config_file), None, OutputFormat::Text).unwrap_err();
        assert!(err.to_string().contains("verification failed: 1 errors in 1 files"));
    }

    #[test]
    fn test_verify_warnings_do_not_fail() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("widgets");
        write(
            &root,
            "atoms/a.dart",
            "class S extends State<W> {\n  void dispose() {\n  }\n}\n",
        );

        let config_file = create_test_config_file(temp_dir.path(), &root).unwrap();
        assert!(verify(Some(&config_file), None, OutputFormat::Text).is_ok());
    }

    #[test]
    fn test_verify_nonexistent_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("missing");
        let config_file = create_test_config_file(temp_dir.path(), &root).unwrap();
        let err = verify(Some(&config_file), None, OutputFormat::Text).unwrap_err();
        assert!(format!("{:#}", err).contains("does not exist"));
    }

    #[test]
    fn test_path_argument_overrides_config_root() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good");
        let bad = temp_dir.path().join("bad");
        write(&good, "a.dart", "f() {}\n");
        write(&bad, "a.dart", "f() {\n");

        let config_file = create_test_config_file(temp_dir.path(), &bad).unwrap();
        let good_str = good.to_string_lossy().to_string();
        assert!(verify(Some(&config_file), Some(&good_str), OutputFormat::Text).is_ok());
    }

    #[test]
    fn report_counts_and_ordering() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "b.dart", "}\n");
        write(root, "a.dart", "class S {\n  void dispose() {}\n}\n");
        write(root, "c.dart", "ok() {}\n");
        write(root, "gen/c.g.dart", "{{{{\n");

        let cfg = AppConfig::from_toml_str("[verify]\nexclude = [\"**/*.g.dart\"]\n")
            .unwrap()
            .verify;
        let report = verify_tree(root, &cfg).unwrap();
        assert_eq!(report.summary.files, 3);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.files_with_errors, 1);
        let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.dart", "b.dart"]);
    }

    #[test]
    fn unreadable_file_is_reported_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("latin1.dart"), [0x63u8, 0xff, 0xfe, 0x0a]).unwrap();
        write(root, "ok.dart", "f() {}\n");

        let cfg = AppConfig::from_toml_str("").unwrap().verify;
        let report = verify_tree(root, &cfg).unwrap();
        assert_eq!(report.summary.files, 2);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].findings[0].rule, "read");
        assert!(
            report.files[0].findings[0]
                .message
                .starts_with("failed to read file:")
        );
    }

    #[test]
    fn json_report_shape() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "x.dart", "(\n");
        let cfg = AppConfig::from_toml_str("").unwrap().verify;
        let report = verify_tree(temp_dir.path(), &cfg).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["summary"]["errors"], 1);
        assert_eq!(value["files"][0]["path"], "x.dart");
        assert_eq!(value["files"][0]["findings"][0]["severity"], "error");
        assert_eq!(value["files"][0]["findings"][0]["rule"], "brackets");
        assert_eq!(value["files"][0]["findings"][0]["line"], 1);
    }
}
