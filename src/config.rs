use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "dart-tidy.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub verify: VerifyConfig,
    pub migrate: MigrateConfig,
    pub consolidate: ConsolidateConfig,
    pub widgets: WidgetsConfig,
}

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub override_methods: Vec<String>,
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub roots: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub skip_dirs: Vec<String>,
    pub mappings: Vec<Mapping>,
}

#[derive(Debug, Clone)]
pub struct ConsolidateConfig {
    pub root: PathBuf,
    pub package: Option<String>,
    pub widgets_dir: String,
    pub categories: Vec<String>,
    pub skip: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WidgetsConfig {
    pub root: PathBuf,
    /// Category directories under `root`, reported in this order.
    pub categories: Vec<String>,
}

// --- Raw TOML structures ---
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    verify: Option<VerifyToml>,
    migrate: Option<MigrateToml>,
    consolidate: Option<ConsolidateToml>,
    widgets: Option<WidgetsToml>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct VerifyToml {
    root: Option<String>,
    extensions: Option<Vec<String>>,
    exclude: Option<Vec<String>>, // globs
    override_methods: Option<Vec<String>>,
    layers: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MigrateToml {
    roots: Option<Vec<String>>,
    extensions: Option<Vec<String>>,
    skip_dirs: Option<Vec<String>>,
    mapping: Option<Vec<MappingToml>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingToml {
    from: String,
    to: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConsolidateToml {
    root: Option<String>,
    package: Option<String>,
    widgets_dir: Option<String>,
    categories: Option<Vec<String>>,
    skip: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WidgetsToml {
    root: Option<String>,
    categories: Option<Vec<String>>,
}

fn default_extensions() -> Vec<String> {
    vec!["dart".into()]
}

fn default_override_methods() -> Vec<String> {
    [
        "build",
        "initState",
        "dispose",
        "didChangeDependencies",
        "didUpdateWidget",
        "createState",
        "setState",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_layers() -> Vec<String> {
    vec!["atoms".into(), "molecules".into(), "organisms".into()]
}

fn default_categories() -> Vec<String> {
    ["atoms", "molecules", "organisms", "templates", "selectors"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_widget_categories() -> Vec<String> {
    ["atoms", "molecules", "organisms", "selectors", "templates"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `dart-tidy.toml` in the
    /// working directory is used when present, built-in defaults otherwise.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    tracing::debug!("{} not found, using defaults", DEFAULT_CONFIG_FILE);
                    return Self::from_raw(RawConfig::default());
                }
                p
            }
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content).context("failed to parse config")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let verify = match raw.verify {
            Some(v) => VerifyConfig {
                root: PathBuf::from(v.root.unwrap_or_else(|| "lib".into())),
                extensions: v.extensions.unwrap_or_else(default_extensions),
                exclude: v.exclude.unwrap_or_default(),
                override_methods: v.override_methods.unwrap_or_else(default_override_methods),
                layers: v.layers.unwrap_or_else(default_layers),
            },
            None => VerifyConfig {
                root: PathBuf::from("lib"),
                extensions: default_extensions(),
                exclude: Vec::new(),
                override_methods: default_override_methods(),
                layers: default_layers(),
            },
        };

        let migrate = match raw.migrate {
            Some(m) => {
                let mappings = m
                    .mapping
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| Mapping {
                        from: m.from,
                        to: m.to,
                    })
                    .collect::<Vec<_>>();
                if let Some(bad) = mappings.iter().find(|m| m.from.is_empty()) {
                    anyhow::bail!("migrate mapping with empty `from` (to = {:?})", bad.to);
                }
                MigrateConfig {
                    roots: m
                        .roots
                        .unwrap_or_else(|| vec!["lib".into()])
                        .into_iter()
                        .map(PathBuf::from)
                        .collect(),
                    extensions: m.extensions.unwrap_or_else(default_extensions),
                    skip_dirs: m.skip_dirs.unwrap_or_default(),
                    mappings,
                }
            }
            None => MigrateConfig {
                roots: vec![PathBuf::from("lib")],
                extensions: default_extensions(),
                skip_dirs: Vec::new(),
                mappings: Vec::new(),
            },
        };

        let consolidate = match raw.consolidate {
            Some(c) => ConsolidateConfig {
                root: PathBuf::from(c.root.unwrap_or_else(|| "lib".into())),
                package: c.package,
                widgets_dir: c
                    .widgets_dir
                    .unwrap_or_else(|| "shared/widgets".into())
                    .trim_matches('/')
                    .to_string(),
                categories: c.categories.unwrap_or_else(default_categories),
                skip: c.skip.unwrap_or_default(),
            },
            None => ConsolidateConfig {
                root: PathBuf::from("lib"),
                package: None,
                widgets_dir: "shared/widgets".into(),
                categories: default_categories(),
                skip: Vec::new(),
            },
        };

        let widgets = match raw.widgets {
            Some(w) => WidgetsConfig {
                root: PathBuf::from(w.root.unwrap_or_else(|| "lib/shared/widgets".into())),
                categories: w.categories.unwrap_or_else(default_widget_categories),
            },
            None => WidgetsConfig {
                root: PathBuf::from("lib/shared/widgets"),
                categories: default_widget_categories(),
            },
        };

        Ok(Self {
            verify,
            migrate,
            consolidate,
            widgets,
        })
    }
}
