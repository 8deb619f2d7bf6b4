use crate::commands::{self, OutputFormat};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "dart-tidy",
    version,
    about = "Flutter widget tree verifier and import migration toolkit"
)]
struct Cli {
    /// Increase verbosity (-v, -vv). Uses RUST_LOG under the hood
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to dart-tidy.toml (defaults to ./dart-tidy.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check bracket balance, overrides, State classes, imports and layering
    Verify {
        /// Directory to scan (defaults to [verify].root)
        path: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Rewrite import paths using the configured migration mappings
    Migrate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace per-widget imports with the barrel import
    Consolidate {
        /// Directory to rewrite (defaults to [consolidate].root)
        path: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Report widget classes, constructor parameters and callbacks per category
    Widgets {
        /// Widget tree root (defaults to [widgets].root)
        path: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Insert an import after the last import line of each file
    AddImport {
        /// Import URI, or a full `import '...';` statement
        uri: String,
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Keep the first definition of a method and delete later duplicates
    Dedupe {
        /// Method name to deduplicate
        #[arg(long)]
        method: String,
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    // stdout carries reports; logs go to stderr. A second init (tests,
    // embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Verify { path, format } => commands::verify(config, path.as_deref(), format)?,
        Commands::Migrate { dry_run } => commands::migrate(config, dry_run)?,
        Commands::Consolidate { path, dry_run } => {
            commands::consolidate(config, path.as_deref(), dry_run)?
        }
        Commands::Widgets { path, format } => {
            commands::widgets(config, path.as_deref(), format)?
        }
        Commands::AddImport {
            uri,
            files,
            dry_run,
        } => commands::add_import(&uri, &files, dry_run)?,
        Commands::Dedupe {
            method,
            files,
            dry_run,
        } => commands::dedupe(&method, &files, dry_run)?,
    }

    Ok(())
}

pub fn run_cli() -> Result<()> {
    dispatch(Cli::parse())
}

pub fn run_cli_with<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    dispatch(Cli::parse_from(args.into_iter().map(Into::<String>::into)))
}
