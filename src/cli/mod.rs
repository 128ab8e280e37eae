//! Command-line interface implementation
//!
//! Parses arguments, loads `stylepipe.toml`, applies overrides and runs the
//! requested task from the standard registry.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{
    check, default_config, find_config, load_config, merge_cli_overrides, CliOverrides,
    StyleConfig,
};
use crate::task::{standard_registry, TaskRegistry};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "STYLEPIPE_LOG";

/// Stylepipe - compile, normalize, format, prefix and minify stylesheets
#[derive(Parser, Debug)]
#[command(name = "stylepipe")]
#[command(about = "Stylepipe - compile, normalize, format, prefix and minify stylesheets")]
#[command(version)]
pub struct Cli {
    /// Task to run (css, watch, default)
    #[arg(default_value = "default")]
    pub task: String,

    /// Path to stylepipe.toml (default: search upward from the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the source glob
    #[arg(long)]
    pub source: Option<String>,

    /// Override the destination directory
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Indent formatted output with this many spaces
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=16))]
    pub indent: Option<u8>,

    /// List registered tasks and exit
    #[arg(long)]
    pub tasks: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            source: self.source.clone(),
            dest: self.dest.clone(),
            indent: self.indent.map(usize::from),
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    // Already installed when called twice in one process (tests)
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Load the configuration and find the project root.
///
/// An explicit `--config` path must exist; otherwise the file is searched
/// upward from the working directory and defaults apply when none is found.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(StyleConfig, PathBuf), String> {
    let cwd = std::env::current_dir().map_err(|e| format!("cannot read working directory: {}", e))?;
    let config_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(path) => {
            debug!("Using config: {}", path.display());
            let config = load_config(Some(&path)).map_err(|e| format!("{}: {}", path.display(), e))?;
            let root = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
                _ => cwd,
            };
            Ok((config, root))
        }
        None => {
            debug!("No stylepipe.toml found, using defaults");
            Ok((default_config(), cwd))
        }
    }
}

/// Print registered tasks with their prerequisites.
pub fn print_tasks(registry: &TaskRegistry) {
    for task in registry.tasks() {
        let deps = if task.prerequisites().is_empty() {
            String::new()
        } else {
            format!(" [{}]", task.prerequisites().join(", "))
        };
        println!("{:<10}{}  {}", task.name(), deps, task.description());
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (mut config, root) = match resolve_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    merge_cli_overrides(&mut config, &cli.overrides());
    let config = match check(config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let registry = standard_registry(&config, &root);
    if cli.tasks {
        print_tasks(&registry);
        return ExitCode::from(EXIT_SUCCESS);
    }

    match registry.run(&cli.task) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
