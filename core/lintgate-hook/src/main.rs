//! lintgate: edit-triggered lint and test runner.
//!
//! Configured as a `PostToolUse` hook. Each edit event arrives as JSON on stdin;
//! the hook finds the project's lint and test commands, runs them in parallel, and
//! reports one message on stderr with exit code 2.
//!
//! ## Subcommands
//!
//! - `validate`: Hook handler (the default when no subcommand is given)
//! - `skip` / `unskip`: Per-directory opt-outs
//! - `config`: Show or initialise `config.json`

mod handle;
mod logging;
mod skip_cmd;

use clap::{Args, Parser, Subcommand};
use lintgate_core::config::{
    debug_from_env, load_config, load_settings, save_config, CliOverrides, ENV_DEBUG,
};
use lintgate_core::{GateError, SkipKind, SkipRegistry, StorageConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lintgate")]
#[command(about = "Runs a project's lint and test commands after each edit")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct ValidateArgs {
    /// Per-kind timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Seconds after a run during which new runs are skipped
    #[arg(short, long, value_name = "SECS")]
    cooldown: Option<u64>,

    /// Log debug output to stderr and the log file
    #[arg(long)]
    debug: bool,
}

#[derive(Args)]
struct DirArg {
    /// Directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Validate(ValidateArgs),

    /// Skip lint and/or test runs for a directory
    Skip {
        #[command(subcommand)]
        action: SkipAction,
    },

    /// Re-enable runs for a directory (no kind: remove every skip)
    Unskip {
        #[command(subcommand)]
        action: Option<UnskipAction>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SkipAction {
    /// Skip linting
    Lint(DirArg),
    /// Skip testing
    Test(DirArg),
    /// Skip linting and testing
    All(DirArg),
    /// List every directory with skips
    List,
    /// Show skips for a directory
    Status(DirArg),
}

#[derive(Subcommand)]
enum UnskipAction {
    Lint(DirArg),
    Test(DirArg),
    All(DirArg),
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings as JSON
    Show,
    /// Write a config.json with defaults if none exists
    Init,
}

fn run_skip(registry: &SkipRegistry, action: SkipAction) -> Result<String, GateError> {
    let (kind, dir) = match action {
        SkipAction::List => return skip_cmd::list(registry),
        SkipAction::Status(arg) => {
            let dir = skip_cmd::resolve_dir(arg.dir.as_deref())?;
            return skip_cmd::status(registry, &dir);
        }
        SkipAction::Lint(arg) => (SkipKind::Lint, arg.dir),
        SkipAction::Test(arg) => (SkipKind::Test, arg.dir),
        SkipAction::All(arg) => (SkipKind::All, arg.dir),
    };
    let dir = skip_cmd::resolve_dir(dir.as_deref())?;
    skip_cmd::skip(registry, kind, &dir)
}

fn run_unskip(registry: &SkipRegistry, action: Option<UnskipAction>) -> Result<String, GateError> {
    let (kind, dir) = match action {
        None => (None, None),
        Some(UnskipAction::Lint(arg)) => (Some(SkipKind::Lint), arg.dir),
        Some(UnskipAction::Test(arg)) => (Some(SkipKind::Test), arg.dir),
        Some(UnskipAction::All(arg)) => (Some(SkipKind::All), arg.dir),
    };
    let dir = skip_cmd::resolve_dir(dir.as_deref())?;
    skip_cmd::unskip(registry, kind, &dir)
}

fn run_config(storage: &StorageConfig, action: ConfigAction) -> Result<String, GateError> {
    match action {
        ConfigAction::Show => {
            let settings = load_settings(storage, CliOverrides::default());
            serde_json::to_string_pretty(&settings).map_err(|source| GateError::Json {
                context: "serializing settings".to_string(),
                source,
            })
        }
        ConfigAction::Init => {
            let path = storage.config_file();
            if path.exists() {
                return Ok(format!("Config already exists at {}", path.display()));
            }
            save_config(storage, &load_config(storage))?;
            Ok(format!("Wrote default config to {}", path.display()))
        }
    }
}

/// Prints a management command's result; failures exit 1.
fn report(result: Result<String, GateError>) {
    match result {
        Ok(message) => println!("{}", message),
        Err(e) => {
            tracing::error!(error = %e, "lintgate command failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let storage = StorageConfig::default();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Validate(ValidateArgs::default()));

    let debug = match &command {
        Commands::Validate(args) => args.debug,
        _ => false,
    } || debug_from_env(std::env::var(ENV_DEBUG).ok());
    let logging_guard = logging::init(&storage, debug);

    match command {
        Commands::Validate(args) => {
            let settings = load_settings(
                &storage,
                CliOverrides {
                    timeout_secs: args.timeout,
                    cooldown_secs: args.cooldown,
                    debug: args.debug,
                },
            );
            let code = handle::run(&storage, &settings);
            // Flush buffered log lines before exiting.
            drop(logging_guard);
            std::process::exit(code);
        }
        Commands::Skip { action } => report(run_skip(&SkipRegistry::new(&storage), action)),
        Commands::Unskip { action } => report(run_unskip(&SkipRegistry::new(&storage), action)),
        Commands::Config { action } => report(run_config(&storage, action)),
    }
}
