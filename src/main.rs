//! # Liveset Harness CLI (`lset`)
//!
//! The `lset` binary inspects Ableton Live sets and project folders from the
//! command line.
//!
//! ## Usage
//!
//! ```bash
//! lset --config ./config/lset.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lset info <file>` | Load one set and print its metadata |
//! | `lset scan <root>` | List every set under a folder |
//! | `lset projects <root>` | List project folders, valid and invalid |
//! | `lset validate <dir>` | Check one folder against the project conventions |
//! | `lset project <dir>` | Load every set in a project folder |
//! | `lset dump <file>` | Write the parsed document tree as JSON |
//! | `lset paths <file> <key>` | List the paths of every node with a label |
//!
//! ## Examples
//!
//! ```bash
//! # Summary of one set, machine-readable
//! lset info "Song Project/Song.als" --json
//!
//! # Every set under ~/Music, including backups
//! lset scan ~/Music --backups
//!
//! # Where do tempo values live in this document?
//! lset paths "Song Project/Song.als" Tempo
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use liveset_harness::commands;
use liveset_harness::config::{self, Config};
use liveset_harness::progress::ProgressMode;
use liveset_harness::project::BatchPolicy;

const DEFAULT_CONFIG: &str = "./config/lset.toml";

/// Liveset Harness CLI: metadata extraction for Ableton Live sets.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lset.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lset",
    about = "Metadata extraction and project discovery for Ableton Live sets",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lset.toml`; when that file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr: `off`, `human`, or `json`.
    ///
    /// Defaults to `output.progress` from the config, which in turn
    /// defaults to human progress when stderr is a terminal.
    #[arg(long, global = true)]
    progress: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Load one set and print its metadata.
    ///
    /// Shows version, tempo, track counts, the devices and plugins on each
    /// track, and every referenced sample with its classification.
    Info {
        /// Path to the `.als` document.
        file: PathBuf,
    },

    /// List every set under a folder.
    ///
    /// Paths are printed as they are discovered. Sets inside `Backup`
    /// folders are skipped unless `--backups` is given.
    Scan {
        /// Folder to search.
        root: PathBuf,

        /// Include sets stored in `Backup` folders.
        #[arg(long)]
        backups: bool,
    },

    /// List project folders under a folder, with validation errors.
    Projects {
        /// Folder to search.
        root: PathBuf,
    },

    /// Validate one project folder.
    ///
    /// Exits with status 1 when the folder is not a valid project.
    Validate {
        /// The folder to check.
        dir: PathBuf,
    },

    /// Load every set in a project folder.
    ///
    /// Sets are loaded one at a time. A set that fails to load is reported
    /// and skipped unless `--abort-on-error` is given.
    Project {
        /// The project folder.
        dir: PathBuf,

        /// Stop at the first set that fails to load.
        #[arg(long)]
        abort_on_error: bool,
    },

    /// Write the parsed document tree as pretty JSON.
    Dump {
        /// Path to the `.als` document.
        file: PathBuf,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the dotted path of every node with a given label.
    Paths {
        /// Path to the `.als` document.
        file: PathBuf,

        /// Node label to look for, e.g. `Tempo` or `PluginDesc`.
        key: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("liveset_harness=info,lset=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => config::load_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG);
            if path.exists() {
                config::load_config(path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = resolve_config(cli.config.as_deref())?;

    let mode = match cli.progress.as_deref() {
        Some(s) => ProgressMode::parse(s).ok_or_else(|| {
            anyhow::anyhow!("Unknown progress mode: '{}'. Must be off, human, or json.", s)
        })?,
        None => cfg.output.progress_mode()?,
    };
    let sink = mode.reporter();

    match cli.command {
        Commands::Info { file } => {
            commands::run_info(&file, sink.as_ref(), cli.json)?;
        }
        Commands::Scan { root, backups } => {
            let mut options = cfg.scan.scan_options()?;
            options.include_backups |= backups;
            commands::run_scan(&root, &options, cli.json)?;
        }
        Commands::Projects { root } => {
            let options = cfg.scan.scan_options()?;
            commands::run_projects(&root, &options, cli.json)?;
        }
        Commands::Validate { dir } => {
            if !commands::run_validate(&dir, cli.json)? {
                std::process::exit(1);
            }
        }
        Commands::Project {
            dir,
            abort_on_error,
        } => {
            let policy = if abort_on_error {
                BatchPolicy::Abort
            } else {
                cfg.project.batch_policy
            };
            let options = cfg.scan.scan_options()?;
            commands::run_project(&dir, &options, sink.as_ref(), policy, cli.json)?;
        }
        Commands::Dump { file, out } => {
            commands::run_dump(&file, out.as_deref(), sink.as_ref())?;
        }
        Commands::Paths { file, key } => {
            commands::run_paths(&file, &key, sink.as_ref(), cli.json)?;
        }
    }

    Ok(())
}
