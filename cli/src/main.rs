//! Tally CLI - binary entry point.
//!
//! ```text
//! tally [--config <path>] create <candidates.json>
//! tally [--config <path>] serve
//! tally [--config <path>] show
//! tally [--config <path>] pending
//! tally [--config <path>] export [file]
//! ```
//!
//! Standard output is reserved for command output; logs go to
//! `<config dir>/logs/tally.log`, or to standard error if no log file can be
//! opened.

mod serve;

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tally_config::{Settings, TallyConfig, config_path};
use tally_core::Dispatcher;
use tally_engine::{Engine, SeedEntry, export_records, seed_poll};
use tally_store::{FileStore, PollStore};
use tally_types::format_views;
use tally_utils::atomic_write;

#[derive(Debug, Parser)]
#[command(name = "tally")]
#[command(about = "Point-budget group polls over a line-based command interface")]
struct Cli {
    /// Config file (default: $TALLY_CONFIG or ~/.tally/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Seed a new poll from a JSON array of {text, proposer, id}
    Create {
        /// Candidates file
        file: PathBuf,
    },
    /// Read `<participant> <command> [args]` lines from stdin
    Serve,
    /// Print the current result and progress
    Show,
    /// Print mentions of participants who can still vote
    Pending,
    /// Export the votes of a closed poll as JSON
    Export {
        /// Output file (default: standard output)
        file: Option<PathBuf>,
    },
}

fn init_tracing(config: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file(config);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::debug!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Standard output carries screens and exports; never log there.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(config: Option<&Path>) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(config) {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(config: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: next to the config file, e.g. ~/.tally/logs/tally.log
    let config = config.map(Path::to_path_buf).or_else(config_path);
    if let Some(config_path) = config
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("tally.log"));
    }

    candidates.push(PathBuf::from(".tally").join("logs").join("tally.log"));
    candidates
}

fn engine_for(settings: &Settings) -> Engine {
    Engine::new(settings.roster.clone()).with_activity_check(settings.activity_check)
}

fn create(settings: &Settings, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read candidates from {}", file.display()))?;
    let entries: Vec<SeedEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse candidates in {}", file.display()))?;

    let mut store = FileStore::new(&settings.data_dir);
    let poll = seed_poll(
        &mut store,
        &settings.poll_id,
        &settings.roster,
        settings.kind,
        &settings.result_sink,
        &entries,
    )
    .with_context(|| format!("failed to create poll '{}'", settings.poll_id))?;

    println!(
        "Created poll '{}' with {} candidates",
        settings.poll_id,
        poll.candidates().len()
    );
    Ok(())
}

fn serve_stdio(settings: &Settings) -> Result<()> {
    let store = FileStore::new(&settings.data_dir);
    let mut dispatcher = Dispatcher::open(store, settings.poll_id.clone(), engine_for(settings))
        .with_context(|| format!("failed to open poll '{}'", settings.poll_id))?;

    let handled = serve::serve(&mut dispatcher, io::stdin().lock(), io::stdout().lock())
        .context("stdio session failed")?;
    tracing::info!(handled, "Input closed");

    if dispatcher.is_degraded() {
        bail!("poll '{}' has unsaved changes", settings.poll_id);
    }
    Ok(())
}

fn show(settings: &Settings) -> Result<()> {
    let store = FileStore::new(&settings.data_dir);
    let poll = store
        .open(&settings.poll_id)
        .with_context(|| format!("failed to open poll '{}'", settings.poll_id))?;
    let engine = engine_for(settings);

    let mut out = io::stdout().lock();
    let state = if poll.is_closed() { "closed" } else { "open" };
    writeln!(out, "Poll '{}' ({}, {state})", settings.poll_id, poll.kind().as_str())?;
    writeln!(out, "{}", engine.progress(&poll))?;
    writeln!(out)?;
    writeln!(out, "{}", format_views(&engine.result(&poll, true)))?;
    Ok(())
}

fn pending(settings: &Settings) -> Result<()> {
    let store = FileStore::new(&settings.data_dir);
    let poll = store
        .open(&settings.poll_id)
        .with_context(|| format!("failed to open poll '{}'", settings.poll_id))?;

    let mentions = engine_for(settings).pending_mentions(&poll);
    if !mentions.is_empty() {
        println!("{}", mentions.join(" "));
    }
    Ok(())
}

fn export(settings: &Settings, file: Option<&Path>) -> Result<()> {
    let store = FileStore::new(&settings.data_dir);
    let poll = store
        .open(&settings.poll_id)
        .with_context(|| format!("failed to open poll '{}'", settings.poll_id))?;

    let records = export_records(&poll, &settings.roster)
        .with_context(|| format!("cannot export poll '{}'", settings.poll_id))?;
    let mut json = serde_json::to_string_pretty(&records)?;
    json.push('\n');

    match file {
        Some(path) => {
            atomic_write(path, json.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                poll = %settings.poll_id,
                sink = settings.result_sink.as_str(),
                path = %path.display(),
                "Export written"
            );
        }
        None => io::stdout().lock().write_all(json.as_bytes())?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.config.as_deref());

    let settings = TallyConfig::load(cli.config.as_deref()).context("failed to load config")?;
    tracing::debug!(
        config = %settings.path.display(),
        poll = %settings.poll_id,
        data_dir = %settings.data_dir.display(),
        "Config loaded"
    );

    match &cli.command {
        Commands::Create { file } => create(&settings, file),
        Commands::Serve => serve_stdio(&settings),
        Commands::Show => show(&settings),
        Commands::Pending => pending(&settings),
        Commands::Export { file } => export(&settings, file.as_deref()),
    }
}
