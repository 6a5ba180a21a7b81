mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use playsona::config::PlaysonaConfig;
use playsona::persona::types::SessionLength;
use playsona::persona::PersonaEngine;

#[derive(Parser)]
#[command(name = "playsona", version, about = "Player persona and mood-aware game recommendations")]
struct Cli {
    /// Config file (defaults to ~/.playsona/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the signals and persona derived from a library
    Profile {
        /// Library JSON file
        #[arg(long)]
        library: PathBuf,
        /// Mood you are in right now
        #[arg(long)]
        mood: Option<String>,
    },
    /// Assign every game to a mood category
    Categorize {
        #[arg(long)]
        library: PathBuf,
        /// Report category overlap instead of assignments
        #[arg(long)]
        validate: bool,
    },
    /// Rank the library for right now
    Recommend {
        #[arg(long)]
        library: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Hour of day (0-23) to recommend for
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
        #[arg(long)]
        mood: Option<String>,
        /// short, medium or long
        #[arg(long)]
        session: Option<SessionLength>,
    },
    /// Record an identity snapshot if one is due, then check milestones
    Snapshot {
        #[arg(long)]
        library: PathBuf,
        /// Record even if the last snapshot is recent
        #[arg(long)]
        force: bool,
    },
    /// Show unlocked milestones and progress
    Milestones,
    /// Manage the identity snapshot history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List snapshots, newest first
    List,
    /// Show one snapshot in full
    Show { id: String },
    /// Delete one snapshot
    Delete { id: String },
    /// Export all snapshots as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the history with the snapshots in an export file
    Import { file: PathBuf },
    /// History statistics
    Stats,
    /// Delete every snapshot
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PlaysonaConfig::load_from(path)?,
        None => PlaysonaConfig::load()?,
    };

    // Log to stderr so stdout carries only command output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = PersonaEngine::from_config(config)?;
    let json = cli.json;

    match cli.command {
        Command::Profile { library, mood } => {
            cli::profile::profile(&engine, &library, mood.as_deref(), json)?;
        }
        Command::Categorize { library, validate } => {
            cli::categorize::categorize(&engine, &library, validate, json)?;
        }
        Command::Recommend {
            library,
            limit,
            hour,
            mood,
            session,
        } => {
            cli::recommend::recommend(
                &engine,
                cli::recommend::RecommendArgs {
                    library: &library,
                    limit,
                    hour,
                    mood: mood.as_deref(),
                    session,
                    json,
                },
            )?;
        }
        Command::Snapshot { library, force } => {
            cli::snapshot::snapshot(&engine, &library, force, json)?;
        }
        Command::Milestones => cli::milestones::milestones(&engine, json)?,
        Command::History { action } => match action {
            HistoryAction::List => cli::inspect::list(&engine, json)?,
            HistoryAction::Show { id } => cli::inspect::show(&engine, &id, json)?,
            HistoryAction::Delete { id } => cli::reset::delete(&engine, &id)?,
            HistoryAction::Export { output } => cli::export::export(&engine, output.as_deref())?,
            HistoryAction::Import { file } => cli::import::import(&engine, &file)?,
            HistoryAction::Stats => cli::stats::stats(&engine, json)?,
            HistoryAction::Clear { yes } => cli::reset::clear(&engine, yes)?,
        },
    }

    Ok(())
}
