#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless encounter director session.

mod session;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use encounter_director_system_director::DirectorConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use session::SessionOptions;

/// Runs a scripted encounter session and prints what happened.
#[derive(Debug, Parser)]
#[command(name = "encounter-director", version, about)]
struct CliArgs {
    /// Encounter configuration file.
    #[arg(short, long, default_value = "config/encounter.toml")]
    config: PathBuf,
    /// Overrides the session seed declared by the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 1_200)]
    ticks: u32,
    /// Number of players joining the session.
    #[arg(long, default_value_t = 2)]
    players: u32,
    /// Kills the oldest hostile every N ticks; zero disables kills.
    #[arg(long, default_value_t = 5)]
    kill_every: u32,
    /// Resets the progression before the given tick.
    #[arg(long)]
    reset_at: Option<u32>,
    /// Pauses the session before the given tick.
    #[arg(long)]
    pause_at: Option<u32>,
    /// Resumes a paused session before the given tick.
    #[arg(long)]
    resume_at: Option<u32>,
    /// Fails instead of warning when the configuration has issues.
    #[arg(long)]
    strict: bool,
}

/// Entry point for the encounter director command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    if args.tick_ms == 0 {
        bail!("--tick-ms must be greater than zero");
    }

    let contents = fs::read_to_string(&args.config).with_context(|| {
        format!(
            "failed to read encounter configuration at {}",
            args.config.display()
        )
    })?;
    let mut config = DirectorConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let issues = config.validate();
    if args.strict && !issues.is_empty() {
        let listed = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n  ");
        bail!(
            "{} has {} configuration issue(s):\n  {listed}",
            args.config.display(),
            issues.len()
        );
    }

    info!(
        config = %args.config.display(),
        seed = config.seed,
        ticks = args.ticks,
        "starting encounter session"
    );
    let summary = session::run(
        config,
        SessionOptions {
            tick: Duration::from_millis(args.tick_ms),
            ticks: args.ticks,
            players: args.players,
            kill_every: args.kill_every,
            reset_at: args.reset_at,
            pause_at: args.pause_at,
            resume_at: args.resume_at,
        },
    );
    println!("{summary}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
