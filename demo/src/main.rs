//! StageSafe Trust Core: Demo CLI
//!
//! Runs scripted scenarios against the real aggregation engine, gateway,
//! escalation monitor and alert ledger, wired to in-memory stores.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- ratings
//!   cargo run -p demo -- check-in
//!   cargo run -p demo -- watch --sessions 12 --minutes 45
//!   cargo run -p demo -- --config stagesafe.toml check-in

mod scenarios;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stagesafe_config::StageSafeConfig;
use stagesafe_contracts::error::TrustResult;

use scenarios::{checkin, ratings, watch};

// ── CLI definition ────────────────────────────────────────────────────────────

/// StageSafe: venue trust aggregation and safety check-in demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "StageSafe trust core demo",
    long_about = "Runs StageSafe demo scenarios showing concurrent rating aggregation,\n\
                  check-in reconciliation and overdue escalation."
)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Concurrent ratings and incidents folded into venue aggregates.
    Ratings,
    /// Check-out, timeout and the race between them, on a scripted clock.
    CheckIn,
    /// Background monitor escalating a batch of expired check-ins.
    Watch {
        /// Number of check-ins to open.
        #[arg(long, default_value_t = 8)]
        sessions: usize,
        /// Planned duration of each check-in, in minutes.
        #[arg(long, default_value_t = 30)]
        minutes: i64,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_target(false)
        .compact()
        .init();

    print_banner(&config);

    let result = match cli.command {
        Command::RunAll => run_all(&config).await,
        Command::Ratings => ratings::run_scenario(),
        Command::CheckIn => checkin::run_scenario(&config),
        Command::Watch { sessions, minutes } => {
            watch::run_scenario(&config, sessions, minutes).await
        }
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> TrustResult<StageSafeConfig> {
    match &cli.config {
        Some(path) => StageSafeConfig::from_file(path),
        None => Ok(StageSafeConfig::default()),
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run_all(config: &StageSafeConfig) -> TrustResult<()> {
    ratings::run_scenario()?;
    checkin::run_scenario(config)?;
    let minutes = 30_i64.clamp(
        config.checkin.min_duration_minutes,
        config.checkin.max_duration_minutes,
    );
    watch::run_scenario(config, 8, minutes).await?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner(config: &StageSafeConfig) {
    println!();
    println!("StageSafe: Venue Trust & Safety Check-In Core");
    println!("==============================================");
    println!();
    println!("  [1] Ratings fold into per-venue running means under a per-venue lock");
    println!("  [2] Incidents add a severity weight (low 1, medium 2, high 3, critical 5)");
    println!("  [3] Check-ins close through one conditional update: Active → CheckedOut | Overdue");
    println!(
        "  [4] The monitor sweeps every {} ms and alerts exactly once per overdue check-in",
        config.monitor.sweep_interval_ms
    );
    println!("  [5] Every alert is appended to a SHA-256 hash-chained ledger");
    println!();
    println!(
        "Check-in duration bounds: {}..={} minutes",
        config.checkin.min_duration_minutes, config.checkin.max_duration_minutes
    );
    println!();
}
