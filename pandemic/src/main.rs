/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use pandemic::clock::rng::{RangeRng, SeededRng};
use pandemic::config::GameConfig;
use pandemic::game::Game;
use pandemic::state::GameOutcome;
use pandemic::telemetry::LogSink;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Pandemic – real-time epidemic-response game.
///
/// Example:
///   pandemic --config configs/classic.yaml --seed 42
#[derive(Debug, Parser)]
#[command(
    name = "pandemic",
    about = "Pandemic – contain the outbreak, research the vaccine",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML game configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Seed for a reproducible round (overrides the file).
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Default log level when RUST_LOG is not set.
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=pandemic=trace).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    info!("Pandemic starting up...");

    // ── Load game configuration ───────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => match GameConfig::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("Failed to load game configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using classic game settings");
            GameConfig::default()
        }
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    info!(
        tick_ms        = config.tick.as_millis() as u64,
        deadline_ms    = config.contamination_deadline.as_millis() as u64,
        vaccine_ms     = config.vaccine_delay.as_millis() as u64,
        medicine_ms    = config.medicine_delay.as_millis() as u64,
        min_stock      = ?config.min_medicine_stock,
        seed           = ?config.seed,
        "Configuration"
    );

    let rng: Box<dyn RangeRng> = match config.seed {
        Some(seed) => Box::new(SeededRng::from_seed(seed)),
        None => Box::new(SeededRng::from_entropy()),
    };

    // ── Play one round ────────────────────────────────────────────────────────
    let game = Game::new(config);
    let report = match game.run(rng, Box::new(LogSink::new())).await {
        Ok(report) => report,
        Err(e) => {
            error!("Round aborted: {:#}", e);
            process::exit(1);
        }
    };

    match report.outcome {
        GameOutcome::Win => info!("Vaccine complete – the outbreak is contained."),
        GameOutcome::Lose => info!("The population has fallen – game over."),
        GameOutcome::InProgress => warn!("Round ended without a decision"),
    }
    info!(
        "  population={pop}%  vaccine={vac}%  medicine={med}  ticks={ticks}  \
         contaminations={fired} (engaged={engaged}, breached={breached})  \
         vaccines={shipped} (discarded={discarded}, deferred={deferred})  \
         lab_missions={missions}",
        pop = report.final_counters.population,
        vac = report.final_counters.vaccine,
        med = report.final_counters.medicine,
        ticks = report.clock.ticks,
        fired = report.quarantine.fired,
        engaged = report.quarantine.engaged,
        breached = report.quarantine.breached,
        shipped = report.clues.shipped,
        discarded = report.clues.discarded,
        deferred = report.clues.deferred,
        missions = report.lab_missions,
    );
}
