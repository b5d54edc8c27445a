/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! One game round: task wiring and lifecycle.
//!
//! ```text
//!  async tasks                         blocking threads
//!  ───────────                         ────────────────
//!  GameClock::run ──clue slot──────►   ClueConsumer::run ─┐
//!        │                                                ├─► Lab
//!        └─ Quarantine::fire           MedicineProducer::run ┘
//!              ├─► run_responder
//!              └─► deadline timer
//!  run_telemetry (read-only)
//! ```
//!
//! [`Game::run`] returns once every task has observed the terminal outcome
//! and stopped.  Producers finish the mission they are in; none of them
//! starts another wait after the round is decided.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clock::rng::RangeRng;
use crate::clock::{ClockStats, GameClock};
use crate::config::GameConfig;
use crate::lab::Lab;
use crate::pipeline::{clue_channel, ClueConsumer, ClueStats, MedicineProducer, MedicineStats};
use crate::quarantine::{Quarantine, QuarantineStats};
use crate::state::{GameOutcome, GameState, Snapshot};
use crate::telemetry::{run_telemetry, TelemetrySink, TraceProbe, TracingProbe};

/// Everything that happened in a finished round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub outcome: GameOutcome,
    pub final_counters: Snapshot,
    pub clock: ClockStats,
    pub clues: ClueStats,
    pub medicine: MedicineStats,
    pub quarantine: QuarantineStats,
    pub lab_missions: u64,
    pub lab_violations: u64,
}

/// Shared resources of one round.
pub struct Game {
    config: GameConfig,
    state: Arc<GameState>,
    lab: Arc<Lab>,
    quarantine: Arc<Quarantine>,
    probe: Arc<dyn TraceProbe>,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self::with_probe(config, Arc::new(TracingProbe))
    }

    pub fn with_probe(config: GameConfig, probe: Arc<dyn TraceProbe>) -> Self {
        let lab = Arc::new(Lab::from_config(&config, Arc::clone(&probe)));
        let quarantine = Arc::new(Quarantine::from_config(&config, Arc::clone(&probe)));
        Self {
            config,
            state: Arc::new(GameState::new()),
            lab,
            quarantine,
            probe,
        }
    }

    pub fn state(&self) -> Arc<GameState> {
        Arc::clone(&self.state)
    }

    pub fn lab(&self) -> Arc<Lab> {
        Arc::clone(&self.lab)
    }

    pub fn quarantine(&self) -> Arc<Quarantine> {
        Arc::clone(&self.quarantine)
    }

    /// Play the round to completion on the current multi-threaded runtime.
    ///
    /// # Errors
    /// If the configuration fails [`GameConfig::validate`] (no task is
    /// started then), or if one of the spawned tasks panicked.
    pub async fn run(
        self,
        rng: Box<dyn RangeRng>,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<RoundReport> {
        let Game {
            config,
            state,
            lab,
            quarantine,
            probe,
        } = self;

        config.validate().context("refusing to start the round")?;

        info!(
            tick_ms      = config.tick.as_millis() as u64,
            clue_period  = config.clue_period,
            virus_period = config.virus_period,
            "round starting"
        );

        let (clue_tx, clue_rx) = clue_channel();

        let consumer = ClueConsumer::new(
            Arc::clone(&lab),
            Arc::clone(&state),
            config.vaccine_strength,
            config.min_medicine_stock,
            Arc::clone(&probe),
        );
        let clue_task = tokio::task::spawn_blocking(move || consumer.run(clue_rx));

        let producer = MedicineProducer::new(
            Arc::clone(&lab),
            Arc::clone(&state),
            config.ship_medicine_delay,
            Arc::clone(&probe),
        );
        let medicine_task = tokio::task::spawn_blocking(move || producer.run());

        let responder_task = tokio::spawn(
            Arc::clone(&quarantine).run_responder(Arc::clone(&state)),
        );
        let telemetry_task = tokio::spawn(run_telemetry(
            Arc::clone(&state),
            sink,
            config.render_period,
        ));

        let clock = GameClock::new(&config, rng);
        let clock_stats = clock
            .run(
                Arc::clone(&state),
                Arc::clone(&quarantine),
                clue_tx,
                Arc::clone(&probe),
            )
            .await;

        // The clock only stops early when the clue consumer is gone.
        if state.force_lose() {
            warn!("game clock stopped with the round undecided: forced LOSE");
        }

        let clues = clue_task.await.context("clue consumer panicked")?;
        let medicine = medicine_task.await.context("medicine producer panicked")?;
        responder_task
            .await
            .context("contamination responder panicked")?;
        telemetry_task.await.context("telemetry sink panicked")?;

        let report = RoundReport {
            outcome: state.outcome(),
            final_counters: state.snapshot(),
            clock: clock_stats,
            clues,
            medicine,
            quarantine: quarantine.stats(),
            lab_missions: lab.missions_completed(),
            lab_violations: lab.violations(),
        };

        info!(
            outcome        = %report.outcome,
            ticks          = report.clock.ticks,
            vaccines       = report.clues.shipped,
            pills          = report.medicine.pills_shipped,
            contaminations = report.quarantine.fired,
            breached       = report.quarantine.breached,
            "round finished"
        );

        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
