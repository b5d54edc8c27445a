//! Game Clock – countdowns, event generation and virus spread.
//!
//! The clock owns three independent countdowns, all decremented once per
//! tick:
//!
//! | Countdown | Reseeded to | Event |
//! |---|---|---|
//! | contamination | random in `[min, max]` ticks | open a quarantine window |
//! | clue | `clue_period` | publish a fresh non-zero clue |
//! | virus | `virus_period` | background spread (applied immediately) |
//!
//! [`GameClock::tick`] is the synchronous step and is what the tests drive.
//! [`GameClock::run`] is the async driver: it waits one tick interval
//! between steps, dispatches the events, and stops the moment the round is
//! decided.

pub mod rng;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::pipeline::ClueSender;
use crate::quarantine::Quarantine;
use crate::state::{GameOutcome, GameState, SpreadReport};
use crate::telemetry::{TraceChannel, TraceProbe};
use crate::token::{clue_from_byte, Token};

use rng::RangeRng;

// ── Events ────────────────────────────────────────────────────────────────────

/// Something that happened during one tick, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Contamination countdown expired.
    Contamination,
    /// Clue countdown expired; the clue still has to be published.
    Clue(Token),
    /// Virus countdown expired; spread has already been applied.
    Spread(SpreadReport),
}

/// Counters for one clock run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockStats {
    pub ticks: u64,
    pub contaminations: u64,
    pub clues_emitted: u64,
    pub spreads: u64,
}

// ── GameClock ─────────────────────────────────────────────────────────────────

pub struct GameClock {
    tick_interval: Duration,
    contamination_range: (u16, u16),
    clue_period: u16,
    virus_period: u16,
    spread_strength: u8,

    contamination_left: u16,
    clue_left: u16,
    virus_left: u16,

    rng: Box<dyn RangeRng>,
    stats: ClockStats,
}

impl GameClock {
    /// Countdowns start at the contamination lower bound and at the fixed
    /// clue / virus periods.
    pub fn new(cfg: &GameConfig, rng: Box<dyn RangeRng>) -> Self {
        Self {
            tick_interval: cfg.tick,
            contamination_range: (cfg.contamination_period_min, cfg.contamination_period_max),
            clue_period: cfg.clue_period,
            virus_period: cfg.virus_period,
            spread_strength: cfg.virus_spread_strength,
            contamination_left: cfg.contamination_period_min,
            clue_left: cfg.clue_period,
            virus_left: cfg.virus_period,
            rng,
            stats: ClockStats::default(),
        }
    }

    /// Ticks left on (contamination, clue, virus).
    pub fn countdowns(&self) -> (u16, u16, u16) {
        (self.contamination_left, self.clue_left, self.virus_left)
    }

    pub fn stats(&self) -> ClockStats {
        self.stats
    }

    /// Advance every countdown by one tick and return the events that fired.
    ///
    /// Spread is applied to `state` here; contamination and clue events are
    /// returned for the caller to dispatch.
    pub fn tick(&mut self, state: &GameState) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        self.stats.ticks += 1;

        self.contamination_left = self.contamination_left.saturating_sub(1);
        self.clue_left = self.clue_left.saturating_sub(1);
        self.virus_left = self.virus_left.saturating_sub(1);

        if self.contamination_left == 0 {
            let (lo, hi) = self.contamination_range;
            self.contamination_left = self.rng.next_in(lo, hi);
            self.stats.contaminations += 1;
            debug!(next_in = self.contamination_left, "contamination countdown expired");
            events.push(ClockEvent::Contamination);
        }

        if self.clue_left == 0 {
            self.clue_left = self.clue_period;
            let clue = clue_from_byte(self.rng.next_byte());
            self.stats.clues_emitted += 1;
            debug!(clue, "clue released");
            events.push(ClockEvent::Clue(clue));
        }

        if self.virus_left == 0 {
            self.virus_left = self.virus_period;
            if let Some(report) = state.apply_spread(self.spread_strength) {
                self.stats.spreads += 1;
                info!(
                    medicine_used   = report.medicine_used,
                    population_lost = report.population_lost,
                    population      = report.population,
                    "virus spread"
                );
                events.push(ClockEvent::Spread(report));
            }
        }

        events
    }

    /// Drive the round until it is decided.
    ///
    /// Publishing a clue waits for the single slot to drain, so the clock
    /// stalls while the previous clue is still unconsumed.  Dropping the
    /// sender on return closes the slot for the consumer.
    pub async fn run(
        mut self,
        state: Arc<GameState>,
        quarantine: Arc<Quarantine>,
        clues: ClueSender,
        probe: Arc<dyn TraceProbe>,
    ) -> ClockStats {
        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'round: while !state.is_over() {
            ticker.tick().await;

            probe.signal(TraceChannel::Clock, true);
            let events = self.tick(&state);
            probe.signal(TraceChannel::Clock, false);

            for event in events {
                if state.is_over() {
                    break 'round;
                }
                match event {
                    ClockEvent::Contamination => {
                        quarantine.fire(&state).await;
                    }
                    ClockEvent::Clue(clue) => {
                        let published = tokio::select! {
                            r = clues.publish(clue) => r,
                            _ = state.finished() => break 'round,
                        };
                        if let Err(e) = published {
                            debug!(clue, "clue not delivered: {e}");
                            break 'round;
                        }
                    }
                    ClockEvent::Spread(_) => {}
                }
            }
        }

        let outcome = state.outcome();
        info!(
            ticks = self.stats.ticks,
            outcome = %outcome,
            "game clock stopped"
        );
        if outcome == GameOutcome::InProgress {
            debug!("clock stopped before the round was decided");
        }
        self.stats
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
