/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The shared game-state aggregate.
//!
//! [`GameState`] holds the three public counters and the terminal
//! [`GameOutcome`].  One instance is created per round and handed to every
//! task behind an `Arc`; no task keeps a private copy of a counter.
//!
//! # Writers
//!
//! Each kind of mutation has exactly one owning task.  Adding a feature that
//! writes a counter from a new place must update this table:
//!
//! | Field | Mutation | Owner |
//! |---|---|---|
//! | population | virus spread | Game Clock |
//! | population | contamination penalty | deadline timer callback |
//! | population | forced to 0 | Lab Arbiter on an arbitration violation |
//! | vaccine | shipped vaccine | Clue consumer |
//! | medicine | +1 per shipped pill | Medicine producer |
//! | medicine | consumed by spread | Game Clock |
//! | outcome | latched on a boundary | whoever crosses it |
//!
//! Counters and outcome live behind one short-lived lock.  A mutator checks
//! the outcome, changes its counter and re-evaluates the boundaries in the
//! same critical section, so once WIN or LOSE is latched no counter moves
//! again.  Every mutator returns `None` after that point.
//!
//! The lock is a `std::sync::Mutex`: it is taken from async tasks and
//! blocking threads alike and never held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Starting (and maximum) population percentage.
pub const POPULATION_FULL: u8 = 100;

/// Vaccine percentage at which the round is won.
pub const VACCINE_TARGET: u8 = 100;

// ── GameOutcome ───────────────────────────────────────────────────────────────

/// Terminal state of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameOutcome {
    #[default]
    InProgress,
    Win,
    Lose,
}

impl GameOutcome {
    /// `true` once the round is decided.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameOutcome::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameOutcome::InProgress => "IN_PROGRESS",
            GameOutcome::Win => "WIN",
            GameOutcome::Lose => "LOSE",
        }
    }
}

impl std::fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Read-only views ───────────────────────────────────────────────────────────

/// Point-in-time copy of the public counters, for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub population: u8,
    pub vaccine: u8,
    pub medicine: u8,
    pub outcome: GameOutcome,
}

/// What one virus-spread event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadReport {
    /// Pills consumed from stock.
    pub medicine_used: u8,
    /// Population percentage lost after medicine absorbed its share.
    pub population_lost: u8,
    /// Population after the event.
    pub population: u8,
}

// ── GameState ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Counters {
    population: u8,
    vaccine: u8,
    medicine: u8,
    outcome: GameOutcome,
}

impl Counters {
    /// Latch WIN or LOSE if a boundary has been crossed.  Returns the newly
    /// decided outcome, or `None` if nothing changed.
    fn settle(&mut self) -> Option<GameOutcome> {
        if self.outcome.is_terminal() {
            return None;
        }
        let next = if self.vaccine >= VACCINE_TARGET {
            GameOutcome::Win
        } else if self.population == 0 {
            GameOutcome::Lose
        } else {
            return None;
        };
        self.outcome = next;
        Some(next)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            population: self.population,
            vaccine: self.vaccine,
            medicine: self.medicine,
            outcome: self.outcome,
        }
    }
}

/// Counters and outcome for one game round.
#[derive(Debug)]
pub struct GameState {
    counters: Mutex<Counters>,
    /// Mirrors `counters.outcome` for waiters; written only while
    /// `counters` is held.
    outcome: watch::Sender<GameOutcome>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Fresh round: population 100 %, no vaccine, no medicine.
    pub fn new() -> Self {
        Self::with_counters(POPULATION_FULL, 0, 0)
    }

    /// Round starting from arbitrary counters (clamped into range).
    pub fn with_counters(population: u8, vaccine: u8, medicine: u8) -> Self {
        let mut counters = Counters {
            population: population.min(POPULATION_FULL),
            vaccine: vaccine.min(VACCINE_TARGET),
            medicine,
            outcome: GameOutcome::InProgress,
        };
        counters.settle();
        let (outcome, _) = watch::channel(counters.outcome);
        Self {
            counters: Mutex::new(counters),
            outcome,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn population(&self) -> u8 {
        self.lock().population
    }

    pub fn vaccine(&self) -> u8 {
        self.lock().vaccine
    }

    pub fn medicine(&self) -> u8 {
        self.lock().medicine
    }

    pub fn outcome(&self) -> GameOutcome {
        self.lock().outcome
    }

    /// `true` once WIN or LOSE has been latched.
    pub fn is_over(&self) -> bool {
        self.outcome().is_terminal()
    }

    /// All counters read under one lock.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    /// Subscribe to outcome transitions.
    pub fn subscribe(&self) -> watch::Receiver<GameOutcome> {
        self.outcome.subscribe()
    }

    /// Resolves once the round has a terminal outcome.
    pub async fn finished(&self) -> GameOutcome {
        let mut rx = self.outcome.subscribe();
        // The sender lives in `self`; an error is only possible in teardown.
        if rx.wait_for(GameOutcome::is_terminal).await.is_err() {
            debug!("outcome channel closed while waiting");
        }
        self.outcome()
    }

    // ── Mutators ──────────────────────────────────────────────────────────────

    /// Background virus spread: medicine absorbs up to `strength` points,
    /// the remainder comes off the population.
    pub fn apply_spread(&self, strength: u8) -> Option<SpreadReport> {
        self.mutate(|c| {
            let medicine_used = c.medicine.min(strength);
            let population_lost = strength - medicine_used;
            c.medicine -= medicine_used;
            c.population = c.population.saturating_sub(population_lost);
            SpreadReport {
                medicine_used,
                population_lost,
                population: c.population,
            }
        })
    }

    /// Contamination penalty, clamped at 0.  Returns the new population.
    pub fn apply_contamination(&self, strength: u8) -> Option<u8> {
        self.mutate(|c| {
            c.population = c.population.saturating_sub(strength);
            c.population
        })
    }

    /// Credit a shipped vaccine, clamped at [`VACCINE_TARGET`].  Returns the
    /// new vaccine level.
    pub fn add_vaccine(&self, strength: u8) -> Option<u8> {
        self.mutate(|c| {
            c.vaccine = c.vaccine.saturating_add(strength).min(VACCINE_TARGET);
            c.vaccine
        })
    }

    /// Credit one medicine pill.  Saturates at the token width.
    pub fn add_medicine(&self) -> Option<u8> {
        self.mutate(|c| {
            c.medicine = c.medicine.saturating_add(1);
            c.medicine
        })
    }

    /// End the round as lost and zero the population.
    ///
    /// Returns `false` without touching any counter when the round was
    /// already decided.
    pub fn force_lose(&self) -> bool {
        let mut c = self.lock();
        if c.outcome.is_terminal() {
            debug!(current = %c.outcome, "force_lose after the round was decided");
            return false;
        }
        c.population = 0;
        c.outcome = GameOutcome::Lose;
        self.publish(&c);
        true
    }

    /// Evaluate the boundary conditions and latch the outcome if one has
    /// been crossed.  A vaccine at target wins even if population is 0.
    pub fn settle(&self) -> GameOutcome {
        let mut c = self.lock();
        if c.settle().is_some() {
            self.publish(&c);
        }
        c.outcome
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters are plain integers; a panicking holder cannot leave them
        // half-written.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check, apply and settle in one critical section.
    fn mutate<T>(&self, f: impl FnOnce(&mut Counters) -> T) -> Option<T> {
        let mut c = self.lock();
        if c.outcome.is_terminal() {
            return None;
        }
        let out = f(&mut c);
        if c.settle().is_some() {
            self.publish(&c);
        }
        Some(out)
    }

    /// Forward a freshly latched outcome to waiters.  Called with the
    /// counters lock held so the two views never disagree.
    fn publish(&self, c: &Counters) {
        self.outcome.send_replace(c.outcome);
        info!(
            outcome    = %c.outcome,
            population = c.population,
            vaccine    = c.vaccine,
            medicine   = c.medicine,
            "round decided"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
