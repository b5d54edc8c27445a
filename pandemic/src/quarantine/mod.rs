/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Contamination / quarantine race.
//!
//! A contamination opens a [`WindowStatus::Closed`] window and arms a
//! one-shot deadline timer.  Two independent parties then race:
//!
//! ```text
//!  fire() ──┬── notify ──► responder: lock().await → status = Open → unlock
//!           │
//!           └── timer ───► on_deadline(): try_lock()   (never waits)
//!                            ├─ Ok + Open   → reset Closed, no damage
//!                            ├─ Ok + Closed → RaceLoss, population −strength
//!                            └─ lock held   → RaceLoss, population −strength
//! ```
//!
//! The timer and the responder are unordered.  A responder that
//! is never scheduled before the deadline (starved by a busier task, or
//! still sitting on the lock when the timer peeks) costs the population the
//! full strength every time.
//!
//! `fire()` takes the quarantine lock itself and only releases it after the
//! responder has been signalled, so the responder can never engage before
//! the window is fully set up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::state::GameState;
use crate::telemetry::{TraceChannel, TraceProbe};

// ── Window ────────────────────────────────────────────────────────────────────

/// Quarantine status of the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowStatus {
    /// Not (yet) quarantined.
    #[default]
    Closed,
    /// Quarantine engaged in time.
    Open,
}

/// Result of a deadline timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineVerdict {
    /// Quarantine was engaged before the deadline.
    Engaged,
    /// Deadline passed without quarantine; carries the population after the
    /// penalty.
    Breached { population: u8 },
    /// No window was armed (already resolved).
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuarantineStats {
    pub fired: u64,
    pub ignored: u64,
    pub engaged: u64,
    pub breached: u64,
}

// ── Quarantine ────────────────────────────────────────────────────────────────

/// Owns the quarantine lock, the responder signal and the deadline timer.
pub struct Quarantine {
    /// The quarantine lock.  Guards the window status.
    lock: Mutex<WindowStatus>,
    /// A window is open and its deadline has not fired yet.
    armed: AtomicBool,
    signal: Notify,

    deadline: Duration,
    strength: u8,
    probe: Arc<dyn TraceProbe>,

    fired: AtomicU64,
    ignored: AtomicU64,
    engaged: AtomicU64,
    breached: AtomicU64,
}

impl Quarantine {
    pub fn new(deadline: Duration, strength: u8, probe: Arc<dyn TraceProbe>) -> Self {
        Self {
            lock: Mutex::new(WindowStatus::Closed),
            armed: AtomicBool::new(false),
            signal: Notify::new(),
            deadline,
            strength,
            probe,
            fired: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
            engaged: AtomicU64::new(0),
            breached: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &GameConfig, probe: Arc<dyn TraceProbe>) -> Self {
        Self::new(cfg.contamination_deadline, cfg.contamination_strength, probe)
    }

    // ── Contamination side ────────────────────────────────────────────────────

    /// Open a window, arm its deadline and signal the responder.
    ///
    /// A window cannot be restarted: a contamination that arrives while the
    /// previous window is still armed is ignored and `false` is returned.
    /// The deadline is measured from the moment the window opens.
    pub async fn fire(self: &Arc<Self>, state: &Arc<GameState>) -> bool {
        let mut status = self.lock.lock().await;

        if self.armed.load(Ordering::SeqCst) {
            self.ignored.fetch_add(1, Ordering::SeqCst);
            warn!("contamination while a quarantine window is still open: ignored");
            return false;
        }

        *status = WindowStatus::Closed;
        self.armed.store(true, Ordering::SeqCst);
        self.fired.fetch_add(1, Ordering::SeqCst);
        info!(
            deadline_ms = self.deadline.as_millis() as u64,
            strength    = self.strength,
            "contamination! quarantine window open"
        );

        self.spawn_deadline(Arc::clone(state));
        self.signal.notify_one();

        drop(status);
        true
    }

    /// One-shot timer service for the current window.
    fn spawn_deadline(self: &Arc<Self>, state: Arc<GameState>) {
        let quarantine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(quarantine.deadline).await;
            quarantine.on_deadline(&state);
        });
    }

    /// Deadline callback.  Peeks the quarantine lock without waiting.
    pub fn on_deadline(&self, state: &GameState) -> DeadlineVerdict {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return DeadlineVerdict::Stale;
        }

        let engaged = match self.lock.try_lock() {
            Ok(mut status) => {
                let open = *status == WindowStatus::Open;
                *status = WindowStatus::Closed;
                open
            }
            Err(_) => {
                debug!("quarantine lock held at deadline");
                false
            }
        };

        if engaged {
            self.engaged.fetch_add(1, Ordering::SeqCst);
            info!("quarantine engaged in time: no casualties");
            return DeadlineVerdict::Engaged;
        }

        self.breached.fetch_add(1, Ordering::SeqCst);
        let population = state
            .apply_contamination(self.strength)
            .unwrap_or_else(|| state.population());
        let loss = GameError::RaceLoss {
            strength: self.strength,
            population,
        };
        warn!(strength = self.strength, population, "{loss}");
        DeadlineVerdict::Breached { population }
    }

    // ── Responder side ────────────────────────────────────────────────────────

    /// Acquire the quarantine lock and mark the window engaged.
    ///
    /// Returns `false` when no window is armed any more (the deadline won).
    pub async fn engage(&self) -> bool {
        let mut status = self.lock.lock().await;
        if !self.armed.load(Ordering::SeqCst) {
            debug!("no armed quarantine window: too late");
            return false;
        }
        *status = WindowStatus::Open;
        debug!("quarantine engaged");
        true
    }

    /// Contamination responder task: engage quarantine on every signal until
    /// the round is decided.
    pub async fn run_responder(self: Arc<Self>, state: Arc<GameState>) {
        loop {
            tokio::select! {
                biased;
                _ = state.finished() => break,
                _ = self.signal.notified() => {}
            }
            self.probe.signal(TraceChannel::Responder, true);
            self.engage().await;
            self.probe.signal(TraceChannel::Responder, false);
        }
        debug!("contamination responder exiting");
    }

    // ── Observation ───────────────────────────────────────────────────────────

    /// Window status, or `None` while someone holds the quarantine lock.
    pub fn status(&self) -> Option<WindowStatus> {
        self.lock.try_lock().ok().map(|s| *s)
    }

    /// `true` while a window is open and its deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> QuarantineStats {
        QuarantineStats {
            fired: self.fired.load(Ordering::SeqCst),
            ignored: self.ignored.load(Ordering::SeqCst),
            engaged: self.engaged.load(Ordering::SeqCst),
            breached: self.breached.load(Ordering::SeqCst),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameOutcome;
    use crate::telemetry::NoopProbe;

    fn quarantine(deadline_ms: u64) -> Arc<Quarantine> {
        Arc::new(Quarantine::new(
            Duration::from_millis(deadline_ms),
            20,
            Arc::new(NoopProbe),
        ))
    }

    // ── Race outcomes ─────────────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn missed_deadline_costs_contamination_strength() {
        let q = quarantine(10);
        let state = Arc::new(GameState::new());

        assert!(q.fire(&state).await);
        // No responder is running.
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(state.population(), 80);
        assert_eq!(q.stats().breached, 1);
        assert!(!q.is_armed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn responder_in_time_prevents_damage() {
        let q = quarantine(50);
        let state = Arc::new(GameState::new());
        let responder = tokio::spawn(Arc::clone(&q).run_responder(Arc::clone(&state)));

        assert!(q.fire(&state).await);
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(state.population(), 100);
        assert_eq!(q.stats().engaged, 1);
        assert_eq!(q.status(), Some(WindowStatus::Closed), "reset for next cycle");

        state.force_lose();
        responder.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn responder_handles_consecutive_windows() {
        let q = quarantine(30);
        let state = Arc::new(GameState::new());
        let responder = tokio::spawn(Arc::clone(&q).run_responder(Arc::clone(&state)));

        for _ in 0..3 {
            assert!(q.fire(&state).await);
            tokio::time::sleep(Duration::from_millis(80)).await;
        }

        assert_eq!(state.population(), 100);
        assert_eq!(q.stats().engaged, 3);

        state.force_lose();
        responder.await.unwrap();
    }

    // ── Deadline callback ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn deadline_peek_sees_engaged_window() {
        let q = quarantine(10_000);
        let state = Arc::new(GameState::new());
        q.fire(&state).await;
        assert!(q.engage().await);

        assert_eq!(q.on_deadline(&state), DeadlineVerdict::Engaged);
        assert_eq!(state.population(), 100);
    }

    #[tokio::test]
    async fn deadline_with_lock_held_counts_as_breach() {
        let q = quarantine(10_000);
        let state = Arc::new(GameState::new());
        q.fire(&state).await;

        // Responder grabbed the lock but has not released it by the deadline.
        let mut held = q.lock.lock().await;
        *held = WindowStatus::Open;
        assert_eq!(
            q.on_deadline(&state),
            DeadlineVerdict::Breached { population: 80 }
        );
        drop(held);
        assert_eq!(state.population(), 80);
    }

    #[tokio::test]
    async fn deadline_fires_once_per_window() {
        let q = quarantine(10_000);
        let state = Arc::new(GameState::new());
        q.fire(&state).await;

        assert_eq!(
            q.on_deadline(&state),
            DeadlineVerdict::Breached { population: 80 }
        );
        assert_eq!(q.on_deadline(&state), DeadlineVerdict::Stale);
        assert_eq!(state.population(), 80);
    }

    #[tokio::test]
    async fn engage_after_deadline_is_too_late() {
        let q = quarantine(10_000);
        let state = Arc::new(GameState::new());
        q.fire(&state).await;
        q.on_deadline(&state);
        assert!(!q.engage().await);
    }

    #[tokio::test]
    async fn window_cannot_be_restarted_while_armed() {
        let q = quarantine(10_000);
        let state = Arc::new(GameState::new());
        assert!(q.fire(&state).await);
        assert!(!q.fire(&state).await);
        assert_eq!(q.stats().fired, 1);
        assert_eq!(q.stats().ignored, 1);
    }

    #[tokio::test]
    async fn breach_clamps_population_and_loses() {
        let q = quarantine(10_000);
        let state = Arc::new(GameState::with_counters(15, 0, 0));
        q.fire(&state).await;
        assert_eq!(
            q.on_deadline(&state),
            DeadlineVerdict::Breached { population: 0 }
        );
        assert_eq!(state.outcome(), GameOutcome::Lose);
    }

    #[tokio::test]
    async fn responder_exits_when_round_is_decided() {
        let q = quarantine(10);
        let state = Arc::new(GameState::new());
        let responder = tokio::spawn(Arc::clone(&q).run_responder(Arc::clone(&state)));
        state.force_lose();
        tokio::time::timeout(Duration::from_secs(1), responder)
            .await
            .unwrap()
            .unwrap();
    }
}
