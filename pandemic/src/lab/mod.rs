//! Lab Arbiter – the single exclusive resource of the game.
//!
//! [`Lab::assign_mission`] serialises every piece of lab work behind one
//! mutex.  While a task holds the lab it writes its token into the shared
//! mission register, spins for the mission's duration, and re-reads the
//! register before releasing.  Any difference means some task wrote the
//! register without holding the lab; the round is then lost on the spot.
//!
//! ```text
//!            assign_mission(t)                 delay elapsed
//!   IDLE ───────────────────────►  BUSY(t)  ───────────────────►  IDLE
//!                                    │ register != t at completion
//!                                    └──────► ArbitrationViolation → LOSE
//! ```
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Exclusivity | `tokio::sync::Mutex<()>` taken with `blocking_lock`; waiters are served FIFO |
//! | Mission register | `AtomicU8` outside the mutex, visible to every task |
//! | Processing delay | [`busy_wait`] while holding the lock, never a yield |
//! | Release | guard drop on every exit path, violation included |

pub mod delay;

pub use delay::busy_wait;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::state::GameState;
use crate::telemetry::{TraceChannel, TraceProbe};
use crate::token::{encode, MissionKind, Token, MEDICINE_TOKEN};

/// Observable arbiter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabState {
    Idle,
    Busy(Token),
}

/// The shared laboratory.
pub struct Lab {
    /// Held for the whole duration of a mission.
    gate: Mutex<()>,
    /// Token of the in-flight mission.  Written only while `gate` is held.
    mission: AtomicU8,
    busy: AtomicBool,

    /// Tasks currently between lock acquisition and release.
    occupancy: AtomicUsize,
    /// High-water mark of `occupancy`; stays at 1 while the lock holds.
    max_occupancy: AtomicUsize,
    completed: AtomicU64,
    violations: AtomicU64,

    medicine_delay: Duration,
    vaccine_delay: Duration,
    probe: Arc<dyn TraceProbe>,
}

impl std::fmt::Debug for Lab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lab")
            .field("state", &self.state())
            .field("medicine_delay", &self.medicine_delay)
            .field("vaccine_delay", &self.vaccine_delay)
            .field("completed", &self.missions_completed())
            .field("violations", &self.violations())
            .finish()
    }
}

impl Lab {
    pub fn new(
        medicine_delay: Duration,
        vaccine_delay: Duration,
        probe: Arc<dyn TraceProbe>,
    ) -> Self {
        Self {
            gate: Mutex::new(()),
            mission: AtomicU8::new(MEDICINE_TOKEN),
            busy: AtomicBool::new(false),
            occupancy: AtomicUsize::new(0),
            max_occupancy: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            medicine_delay,
            vaccine_delay,
            probe,
        }
    }

    pub fn from_config(cfg: &GameConfig, probe: Arc<dyn TraceProbe>) -> Self {
        Self::new(cfg.medicine_delay, cfg.vaccine_delay, probe)
    }

    /// Run one mission with exclusive ownership of the lab.
    ///
    /// Blocks the calling thread while another task holds the lab, then for
    /// the mission's duration.  Returns [`MEDICINE_TOKEN`] for a medicine
    /// mission and [`encode`]`(token)` for vaccine research.
    ///
    /// Must be called from a blocking context (a plain thread or
    /// `spawn_blocking`), never from inside an async task.
    ///
    /// # Errors
    /// [`GameError::ArbitrationViolation`] if the mission register no longer
    /// holds `token` at completion.  The round has been forced to LOSE by
    /// then, unless it was already decided.
    pub fn assign_mission(&self, state: &GameState, token: Token) -> Result<Token, GameError> {
        let _guard = self.gate.blocking_lock();

        let inside = self.occupancy.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_occupancy.fetch_max(inside, Ordering::SeqCst);
        self.mission.store(token, Ordering::SeqCst);
        self.busy.store(true, Ordering::SeqCst);
        self.probe.signal(TraceChannel::Lab, true);

        let (delay, result) = match MissionKind::of(token) {
            MissionKind::Medicine => (self.medicine_delay, MEDICINE_TOKEN),
            MissionKind::Vaccine(clue) => (self.vaccine_delay, encode(clue)),
        };
        debug!(
            token    = token,
            vaccine  = token != MEDICINE_TOKEN,
            delay_ms = delay.as_millis() as u64,
            "lab mission started"
        );

        busy_wait(delay);

        let observed = self.mission.load(Ordering::SeqCst);

        self.busy.store(false, Ordering::SeqCst);
        self.occupancy.fetch_sub(1, Ordering::SeqCst);
        self.probe.signal(TraceChannel::Lab, false);

        if observed != token {
            self.violations.fetch_add(1, Ordering::SeqCst);
            let err = GameError::ArbitrationViolation {
                submitted: token,
                observed,
            };
            error!(submitted = token, observed, "{err}");
            state.force_lose();
            return Err(err);
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        debug!(token, result, "lab mission completed");
        Ok(result)
    }

    /// Overwrite the mission register **without** taking the lab.
    ///
    /// This is the unsynchronised write the completion check exists to
    /// catch.  Used for fault injection.
    pub fn inject_mission_token(&self, token: Token) {
        self.mission.store(token, Ordering::SeqCst);
    }

    pub fn state(&self) -> LabState {
        if self.busy.load(Ordering::SeqCst) {
            LabState::Busy(self.mission.load(Ordering::SeqCst))
        } else {
            LabState::Idle
        }
    }

    /// Highest number of tasks ever observed inside the critical section.
    pub fn max_concurrent_missions(&self) -> usize {
        self.max_occupancy.load(Ordering::SeqCst)
    }

    pub fn missions_completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::SeqCst)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::rng::{RangeRng, SeededRng};
    use crate::state::GameOutcome;
    use crate::telemetry::NoopProbe;
    use std::sync::{OnceLock, Weak};
    use std::thread;
    use std::time::Instant;

    fn lab(medicine_ms: u64, vaccine_ms: u64) -> Arc<Lab> {
        Arc::new(Lab::new(
            Duration::from_millis(medicine_ms),
            Duration::from_millis(vaccine_ms),
            Arc::new(NoopProbe),
        ))
    }

    // ── Results ───────────────────────────────────────────────────────────────

    #[test]
    fn medicine_mission_returns_zero() {
        let lab = lab(1, 1);
        let state = GameState::new();
        assert_eq!(lab.assign_mission(&state, 0), Ok(0));
        assert_eq!(lab.missions_completed(), 1);
        assert_eq!(lab.state(), LabState::Idle);
    }

    #[test]
    fn vaccine_mission_returns_encoded_clue() {
        let lab = lab(1, 1);
        let state = GameState::new();
        assert_eq!(lab.assign_mission(&state, 5), Ok(encode(5)));
    }

    #[test]
    fn vaccine_takes_the_long_delay() {
        let lab = lab(1, 40);
        let state = GameState::new();
        let start = Instant::now();
        lab.assign_mission(&state, 9).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    // ── Exclusivity ───────────────────────────────────────────────────────────

    #[test]
    fn lab_reports_busy_while_mission_runs() {
        let lab = lab(1, 80);
        let state = Arc::new(GameState::new());
        let worker = {
            let (lab, state) = (Arc::clone(&lab), Arc::clone(&state));
            thread::spawn(move || lab.assign_mission(&state, 0x21))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(lab.state(), LabState::Busy(0x21));
        worker.join().unwrap().unwrap();
        assert_eq!(lab.state(), LabState::Idle);
    }

    #[test]
    fn second_requester_waits_for_first_to_finish() {
        let lab = lab(1, 60);
        let state = Arc::new(GameState::new());

        let first = {
            let (lab, state) = (Arc::clone(&lab), Arc::clone(&state));
            thread::spawn(move || {
                lab.assign_mission(&state, 3).unwrap();
                Instant::now()
            })
        };
        thread::sleep(Duration::from_millis(10));
        let second_started = Instant::now();
        lab.assign_mission(&state, 0).unwrap();
        let second_done = Instant::now();
        let first_done = first.join().unwrap();

        assert!(second_done >= first_done, "missions interleaved");
        assert!(second_done - second_started >= Duration::from_millis(40));
    }

    #[test]
    fn contention_between_pipelines_never_interleaves_missions() {
        // Randomised contention: medicine and vaccine requesters hammer the
        // lab with short missions from several threads at once.
        let lab = lab(0, 0);
        let state = Arc::new(GameState::new());

        let handles: Vec<_> = (0..6u64)
            .map(|seed| {
                let (lab, state) = (Arc::clone(&lab), Arc::clone(&state));
                thread::spawn(move || {
                    let mut rng = SeededRng::from_seed(seed);
                    for _ in 0..300 {
                        let token = if seed % 2 == 0 { 0 } else { rng.next_byte() };
                        let got = lab.assign_mission(&state, token).unwrap();
                        if token == 0 {
                            assert_eq!(got, 0);
                        } else {
                            assert_eq!(got, encode(token));
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(lab.max_concurrent_missions(), 1);
        assert_eq!(lab.violations(), 0);
        assert_eq!(lab.missions_completed(), 1_800);
        assert_eq!(state.outcome(), GameOutcome::InProgress);
    }

    // ── Corruption check ──────────────────────────────────────────────────────

    /// Overwrites the mission register the moment the lab reports busy,
    /// i.e. from inside the critical section after the owner's store.
    #[derive(Default)]
    struct Saboteur {
        lab: OnceLock<Weak<Lab>>,
        token: Token,
        fired: AtomicBool,
    }

    impl TraceProbe for Saboteur {
        fn signal(&self, channel: TraceChannel, level: bool) {
            if channel != TraceChannel::Lab || !level || self.fired.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(lab) = self.lab.get().and_then(Weak::upgrade) {
                lab.inject_mission_token(self.token);
            }
        }
    }

    fn sabotaged_lab(token: Token) -> Arc<Lab> {
        let saboteur = Arc::new(Saboteur {
            token,
            ..Saboteur::default()
        });
        let lab = Arc::new(Lab::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
            Arc::clone(&saboteur) as Arc<dyn TraceProbe>,
        ));
        saboteur.lab.set(Arc::downgrade(&lab)).unwrap();
        lab
    }

    #[test]
    fn unsynchronised_write_during_mission_forces_lose() {
        let lab = sabotaged_lab(0x99);
        let state = GameState::new();

        assert_eq!(
            lab.assign_mission(&state, 5),
            Err(GameError::ArbitrationViolation {
                submitted: 5,
                observed: 0x99
            })
        );
        assert_eq!(state.outcome(), GameOutcome::Lose);
        assert_eq!(state.population(), 0);
        assert_eq!(lab.violations(), 1);
        assert_eq!(lab.missions_completed(), 0);
        assert_eq!(lab.state(), LabState::Idle, "lab released after violation");
    }

    #[test]
    fn corrupted_medicine_mission_forces_lose_too() {
        let lab = sabotaged_lab(0x01);
        let state = GameState::with_counters(100, 40, 7);

        assert!(matches!(
            lab.assign_mission(&state, MEDICINE_TOKEN),
            Err(GameError::ArbitrationViolation { submitted: 0, observed: 1 })
        ));
        assert_eq!(state.outcome(), GameOutcome::Lose);
        assert_eq!(state.population(), 0);
    }

    #[test]
    fn lab_is_reusable_after_a_violation() {
        let lab = sabotaged_lab(8);
        let state = GameState::new();
        assert!(lab.assign_mission(&state, 7).is_err());

        // The saboteur only strikes once.
        let fresh = GameState::new();
        assert_eq!(lab.assign_mission(&fresh, 0), Ok(0));
        assert_eq!(lab.assign_mission(&fresh, 7), Ok(encode(7)));
    }
}
