/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Presentation-side collaborators: the counter display and the debug pin.
//!
//! Both are strictly observational.  [`TelemetrySink`] only ever receives
//! copies of the counters, and [`TraceProbe`] receives a channel id and a
//! level; neither gets a handle through which state could be mutated.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::state::{GameOutcome, GameState, Snapshot};

// ── Debug trace probe ─────────────────────────────────────────────────────────

/// Logical debug pin toggled around each task's critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceChannel {
    Clock,
    ClueConsumer,
    Medicine,
    Responder,
    Lab,
}

impl TraceChannel {
    /// Pin number on the board the game was designed for (LED1..LED4, plus
    /// one spare for the lab).
    pub fn pin(&self) -> u8 {
        match self {
            TraceChannel::Clock => 1,
            TraceChannel::ClueConsumer => 2,
            TraceChannel::Medicine => 3,
            TraceChannel::Responder => 4,
            TraceChannel::Lab => 5,
        }
    }
}

/// `debug_signal(channel, level)` hook.
pub trait TraceProbe: Send + Sync {
    fn signal(&self, channel: TraceChannel, level: bool);
}

/// Emits each toggle as a `trace!` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProbe;

impl TraceProbe for TracingProbe {
    fn signal(&self, channel: TraceChannel, level: bool) {
        trace!(channel = ?channel, pin = channel.pin(), level, "debug signal");
    }
}

/// Discards every toggle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl TraceProbe for NoopProbe {
    fn signal(&self, _channel: TraceChannel, _level: bool) {}
}

// ── Counter display ───────────────────────────────────────────────────────────

/// External display for the three public counters.
pub trait TelemetrySink: Send {
    fn render(&mut self, population: u8, vaccine: u8, medicine: u8);

    /// Called once after the round is decided.
    fn announce(&mut self, _outcome: GameOutcome, final_counters: Snapshot) {
        self.render(
            final_counters.population,
            final_counters.vaccine,
            final_counters.medicine,
        );
    }
}

/// Renders counters through `tracing`; repeats are demoted to `debug!`.
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<(u8, u8, u8)>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for LogSink {
    fn render(&mut self, population: u8, vaccine: u8, medicine: u8) {
        let now = (population, vaccine, medicine);
        if self.last == Some(now) {
            debug!(population, vaccine, medicine, "P/V/M");
        } else {
            info!(population, vaccine, medicine, "P/V/M");
            self.last = Some(now);
        }
    }

    fn announce(&mut self, outcome: GameOutcome, final_counters: Snapshot) {
        let banner = match outcome {
            GameOutcome::Win => "   WIN  ",
            GameOutcome::Lose => "  LOSE  ",
            GameOutcome::InProgress => "  ....  ",
        };
        info!(
            population = final_counters.population,
            vaccine    = final_counters.vaccine,
            medicine   = final_counters.medicine,
            "[{banner}]"
        );
    }
}

/// Presentation loop: render every `period` until the round is decided,
/// then announce the outcome once.  Hands the sink back to the caller.
pub async fn run_telemetry(
    state: Arc<GameState>,
    mut sink: Box<dyn TelemetrySink>,
    period: Duration,
) -> Box<dyn TelemetrySink> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let outcome = loop {
        tokio::select! {
            outcome = state.finished() => break outcome,
            _ = ticker.tick() => {
                let s = state.snapshot();
                sink.render(s.population, s.vaccine, s.medicine);
            }
        }
    };

    sink.announce(outcome, state.snapshot());
    sink
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<(u8, u8, u8)>>>,
        announced: Arc<Mutex<Option<GameOutcome>>>,
    }

    impl TelemetrySink for RecordingSink {
        fn render(&mut self, population: u8, vaccine: u8, medicine: u8) {
            self.frames
                .lock()
                .unwrap()
                .push((population, vaccine, medicine));
        }

        fn announce(&mut self, outcome: GameOutcome, _final_counters: Snapshot) {
            *self.announced.lock().unwrap() = Some(outcome);
        }
    }

    #[test]
    fn trace_channels_map_to_distinct_pins() {
        let pins = [
            TraceChannel::Clock,
            TraceChannel::ClueConsumer,
            TraceChannel::Medicine,
            TraceChannel::Responder,
            TraceChannel::Lab,
        ]
        .map(|c| c.pin());
        for (i, a) in pins.iter().enumerate() {
            assert!(pins[i + 1..].iter().all(|b| b != a));
        }
    }

    #[tokio::test]
    async fn telemetry_renders_until_outcome_then_announces() {
        let state = Arc::new(GameState::with_counters(100, 0, 4));
        let sink = RecordingSink::default();
        let frames = Arc::clone(&sink.frames);
        let announced = Arc::clone(&sink.announced);

        let task = tokio::spawn(run_telemetry(
            Arc::clone(&state),
            Box::new(sink),
            Duration::from_millis(5),
        ));
        tokio::time::sleep(Duration::from_millis(30)).await;
        state.force_lose();
        task.await.unwrap();

        let frames = frames.lock().unwrap();
        assert!(!frames.is_empty());
        assert_eq!(frames[0], (100, 0, 4));
        assert_eq!(*announced.lock().unwrap(), Some(GameOutcome::Lose));
    }

    #[test]
    fn telemetry_never_mutates_state() {
        let state = GameState::with_counters(64, 12, 3);
        let before = state.snapshot();
        let mut sink = LogSink::new();
        let s = state.snapshot();
        sink.render(s.population, s.vaccine, s.medicine);
        sink.render(s.population, s.vaccine, s.medicine);
        assert_eq!(state.snapshot(), before);
    }
}
