/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Clue → vaccine pipeline.
//!
//! The Game Clock publishes clues into a one-slot channel.  Publishing into
//! an occupied slot blocks the clock until the consumer has taken the
//! previous clue; nothing is ever dropped or overwritten in transit.
//!
//! The consumer takes a clue, runs the vaccine mission in the lab, and ships
//! the result.  A result only counts when it decodes to the clue that
//! started the mission.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::error::GameError;
use crate::lab::Lab;
use crate::state::GameState;
use crate::telemetry::{TraceChannel, TraceProbe};
use crate::token::{decode, Token};

// ── Single-slot channel ───────────────────────────────────────────────────────

/// Create the one-slot clue channel.
pub fn clue_channel() -> (ClueSender, ClueReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ClueSender { tx }, ClueReceiver { rx })
}

/// Producer half, owned by the Game Clock.
#[derive(Debug, Clone)]
pub struct ClueSender {
    tx: mpsc::Sender<Token>,
}

impl ClueSender {
    /// Publish without waiting.
    ///
    /// # Errors
    /// [`GameError::ChannelContention`] when the slot still holds a clue,
    /// [`GameError::ChannelClosed`] when the consumer is gone.
    pub fn try_publish(&self, clue: Token) -> Result<(), GameError> {
        match self.tx.try_send(clue) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(clue)) => Err(GameError::ChannelContention { clue }),
            Err(TrySendError::Closed(_)) => Err(GameError::ChannelClosed),
        }
    }

    /// Publish, waiting for the slot to drain if it is occupied.
    ///
    /// # Errors
    /// [`GameError::ChannelClosed`] when the consumer is gone.
    pub async fn publish(&self, clue: Token) -> Result<(), GameError> {
        match self.try_publish(clue) {
            Err(GameError::ChannelContention { clue }) => {
                debug!(clue, "clue slot occupied: producer waits for consumer");
                self.tx
                    .send(clue)
                    .await
                    .map_err(|_| GameError::ChannelClosed)
            }
            other => other,
        }
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct ClueReceiver {
    rx: mpsc::Receiver<Token>,
}

impl ClueReceiver {
    /// Block the calling thread until a clue arrives.  `None` once the
    /// producer is gone and the slot is empty.
    pub fn take_blocking(&mut self) -> Option<Token> {
        self.rx.blocking_recv()
    }

    pub async fn take(&mut self) -> Option<Token> {
        self.rx.recv().await
    }
}

// ── Shipping ──────────────────────────────────────────────────────────────────

/// Ship a vaccine result for `clue`.
///
/// Credits `strength` (clamped at 100) only when `result` decodes to `clue`.
/// A mismatch is discarded without penalty.  Returns the new vaccine level
/// for a credited shipment.
pub fn ship_vaccine(state: &GameState, clue: Token, result: Token, strength: u8) -> Option<u8> {
    if decode(result) != clue {
        debug!(clue, result, "vaccine result does not match clue: discarded");
        return None;
    }
    state.add_vaccine(strength)
}

// ── Consumer loop ─────────────────────────────────────────────────────────────

/// Counters for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClueStats {
    pub received: u64,
    /// Skipped because medicine stock was below the gating level.
    pub deferred: u64,
    pub shipped: u64,
    pub discarded: u64,
}

/// What happened to one clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Vaccine credited; carries the new vaccine level.
    Shipped(u8),
    /// Result did not decode to the clue, or the round ended first.
    Discarded,
    /// Medicine stock below the gating level; carries the stock seen.
    Deferred(u8),
}

/// Takes clues from the slot and turns them into vaccine.
pub struct ClueConsumer {
    lab: Arc<Lab>,
    state: Arc<GameState>,
    vaccine_strength: u8,
    min_medicine_stock: Option<u8>,
    probe: Arc<dyn TraceProbe>,
}

impl ClueConsumer {
    pub fn new(
        lab: Arc<Lab>,
        state: Arc<GameState>,
        vaccine_strength: u8,
        min_medicine_stock: Option<u8>,
        probe: Arc<dyn TraceProbe>,
    ) -> Self {
        Self {
            lab,
            state,
            vaccine_strength,
            min_medicine_stock,
            probe,
        }
    }

    /// Research one clue.
    ///
    /// # Errors
    /// Propagates [`GameError::ArbitrationViolation`] from the lab.
    pub fn handle(&self, clue: Token) -> Result<Delivery, GameError> {
        if let Some(min) = self.min_medicine_stock {
            let stock = self.state.medicine();
            if stock < min {
                debug!(clue, stock, min, "medicine stock too low: clue dropped");
                return Ok(Delivery::Deferred(stock));
            }
        }

        let result = self.lab.assign_mission(&self.state, clue)?;

        Ok(
            match ship_vaccine(&self.state, clue, result, self.vaccine_strength) {
                Some(level) => Delivery::Shipped(level),
                None => Delivery::Discarded,
            },
        )
    }

    /// Consume clues until the channel closes or the round is decided.
    ///
    /// Runs on a blocking thread.  The round is checked after every clue, so
    /// the loop never goes back to waiting once the outcome is terminal.
    pub fn run(self, mut clues: ClueReceiver) -> ClueStats {
        let mut stats = ClueStats::default();

        while !self.state.is_over() {
            let Some(clue) = clues.take_blocking() else {
                debug!("clue channel closed: consumer exiting");
                break;
            };
            if self.state.is_over() {
                break;
            }
            stats.received += 1;

            self.probe.signal(TraceChannel::ClueConsumer, true);
            let delivery = self.handle(clue);
            self.probe.signal(TraceChannel::ClueConsumer, false);

            match delivery {
                Ok(Delivery::Shipped(level)) => {
                    stats.shipped += 1;
                    info!(clue, vaccine = level, "vaccine shipped");
                }
                Ok(Delivery::Discarded) => stats.discarded += 1,
                Ok(Delivery::Deferred(_)) => stats.deferred += 1,
                Err(e) => {
                    warn!(clue, "vaccine mission aborted: {e}");
                    break;
                }
            }
        }

        stats
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
