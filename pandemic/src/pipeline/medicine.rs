/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Medicine producer.
//!
//! Requests the lab with the medicine token over and over while the round is
//! in progress.  Each completed mission is followed by a shipping delay
//! outside the lab, after which one pill lands in stock.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::lab::{busy_wait, Lab};
use crate::state::GameState;
use crate::telemetry::{TraceChannel, TraceProbe};
use crate::token::MEDICINE_TOKEN;

/// Ship one pill after `delay`.  Returns the new stock, or `None` when the
/// round ended in the meantime.
pub fn ship_medicine(state: &GameState, delay: Duration) -> Option<u8> {
    busy_wait(delay);
    state.add_medicine()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MedicineStats {
    pub missions: u64,
    pub pills_shipped: u64,
}

pub struct MedicineProducer {
    lab: Arc<Lab>,
    state: Arc<GameState>,
    ship_delay: Duration,
    probe: Arc<dyn TraceProbe>,
}

impl MedicineProducer {
    pub fn new(
        lab: Arc<Lab>,
        state: Arc<GameState>,
        ship_delay: Duration,
        probe: Arc<dyn TraceProbe>,
    ) -> Self {
        Self {
            lab,
            state,
            ship_delay,
            probe,
        }
    }

    /// Produce until the round is decided.  Runs on a blocking thread.
    pub fn run(self) -> MedicineStats {
        let mut stats = MedicineStats::default();

        while !self.state.is_over() {
            self.probe.signal(TraceChannel::Medicine, true);
            let mission = self.lab.assign_mission(&self.state, MEDICINE_TOKEN);
            self.probe.signal(TraceChannel::Medicine, false);

            if let Err(e) = mission {
                warn!("medicine mission aborted: {e}");
                break;
            }
            stats.missions += 1;

            if let Some(stock) = ship_medicine(&self.state, self.ship_delay) {
                stats.pills_shipped += 1;
                debug!(medicine = stock, "medicine shipped");
            }
        }

        stats
    }
}
