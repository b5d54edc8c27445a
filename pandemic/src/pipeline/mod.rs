/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The two lab contenders.
//!
//! ```text
//! Game Clock ──clue──► [single slot] ──► ClueConsumer ──┐
//!                                                       ├──► Lab ──► ship
//!                              MedicineProducer ────────┘
//! ```
//!
//! Both loops run on blocking threads and are serialised only by the Lab
//! Arbiter; neither assumes it runs before the other.

pub mod clue;
pub mod medicine;

pub use clue::{
    clue_channel, ship_vaccine, ClueConsumer, ClueReceiver, ClueSender, ClueStats, Delivery,
};
pub use medicine::{ship_medicine, MedicineProducer, MedicineStats};
