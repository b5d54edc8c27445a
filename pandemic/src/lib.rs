/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pandemic – real-time epidemic-response game engine
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/         – YAML game configuration
//! ├── error           – ArbitrationViolation / RaceLoss / ChannelContention
//! ├── token           – clue tokens and the vaccine encode transform
//! ├── state           – GameState aggregate (counters + terminal outcome)
//! ├── clock/          – Game Clock: countdowns, events, virus spread
//! ├── lab/            – Lab Arbiter: the single exclusive resource
//! ├── pipeline/       – clue → vaccine pipeline, medicine producer
//! ├── quarantine/     – contamination window, responder, deadline timer
//! ├── telemetry       – render sink and debug trace probe
//! └── game            – task wiring for one game round
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod game;
pub mod lab;
pub mod pipeline;
pub mod quarantine;
pub mod state;
pub mod telemetry;
pub mod token;
