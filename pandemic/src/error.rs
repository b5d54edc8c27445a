/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the game engine.
//!
//! Every variant maps onto one failure class of the round:
//!
//! | Variant | Detected by | Effect |
//! |---|---|---|
//! | `ArbitrationViolation` | Lab Arbiter completion check | fatal, forces LOSE |
//! | `RaceLoss` | quarantine deadline timer | population penalty |
//! | `ChannelContention` | clue slot `try_publish` | producer must block |
//! | `ChannelClosed` | clue slot after round end | consumer/producer exit |
//!
//! None of these escape the engine as a process failure.  They are returned
//! to the task that hit them so it can log the structured fields and settle
//! the round locally; the only externally visible signal is the terminal
//! [`GameOutcome`](crate::state::GameOutcome).

use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The shared mission register changed while a task held the lab.
    #[error(
        "arbitration violation: mission {submitted:#04x} was observed as {observed:#04x} \
         at completion: the lab was mutated while held"
    )]
    ArbitrationViolation { submitted: Token, observed: Token },

    /// A contamination deadline elapsed before quarantine was engaged.
    #[error("quarantine race lost: population hit by {strength}% (now {population}%)")]
    RaceLoss { strength: u8, population: u8 },

    /// The single clue slot still holds an unconsumed clue.
    #[error("clue slot occupied: clue {clue:#04x} must wait for the consumer")]
    ChannelContention { clue: Token },

    /// The other end of the clue slot is gone (round over).
    #[error("clue channel closed")]
    ChannelClosed,
}

impl GameError {
    /// Returns `true` for errors that end the round.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::ArbitrationViolation { .. })
    }
}
