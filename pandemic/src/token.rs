/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Clue tokens and the vaccine encode transform.
//!
//! A [`Token`] is the 8-bit unit of work handed to the lab:
//!
//! ```text
//! 0x00          → medicine mission (no clue)
//! 0x01 ..= 0xFF → vaccine research for that contamination signature
//! ```
//!
//! The lab answers a vaccine mission with [`encode`]`(clue)`.  The transform
//! is a fixed XOR over a subset of bits, so it is its own inverse and the
//! shipping side can verify a result with [`decode`].

/// Raw 8-bit lab token.
pub type Token = u8;

/// The reserved token meaning "no clue / produce medicine".
pub const MEDICINE_TOKEN: Token = 0;

/// Bits flipped by [`encode`].
///
/// Low byte of `0b0100_1101_0011_1001_1 >> 3`, the only part that survives
/// on an 8-bit token.
pub const ENCODE_MASK: Token = 0x4E;

/// Kind of work a token asks the lab to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionKind {
    /// Token 0: manufacture one medicine pill.
    Medicine,
    /// Non-zero token: research the vaccine for this clue.
    Vaccine(Token),
}

impl MissionKind {
    /// Classify a raw lab token.
    pub fn of(token: Token) -> Self {
        if token == MEDICINE_TOKEN {
            MissionKind::Medicine
        } else {
            MissionKind::Vaccine(token)
        }
    }

    /// Returns `true` for vaccine research.
    pub fn is_vaccine(&self) -> bool {
        matches!(self, MissionKind::Vaccine(_))
    }
}

/// Encode a clue into the vaccine result the lab ships back.
pub fn encode(clue: Token) -> Token {
    (clue & !ENCODE_MASK) | (!clue & ENCODE_MASK)
}

/// Inverse of [`encode`].
pub fn decode(result: Token) -> Token {
    encode(result)
}

/// Turn a raw random byte into a valid clue.
///
/// `0` is reserved for medicine, so a drawn zero becomes `1`.
pub fn clue_from_byte(byte: u8) -> Token {
    if byte == MEDICINE_TOKEN {
        1
    } else {
        byte
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
