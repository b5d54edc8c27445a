/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Bounded random-range generation for the Game Clock.
//!
//! The clock only needs two things from randomness: a countdown value inside
//! an inclusive range and a raw byte for the next clue.  Neither needs to be
//! cryptographically strong, so the seam is a tiny trait with a seeded
//! [`StdRng`] implementation for real rounds and a [`ScriptedRng`] for tests.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of bounded unsigned values.
pub trait RangeRng: Send {
    /// Uniform value in `lo..=hi`.  Callers guarantee `lo <= hi`.
    fn next_in(&mut self, lo: u16, hi: u16) -> u16;

    /// Uniform raw byte.
    fn next_byte(&mut self) -> u8;
}

// ── Seeded generator ──────────────────────────────────────────────────────────

/// [`RangeRng`] backed by `rand`'s standard generator.
#[derive(Debug, Clone)]
pub struct SeededRng {
    inner: StdRng,
}

impl SeededRng {
    /// Reproducible stream from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Non-reproducible stream seeded from the OS.
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }
}

impl RangeRng for SeededRng {
    fn next_in(&mut self, lo: u16, hi: u16) -> u16 {
        self.inner.gen_range(lo..=hi)
    }

    fn next_byte(&mut self) -> u8 {
        self.inner.gen()
    }
}

// ── Scripted generator ────────────────────────────────────────────────────────

/// Replays fixed values, then falls back to the range lower bound / `1`.
///
/// Scripted range values are clamped into the requested range so a script
/// can never push a countdown outside its configuration.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRng {
    ranges: VecDeque<u16>,
    bytes: VecDeque<u8>,
}

impl ScriptedRng {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue values returned by [`RangeRng::next_in`].
    pub fn with_ranges(mut self, values: impl IntoIterator<Item = u16>) -> Self {
        self.ranges.extend(values);
        self
    }

    /// Queue values returned by [`RangeRng::next_byte`].
    pub fn with_bytes(mut self, values: impl IntoIterator<Item = u8>) -> Self {
        self.bytes.extend(values);
        self
    }
}

impl RangeRng for ScriptedRng {
    fn next_in(&mut self, lo: u16, hi: u16) -> u16 {
        self.ranges.pop_front().map_or(lo, |v| v.clamp(lo, hi))
    }

    fn next_byte(&mut self) -> u8 {
        self.bytes.pop_front().unwrap_or(1)
    }
}
