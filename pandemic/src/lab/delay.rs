/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Non-yielding delay.
//!
//! Lab work keeps the calling thread on-CPU, holding the lab lock, for the
//! whole mission.  The completion check in [`Lab`](super::Lab) depends on
//! this: do not swap in `thread::sleep` or `tokio::time::sleep`.

use std::time::{Duration, Instant};

/// Spin until `duration` has elapsed.
pub fn busy_wait(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}
