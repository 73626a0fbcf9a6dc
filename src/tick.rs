//! The millisecond tick source used by [`crate::Scheduler::sleep`]

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicU32, Ordering};

/// A free-running, monotonic tick counter which wraps at 2^32
pub trait Clock: Sync {
    /// The current tick count
    fn now(&self) -> u32;

    /// How many ticks have passed since `start`
    fn elapsed_since(&self, start: u32) -> u32 {
        elapsed(start, self.now())
    }
}

/// How many ticks lie between `start` and `now`
///
/// Correct even if the counter wrapped once in between.
pub const fn elapsed(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

/// A [`Clock`] driven by a periodic interrupt calling [`MillisCounter::tick`]
pub struct MillisCounter {
    ticks: AtomicU32,
}

impl MillisCounter {
    /// Create a counter starting at zero
    pub const fn new() -> MillisCounter {
        MillisCounter::starting_at(0)
    }

    /// Create a counter starting at the given value
    pub const fn starting_at(ticks: u32) -> MillisCounter {
        MillisCounter {
            ticks: AtomicU32::new(ticks),
        }
    }

    /// Count one tick
    pub fn tick(&self) {
        self.advance(1);
    }

    /// Count several ticks at once
    pub fn advance(&self, ticks: u32) {
        #[cfg(not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")))]
        self.ticks.fetch_add(ticks, Ordering::Relaxed);

        #[cfg(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base"))]
        critical_section::with(|_cs| {
            self.ticks.store(
                self.ticks.load(Ordering::Relaxed).wrapping_add(ticks),
                Ordering::Relaxed,
            );
        });
    }
}

impl Default for MillisCounter {
    fn default() -> Self {
        MillisCounter::new()
    }
}

impl Clock for MillisCounter {
    fn now(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULUS: u64 = 1 << 32;

    #[test]
    fn elapsed_without_wrap() {
        assert_eq!(elapsed(0, 0), 0);
        assert_eq!(elapsed(100, 250), 150);
        assert_eq!(elapsed(0, u32::MAX), u32::MAX);
    }

    #[test]
    fn elapsed_across_one_wrap() {
        let starts = [1, 1000, u32::MAX / 2, u32::MAX - 5, u32::MAX];
        let nows = [0, 3, 999, u32::MAX / 4];
        for start in starts {
            for now in nows.iter().copied().filter(|now| *now < start) {
                let expected = (now as u64 + MODULUS) - start as u64;
                assert_eq!(elapsed(start, now) as u64, expected, "{start} -> {now}");
            }
        }
    }

    #[test]
    fn counter_wraps() {
        let clock = MillisCounter::starting_at(u32::MAX - 1);
        let start = clock.now();
        clock.tick();
        clock.tick();
        assert_eq!(clock.now(), 0);
        clock.advance(5);
        assert_eq!(clock.elapsed_since(start), 7);
    }
}

// End of File
