//! Fixed-interval logic clock and state hashing.
//!
//! Frame time arrives at whatever rate the host renders; game logic (income,
//! idle drift) runs on a fixed tick. [`TickClock`] accumulates frame deltas
//! and reports how many whole ticks fit, carrying the remainder forward.

use crate::fixed::{Fixed64, Seconds};

// ---------------------------------------------------------------------------
// Tick clock
// ---------------------------------------------------------------------------

/// Accumulator that turns variable frame deltas into fixed logic ticks.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TickClock {
    /// Length of one logic tick.
    interval: Seconds,
    /// Time carried over that has not yet made up a whole tick.
    accumulator: Seconds,
    /// Ticks run since construction or the last reset.
    ticks: u64,
}

impl TickClock {
    /// A clock ticking every `interval`. Non-positive intervals are clamped
    /// to the smallest representable step.
    pub fn new(interval: Seconds) -> Self {
        Self {
            interval: interval.max(Fixed64::DELTA),
            accumulator: Fixed64::ZERO,
            ticks: 0,
        }
    }

    /// Feed one frame's delta. Returns the number of ticks due.
    ///
    /// Negative deltas are ignored.
    pub fn advance(&mut self, delta: Seconds) -> u32 {
        self.accumulator += delta.max(Fixed64::ZERO);
        let mut due = 0u32;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            due += 1;
        }
        self.ticks += u64::from(due);
        due
    }

    pub fn interval(&self) -> Seconds {
        self.interval
    }

    pub fn accumulator(&self) -> Seconds {
        self.accumulator
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Drop the carried remainder and the tick count.
    pub fn reset(&mut self) {
        self.accumulator = Fixed64::ZERO;
        self.ticks = 0;
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit). Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
