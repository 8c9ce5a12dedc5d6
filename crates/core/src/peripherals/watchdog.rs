//! Watchdog timer in interrupt mode.
//!
//! WDTCR is set to WDIE with the shortest prescaler, so the watchdog raises
//! WDT_vect every ~16 ms and never resets the chip. The device model asks for
//! the deadlines that fall inside each span of simulated time.
//!
//! The watchdog runs from its own 128 kHz RC oscillator, not the core clock.
//! Its period wanders by a few percent against Timer0, which is what makes the
//! Timer0 count sampled at each interrupt worth mixing into the boot seed.

use super::xorshift32;
use crate::TICK_CYCLES;

/// Longest stretch of one period by oscillator drift (~3 %)
pub const MAX_DRIFT_CYCLES: u64 = 0x1FF;

pub struct Watchdog {
    /// Cycle of the next interrupt, `None` while stopped
    deadline: Option<u64>,
    /// xorshift state of the RC oscillator drift; `None` for an exact period
    drift: Option<u32>,
    pub fired: u64,
}

impl Watchdog {
    /// Ideal oscillator: every period is exactly [`TICK_CYCLES`].
    pub fn new() -> Self {
        Watchdog { deadline: None, drift: None, fired: 0 }
    }

    /// Oscillator whose periods drift, seeded with `seed`.
    pub fn with_drift(seed: u32) -> Self {
        Watchdog { deadline: None, drift: Some(seed.max(1)), fired: 0 }
    }

    pub fn enabled(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn start(&mut self, now: u64) {
        self.deadline = Some(now + self.next_period());
    }

    /// WDTCR = 0
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// Next interrupt at or before `until`, advancing the deadline past it.
    pub fn next_fire(&mut self, until: u64) -> Option<u64> {
        let at = self.deadline.filter(|&d| d <= until)?;
        self.deadline = Some(at + self.next_period());
        self.fired += 1;
        Some(at)
    }

    fn next_period(&mut self) -> u64 {
        match self.drift.as_mut() {
            Some(state) => TICK_CYCLES + (xorshift32(state) as u64 & MAX_DRIFT_CYCLES),
            None => TICK_CYCLES,
        }
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}
