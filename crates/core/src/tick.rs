//! Watchdog tick clock.
//!
//! The watchdog interrupt is the only time base: it bumps a 16-bit tick
//! counter every ~16 ms and, for the first [`ENTROPY_CREDITS`] firings after
//! power-on, folds the free-running Timer0 count into the boot seed.
//!
//! [`TickClock`] holds the state shared between the interrupt and the main
//! flow. The interrupt side calls [`TickClock::on_tick`]; the main flow reads
//! the counter and resets it to zero, nothing else. A reset racing an
//! increment loses at most one tick, which the debounce and idle checks
//! tolerate.

use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};

/// Interrupt firings that mix entropy into the seed after power-on
pub const ENTROPY_CREDITS: u8 = 8;

pub struct TickClock {
    ticks: AtomicU16,
    credits: AtomicU8,
    seed: AtomicU16,
}

impl TickClock {
    /// Power-on state: zero ticks, full entropy window, zero seed.
    pub const fn new() -> Self {
        TickClock {
            ticks: AtomicU16::new(0),
            credits: AtomicU8::new(ENTROPY_CREDITS),
            seed: AtomicU16::new(0),
        }
    }

    /// Return to the power-on state (external reset).
    pub fn power_on(&self) {
        self.seed.store(0, Ordering::Relaxed);
        self.ticks.store(0, Ordering::Relaxed);
        self.credits.store(ENTROPY_CREDITS, Ordering::Release);
    }

    /// Interrupt body. `fast_counter` is the low byte of the free-running timer.
    pub fn on_tick(&self, fast_counter: u8) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let credits = self.credits.load(Ordering::Acquire);
        if credits > 0 {
            let seed = self.seed.load(Ordering::Relaxed);
            self.seed.store((seed << 1) ^ fast_counter as u16, Ordering::Relaxed);
            self.credits.store(credits - 1, Ordering::Release);
        }
    }

    pub fn ticks(&self) -> u16 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn reset_ticks(&self) {
        self.ticks.store(0, Ordering::Relaxed);
    }

    /// Load the analog seed the window will keep mixing into.
    pub fn arm_entropy(&self, seed: u16) {
        self.seed.store(seed, Ordering::Relaxed);
    }

    pub fn entropy_pending(&self) -> bool {
        self.credits.load(Ordering::Acquire) > 0
    }

    pub fn credits(&self) -> u8 {
        self.credits.load(Ordering::Acquire)
    }

    /// Seed as mixed so far. Stable once [`TickClock::entropy_pending`] is false.
    pub fn seed(&self) -> u16 {
        self.seed.load(Ordering::Relaxed)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_mixes_eight_times() {
        let clock = TickClock::new();
        clock.arm_entropy(0x00A5);
        let mut expected = 0x00A5u16;
        for i in 0..8u8 {
            assert!(clock.entropy_pending());
            clock.on_tick(i * 17);
            expected = (expected << 1) ^ (i * 17) as u16;
        }
        assert!(!clock.entropy_pending());
        assert_eq!(clock.seed(), expected);

        clock.on_tick(0xFF);
        assert_eq!(clock.seed(), expected);
        assert_eq!(clock.ticks(), 9);
    }

    #[test]
    fn test_counter_wraps() {
        let clock = TickClock::new();
        for _ in 0..u16::MAX as u32 + 3 {
            clock.on_tick(0);
        }
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn test_reset_and_power_on() {
        let clock = TickClock::new();
        for _ in 0..10 {
            clock.on_tick(1);
        }
        clock.reset_ticks();
        assert_eq!(clock.ticks(), 0);
        assert_eq!(clock.credits(), 0);

        clock.power_on();
        assert_eq!(clock.credits(), ENTROPY_CREDITS);
        assert_eq!(clock.seed(), 0);
    }

    #[test]
    fn test_ticks_from_another_thread() {
        let clock = std::sync::Arc::new(TickClock::new());
        let isr = clock.clone();
        std::thread::spawn(move || {
            for n in 0..100u8 {
                isr.on_tick(n);
            }
        })
        .join()
        .unwrap();
        assert_eq!(clock.ticks(), 100);
        assert!(!clock.entropy_pending());
    }
}
