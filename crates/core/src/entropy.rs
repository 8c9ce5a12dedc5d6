//! Boot-time seed harvesting.
//!
//! The chip has no RNG. Two weak sources are combined: the low byte of one
//! conversion on the floating ADC input, then eight watchdog ticks each folding
//! in the free-running Timer0 count, which drifts against the independent
//! watchdog oscillator.

use log::debug;

use crate::board::Board;
use crate::tick::TickClock;

/// Run the entropy window and return the mixed seed.
///
/// Starts the watchdog, global interrupts and free-running Timer0, then
/// busy-waits until every entropy credit has been spent.
pub fn harvest<B: Board>(board: &mut B, clock: &TickClock) -> u16 {
    let sample = board.analog_sample();
    clock.arm_entropy(sample & 0x00FF);

    board.disable_interrupts();
    board.start_watchdog();
    board.enable_interrupts();
    board.start_free_running_timer();

    while clock.entropy_pending() {
        board.spin();
    }

    let seed = clock.seed();
    debug!("entropy: adc={:#05x} seed={:#06x}", sample, seed);
    seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Attiny85;
    use std::collections::HashSet;

    #[test]
    fn test_harvest_consumes_window() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        let seed = harvest(&mut dev, &clock);
        assert!(!clock.entropy_pending());
        assert_eq!(clock.ticks(), 8);
        assert_eq!(seed, clock.seed());
        assert!(dev.interrupts_enabled);
        assert!(dev.watchdog.enabled());
        assert_eq!(dev.adc.conversions, 1);
    }

    #[test]
    fn test_watchdog_drift_changes_seed() {
        // same ADC reading, different oscillator drift
        let run = |drift| {
            let clock = TickClock::new();
            let mut dev = Attiny85::new(&clock).with_noise_seed(7).with_drift_seed(drift);
            harvest(&mut dev, &clock)
        };
        let a = run(1);
        let b = run(2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_jitter_reaches_low_byte() {
        let mut low_bytes = HashSet::new();
        for drift in 1..=64 {
            let clock = TickClock::new();
            let mut dev = Attiny85::new(&clock).with_noise_seed(7).with_drift_seed(drift);
            low_bytes.insert(harvest(&mut dev, &clock) & 0xFF);
        }
        assert!(low_bytes.len() > 32, "{} distinct low bytes", low_bytes.len());
    }

    #[test]
    fn test_noise_changes_seed() {
        let a = {
            let clock = TickClock::new();
            let mut dev = Attiny85::new(&clock).with_noise_seed(1);
            harvest(&mut dev, &clock)
        };
        let b = {
            let clock = TickClock::new();
            let mut dev = Attiny85::new(&clock).with_noise_seed(99);
            harvest(&mut dev, &clock)
        };
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_noise_same_seed() {
        let run = || {
            let clock = TickClock::new();
            let mut dev = Attiny85::new(&clock).with_noise_seed(7);
            harvest(&mut dev, &clock)
        };
        assert_eq!(run(), run());
    }
}
