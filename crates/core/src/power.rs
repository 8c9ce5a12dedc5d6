//! Deep sleep.
//!
//! Power-down with interrupts and the watchdog off draws a few hundred
//! nanoamps, low enough to leave the batteries in. Only an external reset
//! wakes the chip, and that restarts the firmware from boot.

use log::info;

use crate::board::Board;

/// Pull-ups off, interrupts off, watchdog off, power down.
pub fn sleep_now<B: Board>(board: &mut B) {
    info!("power: entering power-down");
    board.write_port(0x00);
    board.disable_interrupts();
    board.stop_watchdog();
    board.power_down();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Attiny85;
    use crate::tick::TickClock;

    #[test]
    fn test_sleep_stops_ticks() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        dev.write_port(crate::BUTTON_SENSE_MASK);
        dev.start_watchdog();
        dev.enable_interrupts();
        dev.delay_loops(10_000);
        let before = clock.ticks();
        assert!(before > 0);

        sleep_now(&mut dev);
        assert!(dev.asleep);
        assert_eq!(dev.sleep_count, 1);
        assert_eq!(dev.portb, 0);
        assert!(!dev.watchdog.enabled());

        dev.delay_loops(10_000);
        assert_eq!(clock.ticks(), before);
    }
}
