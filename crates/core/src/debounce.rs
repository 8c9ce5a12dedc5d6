//! Button press detection.
//!
//! A physical press spans many polling passes and several ticks. A held button
//! is therefore only accepted again once more than one tick has passed since
//! the counter was last reset, and every pass that sees it held while
//! suppressed resets the counter again. Pressing a different button is
//! accepted immediately.

use log::trace;

use crate::board::Board;
use crate::tick::TickClock;
use crate::tone;
use crate::Symbol;

/// Echo tone played for an accepted press (delay-loop units, 180 ms)
pub const ECHO_NOTE: u32 = 45_000;
/// Ticks without an accepted press before the device goes to sleep (~64 s)
pub const IDLE_TIMEOUT_TICKS: u16 = 4000;

/// Result of one polling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Pressed(Symbol),
    Idle,
    /// Nothing accepted for longer than [`IDLE_TIMEOUT_TICKS`].
    Timeout,
}

#[derive(Debug, Default)]
pub struct Debouncer {
    last_button: Option<Symbol>,
}

impl Debouncer {
    pub fn new() -> Self {
        Debouncer { last_button: None }
    }

    /// Forget the previous press (start of a verification pass).
    pub fn clear(&mut self) {
        self.last_button = None;
    }

    pub fn last_button(&self) -> Option<Symbol> {
        self.last_button
    }

    /// Pretend `symbol` was the last accepted press.
    pub fn set_last_button(&mut self, symbol: Option<Symbol>) {
        self.last_button = symbol;
    }

    /// One pass over the four buttons.
    pub fn poll<B: Board>(&mut self, board: &mut B, clock: &TickClock) -> Poll {
        let pins = board.read_pins();
        for symbol in Symbol::ALL {
            if pins & symbol.sense_bit() != 0 {
                continue;
            }
            if clock.ticks() > 1 || self.last_button != Some(symbol) {
                tone::play(board, symbol, ECHO_NOTE);
                clock.reset_ticks();
                self.last_button = Some(symbol);
                trace!("press {:?}", symbol);
                return Poll::Pressed(symbol);
            }
            // still held from the previous press
            clock.reset_ticks();
        }
        if clock.ticks() > IDLE_TIMEOUT_TICKS {
            Poll::Timeout
        } else {
            Poll::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Attiny85;

    #[test]
    fn test_same_button_suppressed_at_zero_ticks() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        let mut deb = Debouncer::new();
        deb.set_last_button(Some(Symbol::Orange));
        dev.hold(Symbol::Orange);

        assert_eq!(deb.poll(&mut dev, &clock), Poll::Idle);
        assert!(dev.tone_log.is_empty());
    }

    #[test]
    fn test_same_button_accepted_after_two_ticks() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        let mut deb = Debouncer::new();
        deb.set_last_button(Some(Symbol::Orange));
        dev.hold(Symbol::Orange);
        clock.on_tick(0);
        clock.on_tick(0);

        assert_eq!(deb.poll(&mut dev, &clock), Poll::Pressed(Symbol::Orange));
        assert_eq!(clock.ticks(), 0);
        assert_eq!(dev.tone_log.len(), 1);
    }

    #[test]
    fn test_one_tick_is_not_enough() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        let mut deb = Debouncer::new();
        deb.set_last_button(Some(Symbol::Red));
        dev.hold(Symbol::Red);
        clock.on_tick(0);

        assert_eq!(deb.poll(&mut dev, &clock), Poll::Idle);
        // the suppressed hold restarted the interval
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn test_different_button_accepted_immediately() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        let mut deb = Debouncer::new();
        deb.set_last_button(Some(Symbol::Orange));
        dev.hold(Symbol::Green);

        assert_eq!(deb.poll(&mut dev, &clock), Poll::Pressed(Symbol::Green));
        assert_eq!(deb.last_button(), Some(Symbol::Green));
        assert_eq!(dev.tone_log[0].symbol, Symbol::Green);
    }

    #[test]
    fn test_hold_is_not_repeated() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        dev.start_watchdog();
        dev.enable_interrupts();
        let mut deb = Debouncer::new();
        dev.hold(Symbol::Yellow);

        assert_eq!(deb.poll(&mut dev, &clock), Poll::Pressed(Symbol::Yellow));
        // keep holding for about a second of polling
        for _ in 0..20_000 {
            assert_eq!(deb.poll(&mut dev, &clock), Poll::Idle);
        }
        assert_eq!(dev.tone_log.len(), 1);

        dev.release_all();
        for _ in 0..2_000 {
            deb.poll(&mut dev, &clock);
        }
        dev.hold(Symbol::Yellow);
        assert_eq!(deb.poll(&mut dev, &clock), Poll::Pressed(Symbol::Yellow));
    }

    #[test]
    fn test_timeout_after_idle_window() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        let mut deb = Debouncer::new();
        for _ in 0..IDLE_TIMEOUT_TICKS {
            clock.on_tick(0);
        }
        assert_eq!(deb.poll(&mut dev, &clock), Poll::Idle);
        clock.on_tick(0);
        assert_eq!(deb.poll(&mut dev, &clock), Poll::Timeout);
    }
}
