//! Tone output and pin-bank multiplexing.
//!
//! The speaker and the button inputs share PORTB. [`ToneGuard`] is the only
//! way to put the bank into output mode; dropping it stops Timer0 and restores
//! inputs with pull-ups, so every note ends with the buttons readable again.

use log::trace;

use crate::board::Board;
use crate::{Symbol, BUTTON_SENSE_MASK};

/// Note length of the fixed melodies (delay-loop units, 100 ms)
pub const MELODY_NOTE: u32 = 25_000;

/// Pin bank in output mode, driving the speaker with one symbol's tone.
pub struct ToneGuard<'b, B: Board> {
    board: &'b mut B,
}

impl<'b, B: Board> ToneGuard<'b, B> {
    /// Pull-ups off, speaker and LED pins as outputs, Timer0 running.
    pub fn acquire(board: &'b mut B, symbol: Symbol) -> Self {
        board.write_port(0x00);
        board.write_ddr(symbol.pins());
        board.start_tone(symbol.tone_top());
        ToneGuard { board }
    }

    /// Keep the tone sounding for `loops` delay-loop units.
    pub fn hold(&mut self, loops: u32) {
        self.board.delay_loops(loops);
    }
}

impl<B: Board> Drop for ToneGuard<'_, B> {
    fn drop(&mut self) {
        self.board.stop_tone();
        self.board.write_ddr(0x00);
        self.board.write_port(BUTTON_SENSE_MASK);
    }
}

/// Sound `symbol` for `loops` delay-loop units (busy-wait).
pub fn play<B: Board>(board: &mut B, symbol: Symbol, loops: u32) {
    trace!("tone {:?} for {} loops", symbol, loops);
    ToneGuard::acquire(board, symbol).hold(loops);
}

/// Ascending run over all four pads.
pub fn level_up<B: Board>(board: &mut B) {
    for symbol in Symbol::ALL {
        play(board, symbol, MELODY_NOTE);
    }
}

/// Descending run over all four pads.
pub fn game_over<B: Board>(board: &mut B) {
    for symbol in Symbol::ALL.into_iter().rev() {
        play(board, symbol, MELODY_NOTE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Attiny85;
    use crate::tick::TickClock;
    use crate::CYCLES_PER_LOOP;

    #[test]
    fn test_play_restores_input_mode() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        play(&mut dev, Symbol::Yellow, 1000);
        assert_eq!(dev.ddrb, 0x00);
        assert_eq!(dev.portb, BUTTON_SENSE_MASK);
        assert!(!dev.timer0.is_running());

        let tone = dev.tone_log[0];
        assert_eq!(tone.symbol, Symbol::Yellow);
        assert_eq!(tone.cycles, 1000 * CYCLES_PER_LOOP);
        assert_eq!(tone.top, 143);
    }

    #[test]
    fn test_guard_drives_speaker_while_held() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        {
            let mut guard = ToneGuard::acquire(&mut dev, Symbol::Green);
            guard.hold(10);
        }
        assert_eq!(dev.ddrb, 0x00);
        // the guard switched DDRB to the pad's pattern and then back
        assert_eq!(dev.tone_log.len(), 1);
        assert_eq!(dev.tone_log[0].symbol, Symbol::Green);
    }

    #[test]
    fn test_melodies() {
        let clock = TickClock::new();
        let mut dev = Attiny85::new(&clock);
        level_up(&mut dev);
        game_over(&mut dev);
        let order: Vec<Symbol> = dev.tone_log.iter().map(|t| t.symbol).collect();
        use Symbol::*;
        assert_eq!(order, vec![Red, Orange, Yellow, Green, Green, Yellow, Orange, Red]);
        assert!(dev.tone_log.iter().all(|t| t.cycles == MELODY_NOTE as u64 * CYCLES_PER_LOOP));
    }
}
