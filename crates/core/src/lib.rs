//! # simon-core
//!
//! Firmware core for a four-button Simon memory game on an ATtiny85-class
//! microcontroller (1 MHz core clock, 512 B EEPROM, Timer0 as tone generator,
//! watchdog as the periodic tick interrupt).
//!
//! The game logic never touches registers directly. Everything it needs from
//! the chip goes through the [`Board`] trait, so the same state machine runs on
//! the cycle-counting [`device::Attiny85`] model used by the tests and the
//! headless runner, and on the real-time desktop board in the frontend.
//!
//! ## Architecture
//!
//! - [`rng`]: 32-bit LCG reduced to a 2-bit [`Symbol`] per call
//! - [`tick`]: [`TickClock`], the watchdog-driven tick counter and entropy window
//! - [`entropy`]: boot-time seed harvesting (floating ADC + tick jitter)
//! - [`tone`]: scoped pin-bank acquisition for playing notes, fixed melodies
//! - [`debounce`]: tick-timestamped press detection and idle timeout
//! - [`store`]: two-field persistent record (best level, seed) in EEPROM
//! - [`power`]: deep-sleep entry
//! - [`game`]: [`Game`], the cooperative state machine tying it all together
//! - [`device`] / [`peripherals`]: simulated ATtiny85 (pins, Timer0, ADC, WDT, EEPROM)
//! - [`eeprom_file`]: EEPROM image files for host runners
//!
//! ## Pin bank
//!
//! PORTB is time-multiplexed. While reading buttons, PB0/PB2/PB3/PB4 are inputs
//! with pull-ups (a pressed button reads low). While playing a note, PB1
//! (OC0B, the speaker) and the symbol's LED pin are outputs and the pull-ups are
//! off. Only [`tone::play`] switches between the two configurations.

pub mod board;
pub mod rng;
pub mod tick;
pub mod entropy;
pub mod tone;
pub mod debounce;
pub mod store;
pub mod power;
pub mod game;
pub mod peripherals;
pub mod device;
pub mod eeprom_file;

pub use board::{Board, Eeprom};
pub use device::Attiny85;
pub use game::{BootMode, Game, GameState, Phase};
pub use rng::Sequence;
pub use store::PersistentRecord;
pub use tick::TickClock;

/// Core clock frequency: 1 MHz (8 MHz RC oscillator, CKDIV8 fuse)
pub const CLOCK_HZ: u32 = 1_000_000;
/// EEPROM size: 512 bytes
pub const EEPROM_SIZE: usize = 512;
/// Core cycles per iteration of the busy-wait delay loop
pub const CYCLES_PER_LOOP: u64 = 4;
/// Core cycles between watchdog interrupts (~16 ms)
pub const TICK_CYCLES: u64 = 16_000;

/// Pull-up / sense bits of the four buttons on PORTB (PB0, PB2, PB3, PB4)
pub const BUTTON_SENSE_MASK: u8 = 0x1d;
/// Speaker pin (PB1 = OC0B)
pub const SPEAKER_PIN: u8 = 0x02;

/// DDRB pattern while a symbol plays: speaker plus the symbol's LED pin
pub const SYMBOL_PINS: [u8; 4] = [0x0a, 0x06, 0x03, 0x12];
/// Timer0 TOP (OCR0A) per symbol; frequency = CLOCK_HZ / (8 * (TOP + 1))
pub const TONE_TOPS: [u8; 4] = [239, 179, 143, 119];

/// Highest level reachable by play. 255 is reserved for demo mode.
pub const MAX_LEVEL: u8 = 254;
/// Level value that selects free-running demo playback
pub const DEMO_LEVEL: u8 = 255;

/// One of the four pads. The discriminant is the symbol value produced by the
/// sequence generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Bottom right
    Red = 0,
    /// Top left
    Orange = 1,
    /// Top right
    Yellow = 2,
    /// Bottom left
    Green = 3,
}

impl Symbol {
    /// All symbols in ascending order (the level-up melody order).
    pub const ALL: [Symbol; 4] = [Symbol::Red, Symbol::Orange, Symbol::Yellow, Symbol::Green];

    /// Map the low two bits of `value` to a symbol.
    pub const fn from_bits(value: u8) -> Symbol {
        match value & 0x03 {
            0 => Symbol::Red,
            1 => Symbol::Orange,
            2 => Symbol::Yellow,
            _ => Symbol::Green,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// DDRB value that routes Timer0 to the speaker and lights this pad.
    pub const fn pins(self) -> u8 {
        SYMBOL_PINS[self as usize]
    }

    /// Sense bit in PINB; reads low while the button is held.
    pub const fn sense_bit(self) -> u8 {
        SYMBOL_PINS[self as usize] & BUTTON_SENSE_MASK
    }

    /// Timer0 TOP value for this symbol's tone.
    pub const fn tone_top(self) -> u8 {
        TONE_TOPS[self as usize]
    }

    /// Tone frequency in Hz produced by [`Symbol::tone_top`] at prescaler 8.
    pub fn frequency_hz(self) -> f32 {
        CLOCK_HZ as f32 / (8.0 * (self.tone_top() as f32 + 1.0))
    }

    /// Find the symbol whose pin pattern is `ddr`.
    pub fn from_pins(ddr: u8) -> Option<Symbol> {
        Symbol::ALL.into_iter().find(|s| s.pins() == ddr)
    }

    /// The next pad clockwise in symbol order (wraps Green → Red).
    pub const fn next(self) -> Symbol {
        Symbol::from_bits(self as u8 + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbol::Red => "red",
            Symbol::Orange => "orange",
            Symbol::Yellow => "yellow",
            Symbol::Green => "green",
        }
    }

    /// Parse a colour name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Symbol> {
        Symbol::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sense_bits_are_distinct() {
        let mut seen = 0u8;
        for s in Symbol::ALL {
            assert_eq!(s.sense_bit().count_ones(), 1);
            assert_eq!(seen & s.sense_bit(), 0);
            assert_eq!(s.pins() & SPEAKER_PIN, SPEAKER_PIN);
            seen |= s.sense_bit();
        }
        assert_eq!(seen, BUTTON_SENSE_MASK);
    }

    #[test]
    fn test_frequencies_ascend() {
        let f: Vec<f32> = Symbol::ALL.iter().map(|s| s.frequency_hz()).collect();
        assert!(f.windows(2).all(|w| w[0] < w[1]));
        assert!((f[0] - 520.8).abs() < 1.0);
        assert!((f[3] - 1041.7).abs() < 1.0);
    }

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(Symbol::from_pins(0x03), Some(Symbol::Yellow));
        assert_eq!(Symbol::from_pins(0x00), None);
        assert_eq!(Symbol::from_name("GREEN"), Some(Symbol::Green));
        assert_eq!(Symbol::Green.next(), Symbol::Red);
        assert_eq!(Symbol::from_bits(6), Symbol::Yellow);
    }
}
