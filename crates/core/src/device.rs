//! Simulated ATtiny85 board.
//!
//! A cycle-counting model of the parts of the chip the firmware touches: the
//! PORTB pin bank with four buttons, Timer0, the ADC, the watchdog, EEPROM and
//! the sleep controller. Time only moves when the firmware spends it (delay
//! loops, spins, pin reads, conversions), which makes whole games run in
//! milliseconds and fully deterministic.
//!
//! Buttons are pressed either by [`Attiny85::hold`] (held until released, used
//! for boot-mode selection) or by a [`Player`] that is asked for a press
//! whenever the firmware samples the pins and no press is in progress. Each
//! player press is held for [`PRESS_HOLD_CYCLES`] and followed by at least
//! [`PRESS_GAP_CYCLES`] of released buttons, like a person tapping pads.

use std::collections::VecDeque;

use crate::board::{Board, Eeprom};
use crate::peripherals::{Adc, EepromMem, Timer0, Watchdog};
use crate::tick::TickClock;
use crate::{Symbol, CLOCK_HZ, CYCLES_PER_LOOP};

/// Cost of one pin-sampling pass of the polling loop
pub const POLL_CYCLES: u64 = 48;
/// Cost of one pass of an open-ended busy-wait
pub const SPIN_CYCLES: u64 = 8;
/// 13 ADC clocks at prescaler 2
pub const ADC_CYCLES: u64 = 26;
/// How long a player keeps a pad pressed (50 ms)
pub const PRESS_HOLD_CYCLES: u64 = 50_000;
/// Minimum released time between two player presses (60 ms)
pub const PRESS_GAP_CYCLES: u64 = 60_000;

/// PB5 is the reset pin and always reads high.
const RESET_PIN: u8 = 0x20;
/// Power-up noise when none is given
const DEFAULT_NOISE: u32 = 0x2545_F491;
/// Decorrelates the watchdog drift from the ADC noise drawn from the same seed
const DRIFT_SALT: u32 = 0x9E37_79B9;

/// A note as it came out of the speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneEvent {
    pub symbol: Symbol,
    /// Timer0 TOP the note was generated with
    pub top: u8,
    /// Cycle the note started
    pub start: u64,
    /// Duration in cycles
    pub cycles: u64,
}

/// Someone pressing pads on the simulated board.
pub trait Player {
    /// A note started sounding.
    fn on_tone(&mut self, _symbol: Symbol) {}

    /// The firmware is sampling the buttons and no press is in progress.
    /// Return a pad to press it now.
    fn next_press(&mut self, now: u64) -> Option<Symbol>;
}

/// Presses a fixed list of pads, starting once the first note has sounded.
#[derive(Debug, Default)]
pub struct Script {
    presses: VecDeque<Symbol>,
    armed: bool,
}

impl Script {
    pub fn new(presses: impl IntoIterator<Item = Symbol>) -> Self {
        Script { presses: presses.into_iter().collect(), armed: false }
    }
}

impl Player for Script {
    fn on_tone(&mut self, _symbol: Symbol) {
        self.armed = true;
    }

    fn next_press(&mut self, _now: u64) -> Option<Symbol> {
        if !self.armed {
            return None;
        }
        self.presses.pop_front()
    }
}

/// Repeats every sequence it hears, optionally getting the last pad of one
/// round wrong.
///
/// The player counts rounds itself: round `n` is the last `n + 1` notes heard
/// before it is asked to press. Echo notes of its own presses are not counted.
#[derive(Debug)]
pub struct Mimic {
    heard: Vec<Symbol>,
    queue: VecDeque<Symbol>,
    level: u8,
    miss_at: Option<u8>,
    echoes_pending: usize,
}

impl Mimic {
    /// Start listening for the round at `level`.
    pub fn new(level: u8, miss_at: Option<u8>) -> Self {
        Mimic { heard: Vec::new(), queue: VecDeque::new(), level, miss_at, echoes_pending: 0 }
    }

    /// Level of the round the player will answer next.
    pub fn level(&self) -> u8 {
        self.level
    }
}

impl Player for Mimic {
    fn on_tone(&mut self, symbol: Symbol) {
        if self.echoes_pending > 0 {
            self.echoes_pending -= 1;
        } else {
            self.heard.push(symbol);
        }
    }

    fn next_press(&mut self, _now: u64) -> Option<Symbol> {
        if self.queue.is_empty() {
            let len = self.level as usize + 1;
            if self.heard.len() < len {
                return None;
            }
            let mut round = self.heard.split_off(self.heard.len() - len);
            self.heard.clear();
            if self.miss_at == Some(self.level) {
                if let Some(last) = round.last_mut() {
                    *last = last.next();
                }
            }
            self.queue.extend(round);
            self.level = self.level.saturating_add(1);
        }
        let symbol = self.queue.pop_front()?;
        self.echoes_pending += 1;
        Some(symbol)
    }
}

#[derive(Debug, Clone, Copy)]
struct ActivePress {
    symbol: Symbol,
    until: u64,
}

pub struct Attiny85<'c> {
    clock: &'c TickClock,
    /// Core cycles since power-on
    pub cycles: u64,
    pub portb: u8,
    pub ddrb: u8,
    pub timer0: Timer0,
    pub adc: Adc,
    pub watchdog: Watchdog,
    pub eeprom: EepromMem,
    /// SREG.I
    pub interrupts_enabled: bool,
    pub asleep: bool,
    pub sleep_count: u32,
    /// Every note played since power-on, in order
    pub tone_log: Vec<ToneEvent>,
    /// Pin-sampling passes since power-on
    pub polls: u64,
    current_tone: Option<(Symbol, u8, u64)>,
    /// Sense bits of buttons held with [`Attiny85::hold`]
    held: u8,
    player: Option<Box<dyn Player>>,
    press: Option<ActivePress>,
    released_at: Option<u64>,
}

impl<'c> Attiny85<'c> {
    /// Power-on state with an erased EEPROM.
    pub fn new(clock: &'c TickClock) -> Self {
        Attiny85 {
            clock,
            cycles: 0,
            portb: 0,
            ddrb: 0,
            timer0: Timer0::new(),
            adc: Adc::new(DEFAULT_NOISE),
            watchdog: Watchdog::with_drift(DEFAULT_NOISE ^ DRIFT_SALT),
            eeprom: EepromMem::new(),
            interrupts_enabled: false,
            asleep: false,
            sleep_count: 0,
            tone_log: Vec::new(),
            polls: 0,
            current_tone: None,
            held: 0,
            player: None,
            press: None,
            released_at: None,
        }
    }

    /// Seed the power-up noise: the floating ADC input and the watchdog drift.
    pub fn with_noise_seed(mut self, seed: u32) -> Self {
        self.adc = Adc::new(seed);
        self.watchdog = Watchdog::with_drift(seed ^ DRIFT_SALT);
        self
    }

    /// Seed only the watchdog oscillator drift.
    pub fn with_drift_seed(mut self, seed: u32) -> Self {
        self.watchdog = Watchdog::with_drift(seed);
        self
    }

    pub fn with_eeprom(mut self, eeprom: EepromMem) -> Self {
        self.eeprom = eeprom;
        self
    }

    pub fn with_player(mut self, player: impl Player + 'static) -> Self {
        self.player = Some(Box::new(player));
        self
    }

    pub fn set_player(&mut self, player: Option<Box<dyn Player>>) {
        self.player = player;
        self.press = None;
        self.released_at = None;
    }

    /// Press and keep holding `symbol`.
    pub fn hold(&mut self, symbol: Symbol) {
        self.held |= symbol.sense_bit();
    }

    pub fn release_all(&mut self) {
        self.held = 0;
    }

    /// Symbols of all notes played so far.
    pub fn tones(&self) -> Vec<Symbol> {
        self.tone_log.iter().map(|t| t.symbol).collect()
    }

    pub fn seconds(&self) -> f64 {
        self.cycles as f64 / CLOCK_HZ as f64
    }

    pub fn into_eeprom(self) -> EepromMem {
        self.eeprom
    }

    /// Let `cycles` pass, delivering watchdog interrupts on the way.
    pub fn advance(&mut self, cycles: u64) {
        let until = self.cycles + cycles;
        while let Some(at) = self.watchdog.next_fire(until) {
            self.cycles = at;
            if self.interrupts_enabled {
                self.clock.on_tick(self.timer0.counter(at));
            }
        }
        self.cycles = until;
    }

    fn update_press(&mut self) {
        let now = self.cycles;
        if let Some(press) = self.press {
            if now < press.until {
                return;
            }
            self.press = None;
            self.released_at = Some(now);
        }
        if let Some(released) = self.released_at {
            if now < released + PRESS_GAP_CYCLES {
                return;
            }
        }
        if let Some(player) = self.player.as_mut() {
            if let Some(symbol) = player.next_press(now) {
                self.press = Some(ActivePress { symbol, until: now + PRESS_HOLD_CYCLES });
                self.released_at = None;
            }
        }
    }

    fn pressed_bits(&self) -> u8 {
        self.held | self.press.map_or(0, |p| p.symbol.sense_bit())
    }
}

impl Eeprom for Attiny85<'_> {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.eeprom.read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.eeprom.write_byte(addr, value)
    }
}

impl Board for Attiny85<'_> {
    fn read_pins(&mut self) -> u8 {
        self.advance(POLL_CYCLES);
        self.polls += 1;
        self.update_press();
        let pressed = self.pressed_bits();
        let mut pins = RESET_PIN;
        for bit in 0..5 {
            let mask = 1u8 << bit;
            let high = if self.ddrb & mask != 0 {
                self.portb & mask != 0
            } else {
                // a pressed button shorts the pin to ground; released inputs read high
                pressed & mask == 0
            };
            if high {
                pins |= mask;
            }
        }
        pins
    }

    fn write_port(&mut self, value: u8) {
        self.portb = value;
    }

    fn write_ddr(&mut self, value: u8) {
        self.ddrb = value;
    }

    fn start_tone(&mut self, top: u8) {
        self.timer0.start_tone(top, self.cycles);
        let symbol = Symbol::from_pins(self.ddrb);
        self.current_tone = symbol.map(|s| (s, top, self.cycles));
        if let (Some(symbol), Some(player)) = (symbol, self.player.as_mut()) {
            player.on_tone(symbol);
        }
    }

    fn stop_tone(&mut self) {
        self.timer0.stop(self.cycles);
        if let Some((symbol, top, start)) = self.current_tone.take() {
            self.tone_log.push(ToneEvent { symbol, top, start, cycles: self.cycles - start });
        }
    }

    fn start_free_running_timer(&mut self) {
        self.timer0.start_free_running(self.cycles);
    }

    fn delay_loops(&mut self, loops: u32) {
        self.advance(loops as u64 * CYCLES_PER_LOOP);
    }

    fn spin(&mut self) {
        self.advance(SPIN_CYCLES);
    }

    fn analog_sample(&mut self) -> u16 {
        self.advance(ADC_CYCLES);
        self.adc.convert()
    }

    fn start_watchdog(&mut self) {
        self.watchdog.start(self.cycles);
    }

    fn stop_watchdog(&mut self) {
        self.watchdog.stop();
    }

    fn enable_interrupts(&mut self) {
        self.interrupts_enabled = true;
    }

    fn disable_interrupts(&mut self) {
        self.interrupts_enabled = false;
    }

    fn power_down(&mut self) {
        self.asleep = true;
        self.sleep_count += 1;
    }
}
