//! GUI mode.
//!
//! Three threads share a [`Panel`] of atomics:
//!
//! - the firmware thread runs [`Game`] against a [`DesktopBoard`], whose
//!   busy-waits are real sleeps;
//! - the ticker thread plays the watchdog interrupt every 16 ms;
//! - the window thread draws the pads, samples keyboard and gamepad, and
//!   drives the audio source.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use gilrs::{Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use log::{debug, error, info, warn};
use minifb::{Key, Window, WindowOptions};
use simon_core::debounce::IDLE_TIMEOUT_TICKS;
use simon_core::peripherals::EepromMem;
use simon_core::{eeprom_file, Board, Eeprom, Game, Phase, Symbol, TickClock};
use simon_core::{BUTTON_SENSE_MASK, CLOCK_HZ, CYCLES_PER_LOOP, TICK_CYCLES};

use crate::Args;

/// Audio output sample rate in Hz
const AUDIO_SAMPLE_RATE: u32 = 44100;
/// Square wave amplitude (0.0–1.0)
const AUDIO_VOLUME: f32 = 0.15;
/// Window edge in pixels
const SIZE: usize = 360;
/// Gap between pads
const GAP: usize = 12;
/// One pass of the polling loop on the chip (µs)
const POLL_MICROS: u64 = 48;
/// How often a halted firmware thread looks for a reset
const RESET_POLL: Duration = Duration::from_millis(20);
/// `lit` value while no pad is sounding
const DARK: u8 = 0xFF;

/// Only one chip, so only one watchdog.
static CLOCK: TickClock = TickClock::new();

/// State shared between the firmware, ticker and window threads.
struct Panel {
    /// Sense bits of the pads currently pressed
    pressed: AtomicU8,
    /// Index of the pad sounding, or [`DARK`]
    lit: AtomicU8,
    /// f32 bits of the speaker frequency, 0 when silent
    tone_hz: AtomicU32,
    level: AtomicU8,
    best: AtomicU8,
    demo: AtomicBool,
    watchdog: AtomicBool,
    interrupts: AtomicBool,
    asleep: AtomicBool,
    reset: AtomicBool,
    quit: AtomicBool,
    epoch: Instant,
}

impl Panel {
    fn new() -> Self {
        Panel {
            pressed: AtomicU8::new(0),
            lit: AtomicU8::new(DARK),
            tone_hz: AtomicU32::new(0.0f32.to_bits()),
            level: AtomicU8::new(0),
            best: AtomicU8::new(0),
            demo: AtomicBool::new(false),
            watchdog: AtomicBool::new(false),
            interrupts: AtomicBool::new(false),
            asleep: AtomicBool::new(false),
            reset: AtomicBool::new(false),
            quit: AtomicBool::new(false),
            epoch: Instant::now(),
        }
    }

    /// Low byte of a 1 MHz free-running count.
    fn fast_counter(&self) -> u8 {
        self.epoch.elapsed().as_micros() as u8
    }

    fn lit_pad(&self) -> Option<Symbol> {
        match self.lit.load(Ordering::Relaxed) {
            DARK => None,
            i => Some(Symbol::from_bits(i)),
        }
    }
}

// ─── Board ──────────────────────────────────────────────────────────────────

/// Real-time board: 1 µs per cycle, buttons and speaker on the [`Panel`].
///
/// Every EEPROM write goes straight to the image file, so closing the window
/// loses no more than pulling the batteries would.
struct DesktopBoard {
    panel: Arc<Panel>,
    eeprom: EepromMem,
    path: PathBuf,
    portb: u8,
    ddrb: u8,
    /// Pads held through the next boot (`--hold`)
    held: u8,
}

impl DesktopBoard {
    fn new(panel: Arc<Panel>, eeprom: EepromMem, path: PathBuf) -> Self {
        DesktopBoard { panel, eeprom, path, portb: 0, ddrb: 0, held: 0 }
    }

    /// Reset line pulled: busy-waits return at once, EEPROM writes are lost.
    fn resetting(&self) -> bool {
        self.panel.reset.load(Ordering::Acquire)
    }

    /// Register state after an external reset.
    fn power_on(&mut self) {
        self.portb = 0;
        self.ddrb = 0;
        self.stop_tone();
        self.panel.watchdog.store(false, Ordering::Release);
        self.panel.interrupts.store(false, Ordering::Release);
        self.panel.asleep.store(false, Ordering::Release);
    }
}

impl Eeprom for DesktopBoard {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.eeprom.read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if self.resetting() {
            return;
        }
        self.eeprom.write_byte(addr, value);
        persist(&mut self.eeprom, &self.path);
    }
}

impl Board for DesktopBoard {
    fn read_pins(&mut self) -> u8 {
        let pressed = if self.resetting() {
            // let the idle timeout expire so the running step ends
            while CLOCK.ticks() <= IDLE_TIMEOUT_TICKS {
                CLOCK.on_tick(0);
            }
            0
        } else {
            thread::sleep(Duration::from_micros(POLL_MICROS));
            self.panel.pressed.load(Ordering::Relaxed) | self.held
        };
        let inputs = BUTTON_SENSE_MASK & !self.ddrb & !pressed;
        let outputs = self.portb & self.ddrb;
        // PB5 is reset
        0x20 | inputs | outputs
    }

    fn write_port(&mut self, value: u8) {
        self.portb = value;
    }

    fn write_ddr(&mut self, value: u8) {
        self.ddrb = value;
    }

    fn start_tone(&mut self, top: u8) {
        if self.resetting() {
            return;
        }
        let hz = CLOCK_HZ as f32 / (8.0 * (top as f32 + 1.0));
        self.panel.tone_hz.store(hz.to_bits(), Ordering::Relaxed);
        let lit = Symbol::from_pins(self.ddrb).map_or(DARK, |s| s.index() as u8);
        self.panel.lit.store(lit, Ordering::Relaxed);
    }

    fn stop_tone(&mut self) {
        self.panel.tone_hz.store(0.0f32.to_bits(), Ordering::Relaxed);
        self.panel.lit.store(DARK, Ordering::Relaxed);
    }

    fn start_free_running_timer(&mut self) {}

    fn delay_loops(&mut self, loops: u32) {
        let mut left = Duration::from_micros(loops as u64 * CYCLES_PER_LOOP);
        while !left.is_zero() && !self.resetting() {
            let slice = left.min(RESET_POLL);
            thread::sleep(slice);
            left -= slice;
        }
    }

    fn spin(&mut self) {
        thread::yield_now();
    }

    fn analog_sample(&mut self) -> u16 {
        // scheduling jitter stands in for the floating input
        (self.panel.epoch.elapsed().subsec_nanos() & 0x3FF) as u16
    }

    fn start_watchdog(&mut self) {
        self.panel.watchdog.store(true, Ordering::Release);
    }

    fn stop_watchdog(&mut self) {
        self.panel.watchdog.store(false, Ordering::Release);
    }

    fn enable_interrupts(&mut self) {
        self.panel.interrupts.store(true, Ordering::Release);
    }

    fn disable_interrupts(&mut self) {
        self.panel.interrupts.store(false, Ordering::Release);
    }

    fn power_down(&mut self) {
        self.panel.asleep.store(true, Ordering::Release);
    }
}

// ─── Threads ────────────────────────────────────────────────────────────────

fn spawn_ticker(panel: Arc<Panel>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let period = Duration::from_micros(TICK_CYCLES * 1_000_000 / CLOCK_HZ as u64);
        while !panel.quit.load(Ordering::Relaxed) {
            thread::sleep(period);
            if panel.watchdog.load(Ordering::Acquire) && panel.interrupts.load(Ordering::Acquire) {
                CLOCK.on_tick(panel.fast_counter());
            }
        }
    })
}

/// Boot and play until power-down or reset; after power-down wait for a
/// reset; repeat.
fn spawn_firmware(panel: Arc<Panel>, eeprom: EepromMem, path: PathBuf, hold: Option<Symbol>) {
    thread::spawn(move || {
        let mut board = DesktopBoard::new(panel.clone(), eeprom, path);
        board.held = hold.map_or(0, Symbol::sense_bit);
        loop {
            CLOCK.power_on();
            board.power_on();

            let mut game = Game::new(board, &CLOCK);
            while !game.board().resetting() && game.step() != Phase::Halted {
                if game.phase() == Phase::Playback {
                    game.board_mut().held = 0;
                }
                let state = game.state();
                panel.level.store(state.level, Ordering::Relaxed);
                panel.best.store(state.max_level, Ordering::Relaxed);
                panel.demo.store(state.is_demo(), Ordering::Relaxed);
            }
            if game.phase() == Phase::Halted {
                info!("asleep: {:?}", game.sleep_cause());
            }
            board = game.into_board();

            while !board.resetting() {
                if panel.quit.load(Ordering::Relaxed) {
                    return;
                }
                thread::sleep(RESET_POLL);
            }
            panel.reset.store(false, Ordering::Release);
            debug!("reset");
        }
    });
}

fn persist(eeprom: &mut EepromMem, path: &Path) {
    if !eeprom.dirty {
        return;
    }
    match eeprom_file::save_to_file(eeprom, path) {
        Ok(()) => {
            eeprom.dirty = false;
            info!("saved {}", path.display());
        }
        Err(e) => error!("{}: {}", path.display(), e),
    }
}

// ─── Audio ──────────────────────────────────────────────────────────────────

/// Mono square wave at the frequency the firmware last programmed.
struct ToneSource {
    panel: Arc<Panel>,
    sample_rate: u32,
    phase: f32,
}

impl Iterator for ToneSource {
    type Item = f32;
    fn next(&mut self) -> Option<f32> {
        let freq = f32::from_bits(self.panel.tone_hz.load(Ordering::Relaxed));
        if freq <= 0.0 {
            self.phase = 0.0;
            return Some(0.0);
        }
        let s = if self.phase < 0.5 { AUDIO_VOLUME } else { -AUDIO_VOLUME };
        self.phase += freq / self.sample_rate as f32;
        self.phase %= 1.0;
        Some(s)
    }
}

impl rodio::Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> { None }
    fn channels(&self) -> u16 { 1 }
    fn sample_rate(&self) -> u32 { self.sample_rate }
    fn total_duration(&self) -> Option<Duration> { None }
}

fn setup_audio(panel: Arc<Panel>) -> Option<(rodio::OutputStream, rodio::Sink)> {
    match rodio::OutputStream::try_default() {
        Ok((stream, handle)) => match rodio::Sink::try_new(&handle) {
            Ok(sink) => {
                sink.append(ToneSource { panel, sample_rate: AUDIO_SAMPLE_RATE, phase: 0.0 });
                Some((stream, sink))
            }
            Err(e) => { warn!("audio sink: {}", e); None }
        },
        Err(e) => { warn!("audio device: {}", e); None }
    }
}

// ─── Gamepad ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GamepadState {
    pads: [bool; 4],
    start: bool,
}

fn poll_gamepad(gilrs: &mut Gilrs, state: &mut GamepadState) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(b, _) => apply_button(state, b, true),
            EventType::ButtonReleased(b, _) => apply_button(state, b, false),
            EventType::Disconnected => *state = GamepadState::default(),
            _ => {}
        }
    }
}

fn apply_button(state: &mut GamepadState, btn: GilrsButton, pressed: bool) {
    let pad = match btn {
        GilrsButton::DPadUp | GilrsButton::North => Symbol::Orange,
        GilrsButton::DPadRight | GilrsButton::East => Symbol::Yellow,
        GilrsButton::DPadLeft | GilrsButton::West => Symbol::Green,
        GilrsButton::DPadDown | GilrsButton::South => Symbol::Red,
        GilrsButton::Start => {
            state.start = pressed;
            return;
        }
        _ => return,
    };
    state.pads[pad.index()] = pressed;
}

// ─── Rendering ──────────────────────────────────────────────────────────────

/// Screen quadrant of each pad: (column, row).
fn quadrant(pad: Symbol) -> (usize, usize) {
    match pad {
        Symbol::Orange => (0, 0),
        Symbol::Yellow => (1, 0),
        Symbol::Green => (0, 1),
        Symbol::Red => (1, 1),
    }
}

fn pad_colour(pad: Symbol, lit: bool) -> u32 {
    let (on, off) = match pad {
        Symbol::Red => (0xFF3030, 0x501010),
        Symbol::Orange => (0xFF9020, 0x502a08),
        Symbol::Yellow => (0xFFE040, 0x504810),
        Symbol::Green => (0x30E050, 0x104818),
    };
    if lit { on } else { off }
}

fn render(buf: &mut [u32], lit: Option<Symbol>, asleep: bool) {
    buf.fill(0x101010);
    let half = SIZE / 2;
    for pad in Symbol::ALL {
        let (cx, cy) = quadrant(pad);
        let colour = if asleep { 0x202020 } else { pad_colour(pad, lit == Some(pad)) };
        for y in cy * half + GAP / 2..(cy + 1) * half - GAP / 2 {
            let row = &mut buf[y * SIZE..(y + 1) * SIZE];
            row[cx * half + GAP / 2..(cx + 1) * half - GAP / 2].fill(colour);
        }
    }
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

const PAD_KEYS: [(Symbol, Key); 4] = [
    (Symbol::Orange, Key::Q),
    (Symbol::Yellow, Key::W),
    (Symbol::Green, Key::A),
    (Symbol::Red, Key::S),
];

pub fn run(args: &Args) -> Result<()> {
    let eeprom = eeprom_file::load_or_erased(&args.eeprom)
        .with_context(|| format!("reading {}", args.eeprom.display()))?;

    let mut window = Window::new("Simon", SIZE, SIZE, WindowOptions::default())
        .context("creating window")?;
    window.set_target_fps(60);

    let panel = Arc::new(Panel::new());
    let ticker = spawn_ticker(panel.clone());
    spawn_firmware(panel.clone(), eeprom, args.eeprom.clone(), args.hold);

    let mut muted = args.mute;
    let mut _audio = if muted { None } else { setup_audio(panel.clone()) };
    let mut gilrs = match Gilrs::new() {
        Ok(g) => Some(g),
        Err(e) => { warn!("gamepad: {}", e); None }
    };
    let mut gp = GamepadState::default();
    let mut buf = vec![0u32; SIZE * SIZE];
    let mut prev_m = false;
    let mut prev_reset = false;
    let mut last_title = Instant::now();

    println!("Keys: Q=orange W=yellow A=green S=red  R=reset M=mute Esc=quit");

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(ref mut g) = gilrs {
            poll_gamepad(g, &mut gp);
        }

        let mut pressed = 0u8;
        for (pad, key) in PAD_KEYS {
            if window.is_key_down(key) || gp.pads[pad.index()] {
                pressed |= pad.sense_bit();
            }
        }
        panel.pressed.store(pressed, Ordering::Relaxed);

        // Reset (R / Start)
        let reset = window.is_key_down(Key::R) || gp.start;
        if reset && !prev_reset {
            panel.reset.store(true, Ordering::Release);
        }
        prev_reset = reset;

        // Mute (M)
        let m = window.is_key_down(Key::M);
        if m && !prev_m {
            muted = !muted;
            _audio = if muted { None } else { setup_audio(panel.clone()) };
        }
        prev_m = m;

        let asleep = panel.asleep.load(Ordering::Acquire);
        render(&mut buf, panel.lit_pad(), asleep);
        window.update_with_buffer(&buf, SIZE, SIZE).context("updating window")?;

        if last_title.elapsed() >= Duration::from_millis(250) {
            let status = if asleep {
                "asleep - R to reset".to_string()
            } else if panel.demo.load(Ordering::Relaxed) {
                "demo".to_string()
            } else {
                format!("level {}", panel.level.load(Ordering::Relaxed))
            };
            let best = panel.best.load(Ordering::Relaxed);
            let mute = if muted { " [MUTE]" } else { "" };
            window.set_title(&format!("Simon - {} - best {}{}", status, best, mute));
            last_title = Instant::now();
        }
    }

    panel.quit.store(true, Ordering::Relaxed);
    let _ = ticker.join();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simon_core::game::SleepCause;
    use simon_core::{store, GameState};

    fn temp_image(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("simon-desktop-{}-{}.eep", name, std::process::id()))
    }

    #[test]
    fn test_eeprom_writes_reach_the_file() {
        let path = temp_image("write");
        let mut board = DesktopBoard::new(Arc::new(Panel::new()), EepromMem::new(), path.clone());
        store::save(&mut board, 9, 0x0909);

        let mut on_disk = eeprom_file::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(store::load(&mut on_disk), store::PersistentRecord { best_level: 9, seed: 0x0909 });
        assert!(!board.eeprom.dirty);
    }

    #[test]
    fn test_reset_ends_a_running_step() {
        let path = temp_image("reset");
        let panel = Arc::new(Panel::new());
        let board = DesktopBoard::new(panel.clone(), EepromMem::new(), path.clone());
        panel.pressed.store(Symbol::Red.sense_bit(), Ordering::Relaxed);
        panel.reset.store(true, Ordering::Release);

        // a verification pass would otherwise wait ~64 s for input
        let started = Instant::now();
        let mut game = Game::resume_at(board, &CLOCK, GameState::new(0), Phase::AwaitInput);
        assert_eq!(game.step(), Phase::Sleep);
        assert_eq!(game.sleep_cause(), Some(SleepCause::IdleTimeout));

        // a melody is skipped and a save is lost, as when power goes
        let board = game.board_mut();
        board.delay_loops(1_000_000);
        store::save(board, 5, 0x0505);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(board.eeprom.writes, 0);
        assert!(!path.exists());
        assert_eq!(panel.tone_hz.load(Ordering::Relaxed), 0.0f32.to_bits());
    }
}
