//! Game state machine.
//!
//! ```text
//! Boot -> ModeSelect -> Playback -> AwaitInput -> LevelUp -> Playback ...
//!                                       |             |
//!                                       |             +-> GameOver (level 254 won)
//!                                       +-> GameOver -> Sleep -> Halted
//!                                       +-> Sleep (idle timeout)
//! ```
//!
//! [`Game::step`] executes one phase to completion (each phase blocks on the
//! board's busy-waits) and returns the next one. [`Game::run`] steps until the
//! device has powered down. Demo mode never gets there: every step plays
//! another block of the endless sequence.

use log::{debug, info};

use crate::board::Board;
use crate::debounce::{Debouncer, Poll};
use crate::rng::Sequence;
use crate::tick::TickClock;
use crate::{entropy, power, store, tone};
use crate::{Symbol, BUTTON_SENSE_MASK, DEMO_LEVEL, MAX_LEVEL};

/// Pause after a round and before the game-over melody (delay-loop units)
pub const LONG_PAUSE: u32 = 65_535;
/// Pause after the level-up melody
pub const LEVEL_PAUSE: u32 = 45_000;
/// Gap before each hint note after a wrong press
pub const HINT_GAP: u32 = 10_000;
/// Hint note showing the correct pad
pub const HINT_NOTE: u32 = 20_000;
pub const HINT_REPEATS: usize = 3;
/// Level-up melodies played for a new best score
pub const BEST_FANFARE_REPEATS: usize = 3;
/// Symbols per demo-mode step
pub const DEMO_BLOCK: usize = 256;

/// Gap before each played symbol; shrinks as the level grows.
pub fn pacing(level: u8) -> u32 {
    4_400 + 489_088 / (8 + level as u32)
}

/// Length of each played symbol; shrinks as the level grows.
pub fn note_length(level: u8) -> u32 {
    20_000 + 200_000 / (8 + level as u32)
}

/// Start-up behaviour, chosen by the button held during reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    /// Fresh game from level 0 with a harvested seed
    Normal,
    /// Orange held: continue the best game at its level
    Resume,
    /// Yellow held: replay the best game from level 0
    Replay,
    /// Green held: endless playback, no input
    Demo,
    /// Red held: erase the best score, then a normal game
    ResetBest,
}

impl BootMode {
    /// Decode PINB sampled at boot. Only single-button patterns select a mode.
    pub fn from_pins(pins: u8) -> BootMode {
        match pins & BUTTON_SENSE_MASK {
            0x19 => BootMode::Resume,
            0x1c => BootMode::Replay,
            0x0d => BootMode::Demo,
            0x15 => BootMode::ResetBest,
            _ => BootMode::Normal,
        }
    }

    /// Button to hold during reset to select this mode.
    pub fn button(self) -> Option<Symbol> {
        match self {
            BootMode::Normal => None,
            BootMode::Resume => Some(Symbol::Orange),
            BootMode::Replay => Some(Symbol::Yellow),
            BootMode::Demo => Some(Symbol::Green),
            BootMode::ResetBest => Some(Symbol::Red),
        }
    }

    /// Whether the game takes its seed from the stored best game.
    fn loads_stored_seed(self) -> bool {
        matches!(self, BootMode::Resume | BootMode::Replay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Boot,
    ModeSelect,
    Playback,
    AwaitInput,
    LevelUp,
    GameOver,
    Sleep,
    /// Powered down; only a reset (a new [`Game`]) continues.
    Halted,
}

/// Why the device went to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepCause {
    GameOver { level: u8, new_best: bool },
    IdleTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Current round; the sequence has `level + 1` symbols.
    pub level: u8,
    /// Best level read from EEPROM at boot.
    pub max_level: u8,
    pub sequence: Sequence,
    pub mode: BootMode,
}

impl GameState {
    pub fn new(seed: u16) -> Self {
        GameState { level: 0, max_level: 0, sequence: Sequence::new(seed), mode: BootMode::Normal }
    }

    pub fn seed(&self) -> u16 {
        self.sequence.seed()
    }

    pub fn is_demo(&self) -> bool {
        self.level == DEMO_LEVEL
    }
}

pub struct Game<'c, B: Board> {
    board: B,
    clock: &'c TickClock,
    state: GameState,
    phase: Phase,
    debouncer: Debouncer,
    demo_running: bool,
    sleep_cause: Option<SleepCause>,
}

impl<'c, B: Board> Game<'c, B> {
    /// Fresh power-on: starts at [`Phase::Boot`].
    pub fn new(board: B, clock: &'c TickClock) -> Self {
        Self::resume_at(board, clock, GameState::new(0), Phase::Boot)
    }

    /// Start from an explicit state and phase, skipping boot.
    pub fn resume_at(board: B, clock: &'c TickClock, state: GameState, phase: Phase) -> Self {
        Game {
            board,
            clock,
            state,
            phase,
            debouncer: Debouncer::new(),
            demo_running: false,
            sleep_cause: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn into_board(self) -> B {
        self.board
    }

    pub fn sleep_cause(&self) -> Option<SleepCause> {
        self.sleep_cause
    }

    /// Run until powered down.
    pub fn run(&mut self) {
        while self.step() != Phase::Halted {}
    }

    /// Execute the current phase and move to the next one.
    pub fn step(&mut self) -> Phase {
        let next = match self.phase {
            Phase::Boot => self.boot(),
            Phase::ModeSelect => self.mode_select(),
            Phase::Playback => self.playback(),
            Phase::AwaitInput => self.await_input(),
            Phase::LevelUp => self.level_up(),
            Phase::GameOver => self.game_over(),
            Phase::Sleep => {
                power::sleep_now(&mut self.board);
                Phase::Halted
            }
            Phase::Halted => Phase::Halted,
        };
        if next != self.phase {
            debug!("{:?} -> {:?} (level {})", self.phase, next, self.state.level);
        }
        self.phase = next;
        next
    }

    fn boot(&mut self) -> Phase {
        self.board.write_port(BUTTON_SENSE_MASK);
        let seed = entropy::harvest(&mut self.board, self.clock);
        self.state = GameState::new(seed);
        Phase::ModeSelect
    }

    fn mode_select(&mut self) -> Phase {
        self.state.max_level = store::load_best_level(&mut self.board);
        let mode = BootMode::from_pins(self.board.read_pins());
        if mode.loads_stored_seed() {
            let record = store::load(&mut self.board);
            self.state.sequence = Sequence::new(record.seed);
        }
        match mode {
            BootMode::Resume => self.state.level = self.state.max_level,
            BootMode::Demo => self.state.level = DEMO_LEVEL,
            BootMode::ResetBest => {
                store::erase(&mut self.board);
                self.state.max_level = 0;
            }
            BootMode::Normal | BootMode::Replay => {}
        }
        self.state.mode = mode;
        info!(
            "boot: mode={:?} level={} best={} seed={:#06x}",
            mode, self.state.level, self.state.max_level, self.state.seed()
        );
        Phase::Playback
    }

    fn playback(&mut self) -> Phase {
        if self.state.is_demo() {
            if !self.demo_running {
                self.state.sequence.reset_context();
                self.demo_running = true;
            }
            for _ in 0..DEMO_BLOCK {
                self.play_next(DEMO_LEVEL);
            }
            return Phase::Playback;
        }

        let level = self.state.level;
        self.state.sequence.reset_context();
        for _ in 0..=level {
            self.play_next(level);
        }
        Phase::AwaitInput
    }

    fn play_next(&mut self, level: u8) {
        self.board.delay_loops(pacing(level));
        let symbol = self.state.sequence.next_symbol();
        tone::play(&mut self.board, symbol, note_length(level));
    }

    fn await_input(&mut self) -> Phase {
        self.clock.reset_ticks();
        self.debouncer.clear();
        self.state.sequence.reset_context();

        for _ in 0..=self.state.level {
            let pressed = loop {
                match self.debouncer.poll(&mut self.board, self.clock) {
                    Poll::Pressed(symbol) => break symbol,
                    Poll::Idle => {}
                    Poll::Timeout => {
                        info!("idle timeout at level {}", self.state.level);
                        self.sleep_cause = Some(SleepCause::IdleTimeout);
                        return Phase::Sleep;
                    }
                }
            };
            let correct = self.state.sequence.next_symbol();
            if pressed != correct {
                info!("wrong pad {:?}, expected {:?}", pressed, correct);
                for _ in 0..HINT_REPEATS {
                    self.board.delay_loops(HINT_GAP);
                    tone::play(&mut self.board, correct, HINT_NOTE);
                }
                self.board.delay_loops(LONG_PAUSE);
                return Phase::GameOver;
            }
        }
        Phase::LevelUp
    }

    fn level_up(&mut self) -> Phase {
        self.board.delay_loops(LONG_PAUSE);
        if self.state.level < MAX_LEVEL {
            self.state.level += 1;
            tone::level_up(&mut self.board);
            self.board.delay_loops(LEVEL_PAUSE);
            Phase::Playback
        } else {
            // nothing above the last level: end as a win
            tone::level_up(&mut self.board);
            Phase::GameOver
        }
    }

    fn game_over(&mut self) -> Phase {
        tone::game_over(&mut self.board);
        let level = self.state.level;
        // a loss at level 0 never beats the erased value 0, so it is not recorded
        let new_best = level > self.state.max_level;
        if new_best {
            store::save(&mut self.board, level, self.state.seed());
            self.state.max_level = level;
            for _ in 0..BEST_FANFARE_REPEATS {
                tone::level_up(&mut self.board);
            }
        }
        info!("game over at level {} (new best: {})", level, new_best);
        self.sleep_cause = Some(SleepCause::GameOver { level, new_best });
        Phase::Sleep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_patterns() {
        assert_eq!(BootMode::from_pins(0x1d), BootMode::Normal);
        assert_eq!(BootMode::from_pins(0x19), BootMode::Resume);
        assert_eq!(BootMode::from_pins(0x1c), BootMode::Replay);
        assert_eq!(BootMode::from_pins(0x0d), BootMode::Demo);
        assert_eq!(BootMode::from_pins(0x15), BootMode::ResetBest);
        // speaker and reset pins are ignored
        assert_eq!(BootMode::from_pins(0x3b), BootMode::Resume);
        // two buttons held: no mode
        assert_eq!(BootMode::from_pins(0x18), BootMode::Normal);
        assert_eq!(BootMode::from_pins(0x00), BootMode::Normal);
    }

    #[test]
    fn test_mode_buttons_match_patterns() {
        for mode in [BootMode::Resume, BootMode::Replay, BootMode::Demo, BootMode::ResetBest] {
            let held = mode.button().unwrap();
            let pins = BUTTON_SENSE_MASK & !held.sense_bit();
            assert_eq!(BootMode::from_pins(pins), mode);
        }
    }

    #[test]
    fn test_timing_shrinks_with_level() {
        assert_eq!(pacing(0), 65_536);
        assert_eq!(note_length(0), 45_000);
        for level in 0..MAX_LEVEL {
            assert!(pacing(level + 1) <= pacing(level));
            assert!(note_length(level + 1) <= note_length(level));
        }
        assert!(note_length(MAX_LEVEL) > HINT_NOTE);
    }
}
