//! Headless mode: the firmware on the simulated chip, played by a [`Mimic`].

use anyhow::{Context, Result};
use log::{info, warn};
use simon_core::device::Mimic;
use simon_core::eeprom_file;
use simon_core::game::SleepCause;
use simon_core::{Attiny85, Game, Phase, Symbol, TickClock, CLOCK_HZ};

use crate::Args;

pub fn run(args: &Args) -> Result<()> {
    let eeprom = eeprom_file::load_or_erased(&args.eeprom)
        .with_context(|| format!("reading {}", args.eeprom.display()))?;

    let clock = TickClock::new();
    let mut dev = Attiny85::new(&clock).with_noise_seed(args.noise_seed).with_eeprom(eeprom);
    if let Some(pad) = args.hold {
        dev.hold(pad);
    }
    let mut game = Game::new(dev, &clock);
    game.step();
    game.step();

    let state = game.state();
    println!(
        "boot: {:?}  level {}  best {}  seed {:#06x}",
        state.mode, state.level, state.max_level, state.seed()
    );
    let player = Mimic::new(state.level, args.miss_at);
    let board = game.board_mut();
    board.release_all();
    board.set_player(Some(Box::new(player)));

    let limit = (args.max_seconds * CLOCK_HZ as f64) as u64;
    let mut printed = 0;
    while game.phase() != Phase::Halted && game.board().cycles < limit {
        let phase = game.phase();
        let level = game.state().level;
        let next = game.step();

        let log = &game.board().tone_log;
        let notes: Vec<Symbol> = log[printed..].iter().map(|t| t.symbol).collect();
        printed = log.len();
        match phase {
            Phase::Playback => println!("{:>8.2}s  level {:3}  {}", game.board().seconds(), level, names(&notes)),
            Phase::AwaitInput if next == Phase::LevelUp => println!("{:>21}", "ok"),
            Phase::AwaitInput if next == Phase::GameOver => {
                println!("{:>21}  {}", "wrong", names(&notes))
            }
            _ => {}
        }
    }

    match game.sleep_cause() {
        Some(SleepCause::GameOver { level, new_best: true }) => println!("game over at level {} (new best)", level),
        Some(SleepCause::GameOver { level, .. }) => println!("game over at level {}", level),
        Some(SleepCause::IdleTimeout) => println!("no input, went to sleep"),
        None => warn!("stopped after {:.0} simulated seconds", game.board().seconds()),
    }

    let eeprom = game.into_board().into_eeprom();
    if eeprom.dirty {
        eeprom_file::save_to_file(&eeprom, &args.eeprom)
            .with_context(|| format!("writing {}", args.eeprom.display()))?;
        info!("saved {}", args.eeprom.display());
    }
    Ok(())
}

fn names(notes: &[Symbol]) -> String {
    notes.iter().map(|s| s.name()).collect::<Vec<_>>().join(" ")
}
