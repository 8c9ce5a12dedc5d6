//! Simon runner v0.3.0.
//!
//! Provides two execution modes:
//!
//! - **GUI mode** (default): the firmware plays in real time against a window
//!   with four pads, keyboard/gamepad input and square-wave audio.
//! - **Headless mode** (`--headless`): the firmware runs on the simulated
//!   ATtiny85 at full speed against a player that repeats what it hears, and
//!   the game is printed as a trace.
//!
//! Both modes keep the chip's EEPROM in an image file (`--eeprom`), so the
//! best score and its seed survive between runs.

mod desktop;
mod headless;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use simon_core::Symbol;

#[derive(Parser, Debug)]
#[command(name = "simon", version, about = "Four-pad Simon game on an ATtiny85")]
pub struct Args {
    /// Run on the simulated chip without a window
    #[arg(long)]
    pub headless: bool,

    /// EEPROM image file
    #[arg(long, default_value = "simon.eep")]
    pub eeprom: PathBuf,

    /// Pad held during reset: orange=resume, yellow=replay, green=demo, red=reset best
    #[arg(long, value_parser = parse_colour)]
    pub hold: Option<Symbol>,

    /// Level at which the headless player answers wrong (never, if omitted)
    #[arg(long)]
    pub miss_at: Option<u8>,

    /// Noise on the floating ADC input of the simulated chip
    #[arg(long, default_value_t = 0x2545_F491)]
    pub noise_seed: u32,

    /// Simulated time after which a headless run stops
    #[arg(long, default_value_t = 600.0)]
    pub max_seconds: f64,

    /// Disable audio
    #[arg(long)]
    pub mute: bool,

    /// Log state transitions
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_colour(s: &str) -> Result<Symbol, String> {
    Symbol::from_name(s).ok_or_else(|| format!("unknown pad '{}' (red, orange, yellow, green)", s))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if args.headless {
        headless::run(&args)
    } else {
        desktop::run(&args)
    }
}
