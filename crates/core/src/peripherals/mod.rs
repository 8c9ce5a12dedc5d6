//! ATtiny85 peripheral models used by [`crate::device::Attiny85`].
//!
//! - [`Timer0`]: 8-bit Timer/Counter0 (tone PWM, free-running entropy counter)
//! - [`Adc`]: analog-to-digital converter on a floating input (boot entropy)
//! - [`Watchdog`]: watchdog in interrupt mode, the ~16 ms tick source
//! - [`EepromMem`]: 512 B EEPROM array

mod timer0;
mod adc;
mod watchdog;
mod eeprom;

pub use timer0::{Timer0, TimerMode};
pub use adc::Adc;
pub use watchdog::{Watchdog, MAX_DRIFT_CYCLES};
pub use eeprom::EepromMem;

/// One step of a 32-bit xorshift generator. `state` must be non-zero.
pub(crate) fn xorshift32(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}
