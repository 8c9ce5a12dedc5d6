//! Analog-to-digital converter on an unconnected input.
//!
//! ADC0 floats, so a conversion returns noise. The model produces 10-bit
//! readings from an xorshift generator whose state stands in for the
//! electrical noise; seeding it differently models a different power-up.

/// Mid-scale reading around which the floating input wanders
const FLOAT_LEVEL: u16 = 0x200;

use super::xorshift32;

pub struct Adc {
    noise: u32,
    pub conversions: u32,
}

impl Adc {
    pub fn new(noise_seed: u32) -> Self {
        // xorshift state must be non-zero
        Adc { noise: noise_seed.max(1), conversions: 0 }
    }

    /// ADEN + ADSC, wait for ADSC to clear, read ADCL/ADCH, then ADCSRA = 0.
    pub fn convert(&mut self) -> u16 {
        self.conversions += 1;
        FLOAT_LEVEL - 0x80 + (xorshift32(&mut self.noise) & 0xFF) as u16
    }
}
