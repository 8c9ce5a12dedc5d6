//! Register layer consumed by the firmware.
//!
//! The methods map onto the handful of ATtiny85 register operations the game
//! performs (PORTB/DDRB/PINB, Timer0 control, ADC, watchdog, SREG.I, sleep).
//! Implementations: [`crate::device::Attiny85`] (cycle-counting model) and the
//! frontend's real-time desktop board.

/// Byte-addressed non-volatile memory.
pub trait Eeprom {
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);

    /// Read a little-endian word (`eeprom_read_word` layout).
    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read_byte(addr);
        let hi = self.read_byte(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Write a little-endian word.
    fn write_word(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(addr, lo);
        self.write_byte(addr.wrapping_add(1), hi);
    }
}

/// Pin bank, timers, ADC, watchdog and sleep controller.
pub trait Board: Eeprom {
    /// Sample PINB.
    fn read_pins(&mut self) -> u8;
    /// Write PORTB (pull-ups for input pins, levels for output pins).
    fn write_port(&mut self, value: u8);
    /// Write DDRB (1 = output).
    fn write_ddr(&mut self, value: u8);

    /// Timer0 fast PWM, TOP = `top`, compare B = `top / 2`, prescaler 8.
    fn start_tone(&mut self, top: u8);
    /// Remove Timer0's clock source.
    fn stop_tone(&mut self);
    /// Timer0 in normal mode without prescaler (the entropy jitter source).
    fn start_free_running_timer(&mut self);

    /// Busy-wait `loops` iterations of the 4-cycle delay loop.
    fn delay_loops(&mut self, loops: u32);
    /// One pass of an open-ended busy-wait.
    fn spin(&mut self);

    /// One conversion on the unconnected ADC input.
    fn analog_sample(&mut self) -> u16;

    /// Watchdog in interrupt mode with the shortest period (~16 ms).
    fn start_watchdog(&mut self);
    fn stop_watchdog(&mut self);
    fn enable_interrupts(&mut self);
    fn disable_interrupts(&mut self);

    /// Enter power-down sleep. Does not return on hardware.
    fn power_down(&mut self);
}

impl<E: Eeprom + ?Sized> Eeprom for &mut E {
    fn read_byte(&mut self, addr: u16) -> u8 {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        (**self).write_byte(addr, value)
    }
}
