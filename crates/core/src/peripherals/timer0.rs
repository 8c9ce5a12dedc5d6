//! 8-bit Timer/Counter0.
//!
//! Two configurations are used by the firmware:
//!
//! - **Normal mode, clk/1**: free-running count sampled by the watchdog
//!   interrupt while the boot seed is mixed.
//! - **Fast PWM, TOP = OCR0A, clk/8**: square wave on OC0B (PB1) with
//!   OCR0B = TOP / 2, i.e. a 50 % duty tone at `CLOCK_HZ / (8 * (TOP + 1))`.
//!
//! The counter is not stepped; its value is derived from the cycle count at
//! which the current mode was entered.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// No clock source (TCCR0B = 0); TCNT0 frozen
    Stopped,
    FreeRunning,
    Tone { top: u8 },
}

pub struct Timer0 {
    mode: TimerMode,
    /// Cycle at which the current mode started
    since: u64,
    /// TCNT0 when the current mode started
    base: u8,
}

impl Timer0 {
    pub fn new() -> Self {
        Timer0 { mode: TimerMode::Stopped, since: 0, base: 0 }
    }

    pub fn is_running(&self) -> bool {
        self.mode != TimerMode::Stopped
    }

    fn switch(&mut self, mode: TimerMode, now: u64) {
        self.base = self.counter(now);
        self.since = now;
        self.mode = mode;
    }

    pub fn start_free_running(&mut self, now: u64) {
        self.switch(TimerMode::FreeRunning, now);
    }

    /// OCR0A = `top`, OCR0B = `top >> 1`, WGM02 set, prescaler 8.
    pub fn start_tone(&mut self, top: u8, now: u64) {
        self.switch(TimerMode::Tone { top }, now);
        // TCNT0 restarts below TOP so the first period is complete
        self.base = 0;
    }

    pub fn stop(&mut self, now: u64) {
        self.switch(TimerMode::Stopped, now);
    }

    /// TCNT0 at cycle `now`.
    pub fn counter(&self, now: u64) -> u8 {
        let elapsed = now.saturating_sub(self.since);
        match self.mode {
            TimerMode::Stopped => self.base,
            TimerMode::FreeRunning => (self.base as u64 + elapsed) as u8,
            TimerMode::Tone { top } => ((self.base as u64 + elapsed / 8) % (top as u64 + 1)) as u8,
        }
    }
}

impl Default for Timer0 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_running_counts_every_cycle() {
        let mut t = Timer0::new();
        t.start_free_running(1000);
        assert_eq!(t.counter(1000), 0);
        assert_eq!(t.counter(1100), 100);
        assert_eq!(t.counter(1000 + 256 + 5), 5);
    }

    #[test]
    fn test_stopped_counter_is_frozen() {
        let mut t = Timer0::new();
        t.start_free_running(0);
        t.stop(77);
        assert_eq!(t.counter(5000), 77);
        assert!(!t.is_running());
    }

    #[test]
    fn test_tone_wraps_at_top() {
        let mut t = Timer0::new();
        t.start_tone(119, 0);
        assert_eq!(t.counter(8 * 119), 119);
        assert_eq!(t.counter(8 * 120), 0);
    }
}
