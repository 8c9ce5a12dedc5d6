//! EEPROM array.
//!
//! 512 bytes, erased state 0xFF. Addresses wrap like the chip's 9-bit EEAR.
//! `dirty` tells host runners the image needs writing back to disk.

use crate::board::Eeprom;
use crate::EEPROM_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromMem {
    data: Vec<u8>,
    pub dirty: bool,
    pub writes: u32,
}

impl EepromMem {
    /// Erased chip.
    pub fn new() -> Self {
        EepromMem { data: vec![0xFFu8; EEPROM_SIZE], dirty: false, writes: 0 }
    }

    /// Take over existing contents; short images are padded with erased bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut mem = EepromMem::new();
        let len = bytes.len().min(EEPROM_SIZE);
        mem.data[..len].copy_from_slice(&bytes[..len]);
        mem
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for EepromMem {
    fn default() -> Self {
        Self::new()
    }
}

impl Eeprom for EepromMem {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.data[addr as usize % EEPROM_SIZE]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        let cell = &mut self.data[addr as usize % EEPROM_SIZE];
        // eeprom_write_byte always erases and programs, even for equal values
        *cell = value;
        self.writes += 1;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erased_and_wrapping() {
        let mut mem = EepromMem::new();
        assert!(mem.bytes().iter().all(|&b| b == 0xFF));
        mem.write_byte(EEPROM_SIZE as u16 + 3, 0x42);
        assert_eq!(mem.read_byte(3), 0x42);
        assert!(mem.dirty);
        assert_eq!(mem.writes, 1);
    }

    #[test]
    fn test_from_short_image() {
        let mut mem = EepromMem::from_bytes(&[0x00, 0x01]);
        assert_eq!(mem.read_byte(1), 0x01);
        assert_eq!(mem.read_byte(2), 0xFF);
        assert!(!mem.dirty);
    }
}
