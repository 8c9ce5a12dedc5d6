//! Best score persistence.
//!
//! ## EEPROM layout
//!
//! | Offset | Content                          |
//! |--------|----------------------------------|
//! | 0      | best level, bitwise complemented |
//! | 1–2    | seed of that game, little-endian |
//!
//! Erased EEPROM reads 0xFF, which decodes to best level 0, so a fresh chip
//! needs no initialisation. The store does not compare scores; the state
//! machine only calls [`save`] for a new best.

use log::info;

use crate::board::Eeprom;

const BEST_LEVEL_ADDR: u16 = 0;
const SEED_ADDR: u16 = 1;
/// Value of an erased EEPROM cell
pub const ERASED: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistentRecord {
    pub best_level: u8,
    pub seed: u16,
}

pub fn load<E: Eeprom>(eeprom: &mut E) -> PersistentRecord {
    PersistentRecord {
        best_level: !eeprom.read_byte(BEST_LEVEL_ADDR),
        seed: eeprom.read_word(SEED_ADDR),
    }
}

/// Read only the best level (the seed cells are left untouched).
pub fn load_best_level<E: Eeprom>(eeprom: &mut E) -> u8 {
    !eeprom.read_byte(BEST_LEVEL_ADDR)
}

pub fn save<E: Eeprom>(eeprom: &mut E, level: u8, seed: u16) {
    info!("store: new best level {} (seed {:#06x})", level, seed);
    eeprom.write_byte(BEST_LEVEL_ADDR, !level);
    eeprom.write_word(SEED_ADDR, seed);
}

/// Forget the best level. The seed cells keep their old contents.
pub fn erase<E: Eeprom>(eeprom: &mut E) {
    info!("store: best level erased");
    eeprom.write_byte(BEST_LEVEL_ADDR, ERASED);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::EepromMem;

    #[test]
    fn test_fresh_chip_has_no_best() {
        let mut mem = EepromMem::new();
        assert_eq!(load(&mut mem).best_level, 0);
    }

    #[test]
    fn test_save_then_load() {
        let mut mem = EepromMem::new();
        save(&mut mem, 5, 0x1234);
        assert_eq!(load(&mut mem), PersistentRecord { best_level: 5, seed: 0x1234 });
        assert_eq!(mem.bytes()[..3], [0xFA, 0x34, 0x12]);
    }

    #[test]
    fn test_save_does_not_compare() {
        let mut mem = EepromMem::new();
        save(&mut mem, 7, 1);
        save(&mut mem, 3, 2);
        assert_eq!(load(&mut mem).best_level, 3);
    }

    #[test]
    fn test_erase_keeps_seed() {
        let mut mem = EepromMem::new();
        save(&mut mem, 9, 0xCAFE);
        erase(&mut mem);
        let rec = load(&mut mem);
        assert_eq!(rec.best_level, 0);
        assert_eq!(rec.seed, 0xCAFE);
        assert_eq!(load_best_level(&mut mem), 0);
    }
}
