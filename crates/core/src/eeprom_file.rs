//! EEPROM image files.
//!
//! Host runners keep the chip's EEPROM in a file between runs, so the best
//! score survives restarting the program the way it survives a power cycle.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "SMEP"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Payload          |  bincode-encoded EepromImage
//! +------------------+
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::peripherals::EepromMem;
use crate::EEPROM_SIZE;

/// Magic bytes identifying an EEPROM image file.
const MAGIC: &[u8; 4] = b"SMEP";
/// Current image format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not an EEPROM image (bad magic)")]
    BadMagic,
    #[error("unsupported image version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("image holds {0} bytes, expected {}", EEPROM_SIZE)]
    Size(usize),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Serialize, Deserialize)]
pub struct EepromImage {
    pub bytes: Vec<u8>,
}

/// Encode an EEPROM with header.
pub fn encode(eeprom: &EepromMem) -> Result<Vec<u8>, ImageError> {
    let payload = bincode::serialize(&EepromImage { bytes: eeprom.bytes().to_vec() })?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode an image, verifying magic, version and size.
pub fn decode(data: &[u8]) -> Result<EepromMem, ImageError> {
    if data.len() < HEADER_LEN || &data[0..4] != MAGIC {
        return Err(ImageError::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(ImageError::Version { found: version, expected: FORMAT_VERSION });
    }
    let image: EepromImage = bincode::deserialize(&data[HEADER_LEN..])?;
    if image.bytes.len() != EEPROM_SIZE {
        return Err(ImageError::Size(image.bytes.len()));
    }
    Ok(EepromMem::from_bytes(&image.bytes))
}

/// Write the image next to `path`, then rename it over `path`, so an
/// interrupted save leaves the previous image intact.
pub fn save_to_file(eeprom: &EepromMem, path: &Path) -> Result<(), ImageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, encode(eeprom)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<EepromMem, ImageError> {
    decode(&std::fs::read(path)?)
}

/// Load `path`, or start from an erased chip when the file does not exist yet.
pub fn load_or_erased(path: &Path) -> Result<EepromMem, ImageError> {
    match load_from_file(path) {
        Err(ImageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(EepromMem::new()),
        other => other,
    }
}
