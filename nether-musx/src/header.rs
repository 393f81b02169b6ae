//! MUSX file header

use crate::{MUSX_MAGIC, MUSX_VERSION, MusxError};

const FLAG_GROUPED: u8 = 0x01;

/// Fixed 10-byte MUSX header
///
/// The two budget fields let a decoder refuse a stream before touching the
/// bitstream: `decoder_words` is the scratch needed for every table with its
/// prefix lookup, `max_simultaneous_notes` the note arena size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusxHeader {
    /// Events are batched into same-tick groups
    pub grouped: bool,
    pub max_simultaneous_notes: u8,
    /// Highest per-channel held count that has a release-distance table
    pub release_tables: u8,
    pub decoder_words: u16,
}

impl MusxHeader {
    /// Header size in bytes
    pub const SIZE: usize = 10;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(MUSX_MAGIC);
        bytes[4] = MUSX_VERSION;
        bytes[5] = if self.grouped { FLAG_GROUPED } else { 0 };
        bytes[6] = self.max_simultaneous_notes;
        bytes[7] = self.release_tables;
        bytes[8..10].copy_from_slice(&self.decoder_words.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MusxError> {
        if bytes.len() < Self::SIZE {
            return Err(MusxError::TooSmall);
        }
        if &bytes[0..4] != MUSX_MAGIC {
            return Err(MusxError::InvalidMagic);
        }
        if bytes[4] != MUSX_VERSION {
            return Err(MusxError::UnsupportedVersion(bytes[4]));
        }
        Ok(Self {
            grouped: bytes[5] & FLAG_GROUPED != 0,
            max_simultaneous_notes: bytes[6],
            release_tables: bytes[7],
            decoder_words: u16::from_le_bytes([bytes[8], bytes[9]]),
        })
    }
}
