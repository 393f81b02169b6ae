//! Encoder and decoder configuration

use nether_huff::{MAX_CODE_LENGTH, TableEncoding};

use crate::{DEFAULT_MAX_DECODER_WORDS, DEFAULT_MAX_SIMULTANEOUS_NOTES, MAX_NOTE_ARENA, MusxError};

/// Event layout selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutChoice {
    /// Encode both layouts and keep the smaller
    #[default]
    Auto,
    /// Gap after every event
    Sequential,
    /// Same-tick runs prefixed by a group size, gap after the run
    Grouped,
}

impl core::str::FromStr for LayoutChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "sequential" => Ok(Self::Sequential),
            "grouped" => Ok(Self::Grouped),
            other => Err(format!(
                "unknown layout '{other}' (use auto, sequential or grouped)"
            )),
        }
    }
}

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Code length ceiling for every stream table (1..=15)
    pub max_code_length: u8,
    /// Scratch budget the target decoder will allocate
    pub max_decoder_words: usize,
    /// Note arena size the target decoder will allocate
    pub max_simultaneous_notes: usize,
    pub layout: LayoutChoice,
    pub table_encoding: TableEncoding,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_code_length: MAX_CODE_LENGTH,
            max_decoder_words: DEFAULT_MAX_DECODER_WORDS,
            max_simultaneous_notes: DEFAULT_MAX_SIMULTANEOUS_NOTES,
            layout: LayoutChoice::Auto,
            table_encoding: TableEncoding::Auto,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), MusxError> {
        if self.max_code_length == 0 || self.max_code_length > MAX_CODE_LENGTH {
            return Err(MusxError::InvalidConfig(format!(
                "max_code_length {} outside 1..={MAX_CODE_LENGTH}",
                self.max_code_length
            )));
        }
        validate_budgets(self.max_decoder_words, self.max_simultaneous_notes)
    }
}

/// Decoder resource limits, checked against the stream header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    pub max_decoder_words: usize,
    pub max_simultaneous_notes: usize,
    /// Build 8-bit prefix tables for the fast decode path
    pub prefix_tables: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_decoder_words: DEFAULT_MAX_DECODER_WORDS,
            max_simultaneous_notes: DEFAULT_MAX_SIMULTANEOUS_NOTES,
            prefix_tables: true,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), MusxError> {
        validate_budgets(self.max_decoder_words, self.max_simultaneous_notes)
    }
}

fn validate_budgets(decoder_words: usize, notes: usize) -> Result<(), MusxError> {
    if decoder_words > u16::MAX as usize {
        return Err(MusxError::InvalidConfig(format!(
            "max_decoder_words {decoder_words} exceeds {}",
            u16::MAX
        )));
    }
    if notes == 0 || notes > MAX_NOTE_ARENA {
        return Err(MusxError::InvalidConfig(format!(
            "max_simultaneous_notes {notes} outside 1..={MAX_NOTE_ARENA}"
        )));
    }
    Ok(())
}
