//! MUSX error types

use nether_huff::HuffError;

/// MUSX encode/decode error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MusxError {
    /// Buffer shorter than the fixed header
    #[error("file too small to contain MUSX header")]
    TooSmall,

    /// Magic bytes are not "MUSX"
    #[error("invalid MUSX magic")]
    InvalidMagic,

    #[error("unsupported MUSX version: {0}")]
    UnsupportedVersion(u8),

    /// Channel number above 15
    #[error("invalid channel {0} (max 15)")]
    InvalidChannel(u8),

    /// More notes held at once than the arena can track
    #[error("note arena exhausted ({capacity} simultaneous notes)")]
    NoteArenaExhausted { capacity: usize },

    /// Release with no matching held note (`note` is unknown on decode)
    #[error("release on channel {channel} matches no held note ({note:?})")]
    UnmatchedRelease { channel: u8, note: Option<u8> },

    /// Command list does not end with a score-end event
    #[error("command list does not end with score-end")]
    MissingScoreEnd,

    /// Commands follow the score-end event
    #[error("command {index} follows score-end")]
    EventsAfterScoreEnd { index: usize },

    /// Tables need more decoder scratch than allowed
    #[error("decoder scratch budget exceeded: {required} words required, {budget} allowed")]
    DecoderBudgetExceeded { required: usize, budget: usize },

    /// More simultaneous notes than allowed
    #[error("note budget exceeded: {required} simultaneous notes, {budget} allowed")]
    NoteBudgetExceeded { required: usize, budget: usize },

    /// A field value that cannot be represented
    #[error("{field} value {value} out of range")]
    ValueOutOfRange { field: &'static str, value: u32 },

    /// Malformed MUS lump
    #[error("invalid MUS data: {0}")]
    InvalidMus(String),

    /// Rejected encoder or decoder configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bitstream or table failure from the entropy coder
    #[error(transparent)]
    Huff(#[from] HuffError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MusxError::TooSmall.to_string(), "file too small to contain MUSX header");
        assert_eq!(MusxError::UnsupportedVersion(3).to_string(), "unsupported MUSX version: 3");
        assert_eq!(
            MusxError::DecoderBudgetExceeded {
                required: 5000,
                budget: 4096
            }
            .to_string(),
            "decoder scratch budget exceeded: 5000 words required, 4096 allowed"
        );
        assert_eq!(
            MusxError::from(HuffError::EmptyTable).to_string(),
            "decode called on an empty table"
        );
    }
}
