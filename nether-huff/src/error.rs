//! Error types for Huffman table construction and decoding

/// Errors raised by the codec
///
/// Encoder-side variants (`CodeTooLong`, `AlphabetTooLarge`, `KraftViolation`,
/// `UnknownSymbol`) are build-time failures. Decoder-side variants mean the
/// stream is truncated or was not produced by this encoder; none of them are
/// recoverable mid-stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HuffError {
    /// Attempted to read past the end of the bit buffer
    #[error("bitstream exhausted at bit {position}")]
    BitstreamExhausted { position: usize },

    /// A code length outside 1..=15 (or above the configured limit)
    #[error("code length {length} for symbol {symbol} exceeds maximum {max}")]
    CodeTooLong { symbol: u16, length: u8, max: u8 },

    /// More symbols than the code space can hold at the length limit
    #[error("{symbols} symbols cannot be coded within {max_length} bits")]
    AlphabetTooLarge { symbols: usize, max_length: u8 },

    /// Code lengths over-subscribe the code space
    #[error("code lengths violate Kraft's inequality")]
    KraftViolation,

    /// Same symbol given two code lengths
    #[error("symbol {0} appears more than once")]
    DuplicateSymbol(u16),

    /// Decode was called on a table with no symbols
    #[error("decode called on an empty table")]
    EmptyTable,

    /// No code matched before the table's maximum length
    #[error("no code matched at bit {position}")]
    InvalidCode { position: usize },

    /// Unknown table encoding tag or malformed table header
    #[error("invalid table encoding tag {0}")]
    InvalidTableEncoding(u8),

    /// Symbol value outside the range a table header can describe
    #[error("symbol {0} out of range")]
    SymbolOutOfRange(u32),

    /// Decoder scratch budget too small for the tables being loaded
    #[error("decoder scratch exhausted: requested {requested} words, {available} available")]
    ScratchExhausted { requested: usize, available: usize },

    /// Block header asks for more symbols than its payload can hold
    #[error("{count} symbols cannot fit in {available_bits} payload bits")]
    CountExceedsPayload { count: usize, available_bits: usize },

    /// Symbol written that has no code in the table
    #[error("symbol {0} has no code in this table")]
    UnknownSymbol(u16),

    /// Sink used for output before its table was built
    #[error("symbol sink '{0}' written before begin_output")]
    SinkNotReady(&'static str),
}
