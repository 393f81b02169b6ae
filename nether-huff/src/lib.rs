//! Nether-Huff: length-limited canonical Huffman codec for Nethercore
//!
//! A purpose-built entropy coder for the small, closed alphabets produced by
//! the asset pipeline (music event fields, column bytes, packed indices).
//! Tables are built once offline and decoded on the console runtime without
//! any allocation on the decode path.
//!
//! **This is a pure codec** - it handles statistics, code construction, table
//! serialization and symbol decoding. Container headers and symbol counts are
//! handled by the caller (for example `nether-musx`).
//!
//! # Pipeline
//!
//! ```text
//! encoder (offline)                         decoder (runtime)
//! ─────────────────                         ─────────────────
//! SymbolStatistics                          BitReader
//!      │ build_code_lengths()                    │ load_table()
//!      ▼                                         ▼
//! CodeLengths ──write_table()──► bytes ──► CanonicalTable (+ DecoderScratch)
//!      │ CodeBook::new()                         │ decode()
//!      ▼                                         ▼
//! BitWriter::write_code() ─────► bytes ──► symbols
//! ```
//!
//! # Table Format
//!
//! ```text
//! min_length: 4 bits
//! max_length: 4 bits
//! max_length == 0 (degenerate):
//!   min_length = 0: no symbols
//!   min_length = 1: one 8-bit symbol follows
//!   min_length = 2: one 16-bit symbol follows
//! otherwise:
//!   encoding: 2 bits (0 = grouped, 1 = flat, 2 = sentinel)
//!   wide: 1 bit (symbol fields are 16 bits instead of 8)
//!   first_symbol, symbol_span: 8 or 16 bits each
//!   length body for first_symbol..=first_symbol + symbol_span
//! ```
//!
//! Only code lengths are stored. Codes are canonical: sorted by
//! (length, symbol), starting at zero and incrementing, shifting left when the
//! length grows. Codes are written MSB-first into an LSB-first bit stream.
//!
//! # Usage
//!
//! ```
//! use nether_huff::{TableEncoding, decode_block, encode_block};
//!
//! let symbols: Vec<u16> = b"abracadabra".iter().map(|&b| b as u16).collect();
//! let block = encode_block(&symbols, TableEncoding::Auto).unwrap();
//! let decoded = decode_block(&block.bytes, symbols.len()).unwrap();
//! assert_eq!(decoded, symbols);
//! ```

mod bits;
mod block;
mod builder;
mod decoder;
mod error;
mod serialize;
mod sink;
mod stats;
mod table;

pub use bits::{BitReader, BitWriter, REVERSE_BYTE, reverse_bits};
pub use block::{EncodedBlock, decode_block, decode_block_into, encode_block};
pub use builder::{CodeBook, CodeLengths, build_code_lengths};
pub use error::HuffError;
pub use serialize::{SerializedTable, TableEncoding, load_table, read_table, serialize_table, write_table};
pub use sink::{HuffmanSink, SymbolSink};
pub use stats::SymbolStatistics;
pub use table::{CanonicalTable, DecoderScratch, scratch_words_for};

// =============================================================================
// Constants
// =============================================================================

/// Hard ceiling on code length (fits the 4-bit length fields)
pub const MAX_CODE_LENGTH: u8 = 15;

/// Bits examined by the prefix lookup fast path
pub const PREFIX_BITS: u8 = 8;

/// Scratch words used by one prefix table (256 one-byte entries, two per word)
pub const PREFIX_TABLE_WORDS: usize = 128;

/// Symbols per group in the grouped table encoding
pub const TABLE_GROUP_SIZE: usize = 8;
