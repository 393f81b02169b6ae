//! Nether-MUSX: Huffman-coded music event streams for Nethercore
//!
//! MUSX stores a MUS-style event list (16 channels, press/release, pitch
//! wheel, controllers, system events) as several independently Huffman-coded
//! symbol streams sharing one bitstream. Each field kind gets its own table so
//! note numbers, volumes and gaps are coded against their own statistics.
//!
//! The decoder is a single forward pass that never allocates after
//! construction: tables live in a fixed scratch arena and active notes in a
//! fixed-capacity free list, which is what lets releases be coded by position
//! in the channel's press order rather than by pitch.
//!
//! # Stream Format
//!
//! ```text
//! 0x00: magic "MUSX"
//! 0x04: version u8 (1)
//! 0x05: flags u8 (bit 0 = grouped layout)
//! 0x06: max_simultaneous_notes u8
//! 0x07: release_tables u8
//! 0x08: decoder_words u16 LE
//! 0x0A: bitstream
//!       tables: channel-event, delta-volume, delta-pitch, delta-vibrato,
//!               melodic note, percussion note, press volume,
//!               group size (grouped only), release distance 2..=N, gap
//!       events, ending with score-end, padded to a byte
//! ```
//!
//! # Usage
//!
//! ```
//! use nether_musx::{DecoderConfig, EncoderConfig, MusCommand, MusEvent, MusxDecoder, encode};
//!
//! let commands = vec![
//!     MusCommand::new(0, MusEvent::PressKey { note: 60, volume: 100 }, 35),
//!     MusCommand::new(0, MusEvent::ReleaseKey { note: 60 }, 0),
//!     MusCommand::new(0, MusEvent::ScoreEnd, 0),
//! ];
//! let encoded = encode(&commands, &EncoderConfig::default()).unwrap();
//!
//! let mut decoder = MusxDecoder::new(&encoded.bytes, DecoderConfig::default()).unwrap();
//! assert_eq!(decoder.decode_all().unwrap(), commands);
//! ```

mod config;
mod decoder;
mod encoder;
mod error;
mod event;
mod header;
pub mod mus;
mod notes;
mod state;
mod stream;
mod zigzag;

pub use config::{DecoderConfig, EncoderConfig, LayoutChoice};
pub use decoder::MusxDecoder;
pub use encoder::{MusxEncoding, StreamReport, encode};
pub use error::MusxError;
pub use event::{EventKind, MusCommand, MusEvent, MusxEvent};
pub use header::MusxHeader;
pub use notes::NoteArena;
pub use stream::Stream;
pub use zigzag::{from_zig, to_zig};

// =============================================================================
// Constants
// =============================================================================

/// MUSX magic bytes
pub const MUSX_MAGIC: &[u8; 4] = b"MUSX";

/// Format version written and accepted
pub const MUSX_VERSION: u8 = 1;

/// MIDI-style channel count
pub const NUM_CHANNELS: usize = 16;

/// Channel whose presses use the percussion note table
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Default decoder scratch budget in 16-bit words
pub const DEFAULT_MAX_DECODER_WORDS: usize = 4096;

/// Default note arena capacity
pub const DEFAULT_MAX_SIMULTANEOUS_NOTES: usize = 32;

/// Largest note arena the 8-bit link fields can address
pub const MAX_NOTE_ARENA: usize = 255;

/// Gap symbol meaning "add 255 ticks and keep reading"
pub const GAP_ESCAPE: u16 = 255;

/// Most events in one group of the grouped layout
pub const MAX_GROUP_SIZE: usize = 256;

/// Controller coded as a volume delta
pub const CONTROLLER_VOLUME: u8 = 3;

/// Controller coded as a vibrato (modulation) delta
pub const CONTROLLER_VIBRATO: u8 = 2;

/// Press-volume symbol: same as the last press on any channel
pub const VOLUME_SAME_GLOBAL: u16 = 128;

/// Press-volume symbol: same as the last press on this channel
pub const VOLUME_SAME_CHANNEL: u16 = 129;
