//! musx-export library
//!
//! Conversion functions behind the `musx-export` binary: MUS lumps to MUSX
//! streams, raw resources to Huffman blocks, and the `musx.toml` build.

pub mod blob;
pub mod manifest;
pub mod music;

/// Extension for encoded music streams
pub const MUSX_EXT: &str = "musx";

/// Extension for Huffman-coded resource blobs
pub const BLOB_EXT: &str = "huff";
