//! Huffman-coded resource blobs
//!
//! ```text
//! 0x00: symbol count u32 LE
//! 0x04: nether-huff block (table, then codes)
//! ```

use anyhow::{Context, Result};
use nether_huff::{TableEncoding, decode_block, encode_block};
use std::path::Path;

/// Bytes before the block
pub const BLOB_HEADER_SIZE: usize = 4;

/// Encode `data` byte-per-symbol into a blob
pub fn encode_blob(data: &[u8], encoding: TableEncoding) -> Result<Vec<u8>> {
    let count = u32::try_from(data.len())
        .with_context(|| format!("Blob too large: {} bytes", data.len()))?;
    let symbols: Vec<u16> = data.iter().map(|&b| b as u16).collect();
    let block = encode_block(&symbols, encoding).context("Failed to encode blob")?;

    tracing::debug!(
        input = data.len(),
        table_bits = block.table_bits,
        payload_bits = block.payload_bits,
        encoding = block.encoding.map_or("degenerate", TableEncoding::name),
        "encoded blob"
    );

    let mut out = Vec::with_capacity(BLOB_HEADER_SIZE + block.bytes.len());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&block.bytes);
    Ok(out)
}

/// Decode a blob written by [`encode_blob`]
pub fn decode_blob(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < BLOB_HEADER_SIZE {
        anyhow::bail!("Blob too small: {} bytes", bytes.len());
    }
    let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let symbols = decode_block(&bytes[BLOB_HEADER_SIZE..], count).context("Failed to decode blob")?;
    symbols
        .into_iter()
        .map(|s| u8::try_from(s).with_context(|| format!("Blob symbol {s} is not a byte")))
        .collect()
}

/// Convert a raw file to a blob
pub fn convert_blob(input: &Path, output: &Path, encoding: TableEncoding) -> Result<usize> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let blob = encode_blob(&data, encoding)?;
    std::fs::write(output, &blob).with_context(|| format!("Failed to write {:?}", output))?;
    tracing::info!("{} bytes -> {} bytes", data.len(), blob.len());
    Ok(blob.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_roundtrip() {
        let data = b"nethercore nethercore nethercore, the fantasy console".to_vec();
        for encoding in [TableEncoding::Auto, TableEncoding::Flat, TableEncoding::Sentinel] {
            let blob = encode_blob(&data, encoding).unwrap();
            assert_eq!(decode_blob(&blob).unwrap(), data);
        }
    }

    #[test]
    fn test_blob_compresses_repetition() {
        let data = vec![7u8; 4096];
        let blob = encode_blob(&data, TableEncoding::Auto).unwrap();
        // Single-symbol table: header, table, no codes
        assert!(blob.len() < 8);
        assert_eq!(decode_blob(&blob).unwrap(), data);
    }

    #[test]
    fn test_empty_blob() {
        let blob = encode_blob(&[], TableEncoding::Auto).unwrap();
        assert_eq!(&blob[..4], &[0, 0, 0, 0]);
        assert!(decode_blob(&blob).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(decode_blob(&[1, 0]).is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_count() {
        let mut blob = encode_blob(b"abcabcabd", TableEncoding::Auto).unwrap();
        blob[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = decode_blob(&blob).unwrap_err();
        assert!(format!("{err:#}").contains("payload bits"));
    }
}
