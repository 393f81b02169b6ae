//! Self-contained blocks: one table followed by the codes it describes
//!
//! Used for single-stream resources where the symbol count is known from the
//! surrounding container. The codes start at the bit right after the table
//! and the block is padded to a byte.

use crate::{
    BitReader, BitWriter, DecoderScratch, HuffError, HuffmanSink, SymbolSink, TableEncoding,
    load_table, read_table, scratch_words_for,
};

/// An encoded block and its size breakdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    pub bytes: Vec<u8>,
    pub table_bits: usize,
    pub payload_bits: usize,
    /// Table encoding used (`None` for 0/1-symbol alphabets)
    pub encoding: Option<TableEncoding>,
    /// Decoder scratch words required by [`decode_block_into`]
    pub scratch_words: usize,
}

/// Huffman-code `symbols` into a table plus payload
pub fn encode_block(symbols: &[u16], encoding: TableEncoding) -> Result<EncodedBlock, HuffError> {
    let mut sink = HuffmanSink::new("block");
    for &symbol in symbols {
        sink.observe(symbol);
    }
    sink.begin_output()?;

    let mut writer = BitWriter::with_capacity(symbols.len() / 2 + 16);
    let lengths = sink.lengths().ok_or(HuffError::SinkNotReady("block"))?;
    let used = crate::write_table(lengths, encoding, &mut writer)?;
    let table_bits = writer.bit_len();

    for &symbol in symbols {
        sink.write(symbol, &mut writer)?;
    }
    let payload_bits = sink.payload_bits();
    writer.pad_to_byte();

    tracing::debug!(
        symbols = symbols.len(),
        table_bits,
        payload_bits,
        "encoded block"
    );
    Ok(EncodedBlock {
        bytes: writer.into_bytes(),
        table_bits,
        payload_bits,
        encoding: used,
        scratch_words: sink.scratch_words(),
    })
}

/// Decode `out.len()` symbols without allocating, using `scratch` for the table
///
/// `scratch` is reset first. Returns the number of bits consumed.
pub fn decode_block_into(
    bytes: &[u8],
    scratch: &mut DecoderScratch,
    out: &mut [u16],
) -> Result<usize, HuffError> {
    scratch.reset();
    let mut reader = BitReader::new(bytes);
    let table = load_table(&mut reader, scratch, true)?;
    for slot in out.iter_mut() {
        *slot = table.decode(scratch, &mut reader)?;
    }
    Ok(reader.bit_position())
}

/// Decode `count` symbols from a block
pub fn decode_block(bytes: &[u8], count: usize) -> Result<Vec<u16>, HuffError> {
    let mut reader = BitReader::new(bytes);
    let lengths = read_table(&mut reader)?;
    let available_bits = (bytes.len() * 8).saturating_sub(reader.bit_position());
    let min_length = lengths.min_length() as usize;
    if min_length > 0 && count.saturating_mul(min_length) > available_bits {
        return Err(HuffError::CountExceedsPayload {
            count,
            available_bits,
        });
    }
    let mut scratch = DecoderScratch::new(scratch_words_for(&lengths));
    let mut out = vec![0u16; count];
    decode_block_into(bytes, &mut scratch, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Vec<u16> {
        s.bytes().map(u16::from).collect()
    }

    #[test]
    fn test_block_roundtrip() {
        let symbols = text("the quick brown fox jumps over the lazy dog");
        let block = encode_block(&symbols, TableEncoding::Auto).unwrap();
        assert_eq!(block.bytes.len(), (block.table_bits + block.payload_bits).div_ceil(8));
        assert_eq!(decode_block(&block.bytes, symbols.len()).unwrap(), symbols);
    }

    #[test]
    fn test_forced_encodings_roundtrip() {
        let symbols = text("abracadabra alakazam");
        for encoding in TableEncoding::VARIANTS {
            let block = encode_block(&symbols, encoding).unwrap();
            assert_eq!(block.encoding, Some(encoding));
            assert_eq!(decode_block(&block.bytes, symbols.len()).unwrap(), symbols);
        }
    }

    #[test]
    fn test_single_symbol_block() {
        let symbols = vec![b'X' as u16; 7];
        let block = encode_block(&symbols, TableEncoding::Auto).unwrap();
        assert_eq!(block.bytes.len(), 2);
        assert_eq!(block.payload_bits, 0);
        assert_eq!(decode_block(&block.bytes, 100).unwrap(), vec![b'X' as u16; 100]);
    }

    #[test]
    fn test_empty_block() {
        let block = encode_block(&[], TableEncoding::Auto).unwrap();
        assert_eq!(block.bytes, vec![0]);
        assert_eq!(decode_block(&block.bytes, 0).unwrap(), Vec::<u16>::new());
        assert_eq!(decode_block(&block.bytes, 1), Err(HuffError::EmptyTable));
    }

    #[test]
    fn test_decode_into_reuses_scratch() {
        let symbols = text("mississippi");
        let block = encode_block(&symbols, TableEncoding::Auto).unwrap();

        let mut scratch = DecoderScratch::new(block.scratch_words);
        let mut out = vec![0u16; symbols.len()];
        for _ in 0..3 {
            let bits = decode_block_into(&block.bytes, &mut scratch, &mut out).unwrap();
            assert_eq!(bits, block.table_bits + block.payload_bits);
            assert_eq!(out, symbols);
        }
    }

    #[test]
    fn test_scratch_too_small() {
        let symbols = text("mississippi");
        let block = encode_block(&symbols, TableEncoding::Auto).unwrap();
        let mut scratch = DecoderScratch::new(block.scratch_words - 1);
        let mut out = vec![0u16; symbols.len()];
        assert!(matches!(
            decode_block_into(&block.bytes, &mut scratch, &mut out),
            Err(HuffError::ScratchExhausted { .. })
        ));
    }

    #[test]
    fn test_truncated_block() {
        let symbols = text("mississippi");
        let block = encode_block(&symbols, TableEncoding::Auto).unwrap();
        let cut = &block.bytes[..block.bytes.len() - 1];
        assert!(decode_block(cut, symbols.len()).is_err());
    }

    #[test]
    fn test_count_larger_than_payload() {
        let symbols = text("mississippi");
        let block = encode_block(&symbols, TableEncoding::Auto).unwrap();
        let available_bits = block.bytes.len() * 8 - block.table_bits;
        assert_eq!(
            decode_block(&block.bytes, usize::MAX),
            Err(HuffError::CountExceedsPayload {
                count: usize::MAX,
                available_bits,
            })
        );
    }
}
