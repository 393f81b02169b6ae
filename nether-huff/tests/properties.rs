//! Property-based tests for the Huffman codec
//!
//! ```bash
//! cargo test -p nether-huff --test properties
//! ```

use proptest::prelude::*;

use nether_huff::{
    BitReader, BitWriter, CanonicalTable, CodeBook, DecoderScratch, MAX_CODE_LENGTH,
    SymbolStatistics, TableEncoding, build_code_lengths, decode_block, encode_block, read_table,
    scratch_words_for, serialize_table,
};

// ============================================================================
// Strategies
// ============================================================================

fn narrow_symbols() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(0u16..48, 0..400)
}

fn wide_symbols() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(any::<u16>(), 0..120)
}

/// Skewed `(symbol, count)` pairs; up to 40 distinct symbols
fn weighted_alphabet() -> impl Strategy<Value = Vec<(u16, u32)>> {
    prop::collection::vec((0u16..300, 1u32..5000), 2..40)
}

fn encodings() -> impl Strategy<Value = TableEncoding> {
    prop_oneof![
        Just(TableEncoding::Auto),
        Just(TableEncoding::Grouped),
        Just(TableEncoding::Flat),
        Just(TableEncoding::Sentinel),
    ]
}

// ============================================================================
// 1. Round trip
// ============================================================================

proptest! {
    #[test]
    fn block_roundtrip_narrow(symbols in narrow_symbols(), encoding in encodings()) {
        let block = encode_block(&symbols, encoding).unwrap();
        prop_assert_eq!(decode_block(&block.bytes, symbols.len()).unwrap(), symbols);
    }

    #[test]
    fn block_roundtrip_wide(symbols in wide_symbols(), encoding in encodings()) {
        let block = encode_block(&symbols, encoding).unwrap();
        prop_assert_eq!(decode_block(&block.bytes, symbols.len()).unwrap(), symbols);
    }

    #[test]
    fn every_variant_reads_back_identically(pairs in weighted_alphabet()) {
        let lengths = build_code_lengths(&SymbolStatistics::from_counts(pairs), MAX_CODE_LENGTH).unwrap();
        prop_assume!(lengths.len() >= 2);
        for encoding in TableEncoding::VARIANTS {
            let table = serialize_table(&lengths, encoding).unwrap();
            prop_assert_eq!(table.encoding, Some(encoding));
            prop_assert_eq!(table.lengths().unwrap(), lengths.clone());
        }
    }

    #[test]
    fn auto_is_smallest(pairs in weighted_alphabet()) {
        let lengths = build_code_lengths(&SymbolStatistics::from_counts(pairs), MAX_CODE_LENGTH).unwrap();
        let auto = serialize_table(&lengths, TableEncoding::Auto).unwrap();
        for encoding in TableEncoding::VARIANTS {
            let forced = serialize_table(&lengths, encoding).unwrap();
            prop_assert!(auto.header_bits <= forced.header_bits);
        }
    }
}

// ============================================================================
// 2. Length limit and Kraft equality
// ============================================================================

proptest! {
    #[test]
    fn lengths_respect_limit_and_fill_code_space(
        pairs in weighted_alphabet(),
        limit in 6u8..=MAX_CODE_LENGTH,
    ) {
        let stats = SymbolStatistics::from_counts(pairs);
        let lengths = build_code_lengths(&stats, limit).unwrap();
        prop_assert_eq!(lengths.len(), stats.len());
        prop_assert!(lengths.max_length() <= limit);
        if lengths.len() >= 2 {
            prop_assert!(lengths.is_complete(), "kraft sum {}", lengths.kraft_sum());
        }
    }

    #[test]
    fn exponential_weights_are_limited(n in 17usize..40, limit in 6u8..=MAX_CODE_LENGTH) {
        // Fibonacci-like weights force depths far past the limit
        let mut weights = vec![1u32, 1];
        while weights.len() < n {
            let next = weights[weights.len() - 1].saturating_add(weights[weights.len() - 2]);
            weights.push(next);
        }
        let stats = SymbolStatistics::from_counts(weights.into_iter().enumerate().map(|(s, w)| (s as u16, w)));
        let lengths = build_code_lengths(&stats, limit).unwrap();
        prop_assert!(lengths.max_length() <= limit);
        prop_assert!(lengths.is_complete());
    }
}

// ============================================================================
// 3. Canonical determinism
// ============================================================================

proptest! {
    #[test]
    fn serialized_lengths_give_identical_codes(pairs in weighted_alphabet()) {
        let lengths = build_code_lengths(&SymbolStatistics::from_counts(pairs), MAX_CODE_LENGTH).unwrap();
        let table = serialize_table(&lengths, TableEncoding::Auto).unwrap();
        let reread = read_table(&mut BitReader::new(&table.bytes)).unwrap();

        let a = CodeBook::new(&lengths);
        let b = CodeBook::new(&reread);
        for (symbol, _) in lengths.iter() {
            prop_assert_eq!(a.code(symbol), b.code(symbol));
        }
    }
}

// ============================================================================
// 4. Fast path equivalence
// ============================================================================

proptest! {
    #[test]
    fn prefix_and_bitwise_agree(
        pairs in weighted_alphabet(),
        bytes in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let lengths = build_code_lengths(&SymbolStatistics::from_counts(pairs), MAX_CODE_LENGTH).unwrap();
        // One-symbol tables never consume input
        prop_assume!(lengths.len() >= 2);
        let mut scratch = DecoderScratch::new(scratch_words_for(&lengths));
        let table = CanonicalTable::build(&lengths, &mut scratch, true).unwrap();

        let mut fast = BitReader::new(&bytes);
        let mut slow = BitReader::new(&bytes);
        loop {
            let a = table.decode_prefixed(&scratch, &mut fast);
            let b = table.decode_bitwise(&scratch, &mut slow);
            match (a, b) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(a, b);
                    prop_assert_eq!(fast.bit_position(), slow.bit_position());
                }
                (Err(_), Err(_)) => break,
                (a, b) => prop_assert!(false, "paths disagree: {:?} vs {:?}", a, b),
            }
        }
    }
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn abcd_example() {
    let stats = SymbolStatistics::from_counts([(b'A' as u16, 5), (b'B' as u16, 2), (b'C' as u16, 1), (b'D' as u16, 1)]);
    let lengths = build_code_lengths(&stats, MAX_CODE_LENGTH).unwrap();
    let book = CodeBook::new(&lengths);
    assert_eq!(book.code(b'A' as u16), Some((0b0, 1)));
    assert_eq!(book.code(b'B' as u16), Some((0b10, 2)));
    assert_eq!(book.code(b'C' as u16), Some((0b110, 3)));
    assert_eq!(book.code(b'D' as u16), Some((0b111, 3)));

    let message: Vec<u16> = b"ABCAD".iter().map(|&b| b as u16).collect();
    let mut writer = BitWriter::new();
    for &symbol in &message {
        book.write(symbol, &mut writer).unwrap();
    }

    let mut scratch = DecoderScratch::new(scratch_words_for(&lengths));
    let table = CanonicalTable::build(&lengths, &mut scratch, true).unwrap();
    let mut reader = BitReader::with_bit_len(writer.as_bytes(), writer.bit_len());
    let decoded: Vec<u16> = message
        .iter()
        .map(|_| table.decode(&scratch, &mut reader).unwrap())
        .collect();
    assert_eq!(decoded, message);
}

#[test]
fn single_symbol_decodes_forever() {
    let stats = SymbolStatistics::from_counts([(b'X' as u16, 7)]);
    let lengths = build_code_lengths(&stats, MAX_CODE_LENGTH).unwrap();
    assert!(lengths.is_degenerate());

    let serialized = serialize_table(&lengths, TableEncoding::Auto).unwrap();
    assert_eq!(serialized.len(), 2);

    let mut scratch = DecoderScratch::new(1);
    let mut reader = BitReader::new(&serialized.bytes);
    let table = nether_huff::load_table(&mut reader, &mut scratch, true).unwrap();
    let position = reader.bit_position();
    for _ in 0..1000 {
        assert_eq!(table.decode(&scratch, &mut reader), Ok(b'X' as u16));
    }
    assert_eq!(reader.bit_position(), position);
}
