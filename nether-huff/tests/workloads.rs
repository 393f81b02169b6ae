//! Deterministic pseudo-random workloads
//!
//! Seeded so failures reproduce; covers table loading into a shared scratch
//! arena, the layout the music decoder uses.

use nether_huff::{
    BitReader, BitWriter, CodeBook, DecoderScratch, HuffmanSink, SymbolSink, TableEncoding,
    load_table,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Geometric-ish symbol distribution over `0..alphabet`
fn skewed(rng: &mut Pcg32, alphabet: u16) -> u16 {
    let mut symbol = 0;
    while symbol + 1 < alphabet && rng.random_range(0..3) != 0 {
        symbol += 1;
    }
    symbol
}

#[test]
fn interleaved_streams_share_one_scratch() {
    let mut rng = Pcg32::seed_from_u64(0x5eed);
    let alphabets = [2u16, 9, 40, 130, 600];

    let streams: Vec<Vec<u16>> = alphabets
        .iter()
        .map(|&alphabet| (0..2000).map(|_| skewed(&mut rng, alphabet)).collect())
        .collect();

    let mut sinks: Vec<HuffmanSink> = alphabets.iter().map(|_| HuffmanSink::new("stream")).collect();
    for (sink, stream) in sinks.iter_mut().zip(&streams) {
        for &symbol in stream {
            sink.observe(symbol);
        }
        sink.begin_output().unwrap();
    }

    let mut writer = BitWriter::new();
    for sink in &sinks {
        sink.write_table(TableEncoding::Auto, &mut writer).unwrap();
    }
    for i in 0..2000 {
        for (sink, stream) in sinks.iter_mut().zip(&streams) {
            sink.write(stream[i], &mut writer).unwrap();
        }
    }
    writer.pad_to_byte();

    let words: usize = sinks.iter().map(HuffmanSink::scratch_words).sum();
    let mut scratch = DecoderScratch::new(words);
    let mut reader = BitReader::new(writer.as_bytes());
    let tables: Vec<_> = sinks
        .iter()
        .map(|_| load_table(&mut reader, &mut scratch, true).unwrap())
        .collect();
    assert_eq!(scratch.used(), words);

    for i in 0..2000 {
        for (table, stream) in tables.iter().zip(&streams) {
            assert_eq!(table.decode(&scratch, &mut reader).unwrap(), stream[i]);
        }
    }
}

#[test]
fn codebook_codes_are_prefix_free() {
    let mut rng = Pcg32::seed_from_u64(42);
    for _ in 0..50 {
        let mut sink = HuffmanSink::new("random");
        for _ in 0..rng.random_range(2..500) {
            let symbol = rng.random_range(0..200);
            sink.observe(symbol);
        }
        sink.begin_output().unwrap();
        let Some(lengths) = sink.lengths() else {
            panic!("lengths missing after begin_output");
        };
        let book = CodeBook::new(lengths);
        let codes: Vec<(u32, u8)> = lengths.iter().filter_map(|(s, _)| book.code(s)).collect();

        for (i, &(a, la)) in codes.iter().enumerate() {
            for &(b, lb) in &codes[i + 1..] {
                let (short, ls, long, ll) = if la <= lb { (a, la, b, lb) } else { (b, lb, a, la) };
                assert_ne!(long >> (ll - ls), short, "code {short:b} prefixes {long:b}");
            }
        }
    }
}
