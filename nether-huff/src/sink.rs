//! Two-pass symbol sinks
//!
//! Encoders walk their data twice through the same code path: once to count
//! symbols, once to write them. A sink is the per-stream endpoint of that walk.

use crate::{
    BitWriter, CodeBook, CodeLengths, HuffError, MAX_CODE_LENGTH, SymbolStatistics, TableEncoding,
    build_code_lengths, scratch_words_for, write_table,
};

/// Per-stream endpoint of a two-pass encoder
pub trait SymbolSink {
    /// Pass 1: record one occurrence of `symbol`
    fn observe(&mut self, symbol: u16);

    /// Freeze statistics and prepare codes for pass 2
    fn begin_output(&mut self) -> Result<(), HuffError>;

    /// Pass 2: write the code for `symbol`, returning its bit length
    fn write(&mut self, symbol: u16, writer: &mut BitWriter) -> Result<u8, HuffError>;
}

/// Statistics, code table and codebook for one symbol stream
#[derive(Debug, Clone)]
pub struct HuffmanSink {
    name: &'static str,
    max_code_length: u8,
    stats: SymbolStatistics,
    lengths: Option<CodeLengths>,
    book: Option<CodeBook>,
    payload_bits: usize,
}

impl HuffmanSink {
    pub fn new(name: &'static str) -> Self {
        Self::with_max_code_length(name, MAX_CODE_LENGTH)
    }

    pub fn with_max_code_length(name: &'static str, max_code_length: u8) -> Self {
        Self {
            name,
            max_code_length,
            stats: SymbolStatistics::new(),
            lengths: None,
            book: None,
            payload_bits: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> &SymbolStatistics {
        &self.stats
    }

    /// Code lengths, once [`begin_output`](SymbolSink::begin_output) has run
    pub fn lengths(&self) -> Option<&CodeLengths> {
        self.lengths.as_ref()
    }

    /// Bits written through [`write`](SymbolSink::write) so far
    pub fn payload_bits(&self) -> usize {
        self.payload_bits
    }

    /// Decoder scratch words this stream's table needs
    pub fn scratch_words(&self) -> usize {
        self.lengths.as_ref().map_or(0, scratch_words_for)
    }

    /// Serialize the table, returning the bits it took
    pub fn write_table(
        &self,
        encoding: TableEncoding,
        writer: &mut BitWriter,
    ) -> Result<usize, HuffError> {
        let lengths = self.lengths.as_ref().ok_or(HuffError::SinkNotReady(self.name))?;
        let start = writer.bit_len();
        write_table(lengths, encoding, writer)?;
        Ok(writer.bit_len() - start)
    }
}

impl SymbolSink for HuffmanSink {
    #[inline]
    fn observe(&mut self, symbol: u16) {
        self.stats.observe(symbol);
    }

    fn begin_output(&mut self) -> Result<(), HuffError> {
        let lengths = build_code_lengths(&self.stats, self.max_code_length)?;
        tracing::debug!(
            stream = self.name,
            symbols = lengths.len(),
            observed = self.stats.total(),
            max_length = lengths.max_length(),
            "stream table ready"
        );
        self.book = Some(CodeBook::new(&lengths));
        self.lengths = Some(lengths);
        self.payload_bits = 0;
        Ok(())
    }

    fn write(&mut self, symbol: u16, writer: &mut BitWriter) -> Result<u8, HuffError> {
        let book = self.book.as_ref().ok_or(HuffError::SinkNotReady(self.name))?;
        let bits = book.write(symbol, writer)?;
        self.payload_bits += bits as usize;
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_before_output_fails() {
        let mut sink = HuffmanSink::new("gap");
        sink.observe(4);
        let mut writer = BitWriter::new();
        assert_eq!(sink.write(4, &mut writer), Err(HuffError::SinkNotReady("gap")));
    }

    #[test]
    fn test_two_passes() {
        let data = [1u16, 1, 1, 1, 1, 2, 2, 3, 4];
        let mut sink = HuffmanSink::new("test");
        for &symbol in &data {
            sink.observe(symbol);
        }
        sink.begin_output().unwrap();

        let mut writer = BitWriter::new();
        for &symbol in &data {
            sink.write(symbol, &mut writer).unwrap();
        }
        // 5 * 1 + 2 * 2 + 3 + 3
        assert_eq!(sink.payload_bits(), 15);
        assert_eq!(writer.bit_len(), 15);
        assert_eq!(sink.scratch_words(), 4 + crate::PREFIX_TABLE_WORDS);
    }

    #[test]
    fn test_unseen_symbol_rejected() {
        let mut sink = HuffmanSink::new("test");
        sink.observe(1);
        sink.observe(2);
        sink.begin_output().unwrap();
        let mut writer = BitWriter::new();
        assert_eq!(sink.write(9, &mut writer), Err(HuffError::UnknownSymbol(9)));
    }

    #[test]
    fn test_respects_length_limit() {
        let mut sink = HuffmanSink::with_max_code_length("limited", 3);
        let mut weight = 1;
        for symbol in 0..8 {
            sink.stats.observe_n(symbol, weight);
            weight *= 3;
        }
        sink.begin_output().unwrap();
        assert_eq!(sink.lengths().map(|l| l.max_length()), Some(3));
    }
}
