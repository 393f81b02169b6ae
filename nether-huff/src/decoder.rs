//! Symbol decoding
//!
//! Two equivalent paths over the same [`CanonicalTable`]: a bit-at-a-time walk
//! up the ceiling array, and a prefix lookup that resolves codes of up to
//! [`PREFIX_BITS`] bits from a single peeked byte.

use crate::bits::REVERSE_BYTE;
use crate::{BitReader, CanonicalTable, DecoderScratch, HuffError, PREFIX_BITS};

impl CanonicalTable {
    /// Decode one symbol, using the prefix table when one is attached
    #[inline]
    pub fn decode(&self, scratch: &DecoderScratch, reader: &mut BitReader) -> Result<u16, HuffError> {
        if self.prefix_at.is_some() {
            self.decode_prefixed(scratch, reader)
        } else {
            self.decode_bitwise(scratch, reader)
        }
    }

    /// Decode one symbol reading a bit at a time
    pub fn decode_bitwise(
        &self,
        scratch: &DecoderScratch,
        reader: &mut BitReader,
    ) -> Result<u16, HuffError> {
        if let Some(result) = self.degenerate(scratch) {
            return result;
        }

        let start = reader.bit_position();
        let mut code = 0u32;
        for length in 1..=self.max_length {
            code = (code << 1) | reader.read_bit()?;
            if code < self.ceiling[length as usize] {
                return self
                    .lookup(scratch, code, length)
                    .ok_or(HuffError::InvalidCode { position: start });
            }
        }
        Err(HuffError::InvalidCode { position: start })
    }

    /// Decode one symbol through the 8-bit prefix table
    ///
    /// Falls back to [`decode_bitwise`](Self::decode_bitwise) when the table
    /// was loaded without a prefix table.
    pub fn decode_prefixed(
        &self,
        scratch: &DecoderScratch,
        reader: &mut BitReader,
    ) -> Result<u16, HuffError> {
        if let Some(result) = self.degenerate(scratch) {
            return result;
        }
        let window = reader.peek_byte();
        let Some(matched) = self.prefix_length(scratch, window) else {
            return self.decode_bitwise(scratch, reader);
        };

        let start = reader.bit_position();
        let reversed = REVERSE_BYTE[window as usize] as u32;

        if matched != 0 {
            reader.skip(matched as usize)?;
            let code = reversed >> (PREFIX_BITS - matched);
            return self
                .lookup(scratch, code, matched)
                .ok_or(HuffError::InvalidCode { position: start });
        }

        // No code of 8 bits or less matches
        if self.max_length <= PREFIX_BITS {
            reader.skip(self.max_length as usize)?;
            return Err(HuffError::InvalidCode { position: start });
        }

        reader.skip(PREFIX_BITS as usize)?;
        let mut code = reversed;
        for length in PREFIX_BITS + 1..=self.max_length {
            code = (code << 1) | reader.read_bit()?;
            if code < self.ceiling[length as usize] {
                return self
                    .lookup(scratch, code, length)
                    .ok_or(HuffError::InvalidCode { position: start });
            }
        }
        Err(HuffError::InvalidCode { position: start })
    }

    /// Result for 0- and 1-symbol tables, which read no bits
    #[inline]
    fn degenerate(&self, scratch: &DecoderScratch) -> Option<Result<u16, HuffError>> {
        match self.symbol_count {
            0 => Some(Err(HuffError::EmptyTable)),
            1 => Some(Ok(self.symbols(scratch)[0])),
            _ => None,
        }
    }
}
