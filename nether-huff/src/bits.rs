//! Bit-level reader and writer
//!
//! Bits are packed LSB-first: the first bit written lands in bit 0 of the
//! first byte. Multi-bit fields written with [`BitWriter::write`] keep their
//! natural value (bit 0 of the field is written first). Huffman codes are the
//! exception: they are emitted MSB-first through [`BitWriter::write_code`] so
//! the decoder can grow a code one bit at a time.

use crate::HuffError;

/// Byte bit-reversal table (`REVERSE_BYTE[0b0000_0001] == 0b1000_0000`)
pub const REVERSE_BYTE: [u8; 256] = build_reverse_table();

const fn build_reverse_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).reverse_bits();
        i += 1;
    }
    table
}

/// Reverse the low `width` bits of `value` (width ≤ 16)
#[inline]
pub fn reverse_bits(value: u32, width: u8) -> u32 {
    debug_assert!(width <= 16, "reverse width {width} > 16");
    if width == 0 {
        return 0;
    }
    let lo = REVERSE_BYTE[(value & 0xFF) as usize] as u32;
    let hi = REVERSE_BYTE[((value >> 8) & 0xFF) as usize] as u32;
    ((lo << 8) | hi) >> (16 - width as u32)
}

// =============================================================================
// Writer
// =============================================================================

/// Growable LSB-first bit writer
///
/// Unused high bits of the trailing byte are always zero, so the buffer can be
/// concatenated or truncated at any bit position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_len: 0,
        }
    }

    /// Append the low `length` bits of `bits` (length ≤ 32)
    pub fn write(&mut self, bits: u32, length: u32) {
        debug_assert!(length <= 32, "write of {length} bits");
        let mut value = if length >= 32 {
            bits
        } else {
            bits & ((1u32 << length) - 1)
        };
        let mut remaining = length.min(32);

        while remaining > 0 {
            let used = (self.bit_len % 8) as u32;
            if used == 0 {
                self.bytes.push(0);
            }
            let take = (8 - used).min(remaining);
            let chunk = (value & ((1u32 << take) - 1)) as u8;
            if let Some(last) = self.bytes.last_mut() {
                *last |= chunk << used;
            }
            value >>= take;
            remaining -= take;
            self.bit_len += take as usize;
        }
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write(bit as u32, 1);
    }

    /// Append a canonical code MSB-first
    #[inline]
    pub fn write_code(&mut self, code: u32, length: u8) {
        self.write(reverse_bits(code, length), length as u32);
    }

    /// Number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Cut the stream back to `bit_len` bits (no-op if already shorter)
    pub fn truncate(&mut self, bit_len: usize) {
        if bit_len >= self.bit_len {
            return;
        }
        self.bytes.truncate(bit_len.div_ceil(8));
        let rem = bit_len % 8;
        if rem != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1u8 << rem) - 1;
            }
        }
        self.bit_len = bit_len;
    }

    /// Zero-fill to the next byte boundary
    pub fn pad_to_byte(&mut self) {
        self.bit_len = self.bytes.len() * 8;
    }

    /// Append every bit of `self` to `other`
    pub fn write_to(&self, other: &mut BitWriter) {
        let full = self.bit_len / 8;
        for &byte in &self.bytes[..full] {
            other.write(byte as u32, 8);
        }
        let rem = self.bit_len % 8;
        if rem != 0 {
            other.write(self.bytes[full] as u32, rem as u32);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// =============================================================================
// Reader
// =============================================================================

/// LSB-first bit reader over a borrowed buffer
///
/// Reading past the end is always an error ([`HuffError::BitstreamExhausted`]);
/// only [`BitReader::peek_byte`] looks beyond the end, and it sees zeros.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    end: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            end: data.len() * 8,
        }
    }

    /// Reader limited to the first `bit_len` bits of `data`
    pub fn with_bit_len(data: &'a [u8], bit_len: usize) -> Self {
        Self {
            data,
            position: 0,
            end: bit_len.min(data.len() * 8),
        }
    }

    #[inline]
    pub fn bit_position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining_bits(&self) -> usize {
        self.end - self.position
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.end
    }

    /// Move to an absolute bit position (clamped to the end)
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.end);
    }

    #[inline]
    pub fn read_bit(&mut self) -> Result<u32, HuffError> {
        if self.position >= self.end {
            return Err(HuffError::BitstreamExhausted {
                position: self.position,
            });
        }
        let bit = (self.data[self.position / 8] >> (self.position % 8)) & 1;
        self.position += 1;
        Ok(bit as u32)
    }

    /// Read `count` bits (≤ 32) as an LSB-first field
    pub fn read_bits(&mut self, count: u32) -> Result<u32, HuffError> {
        debug_assert!(count <= 32, "read of {count} bits");
        let count = count.min(32) as usize;
        if count == 0 {
            return Ok(0);
        }
        if self.position + count > self.end {
            return Err(HuffError::BitstreamExhausted {
                position: self.position,
            });
        }

        let mut result = 0u32;
        let mut read = 0;
        while read < count {
            let shift = self.position % 8;
            let take = (8 - shift).min(count - read);
            let byte = self.data[self.position / 8] >> shift;
            let chunk = (byte as u32) & ((1u32 << take) - 1);
            result |= chunk << read;
            read += take;
            self.position += take;
        }
        Ok(result)
    }

    /// Next 8 bits without consuming them (bit 0 = next bit, zeros past the end)
    #[inline]
    pub fn peek_byte(&self) -> u8 {
        let index = self.position / 8;
        let lo = self.data.get(index).copied().unwrap_or(0) as u16;
        let hi = self.data.get(index + 1).copied().unwrap_or(0) as u16;
        let mut window = ((lo | (hi << 8)) >> (self.position % 8)) as u8;

        let available = self.end.saturating_sub(self.position);
        if available < 8 {
            window &= ((1u16 << available) - 1) as u8;
        }
        window
    }

    /// Consume `count` bits
    pub fn skip(&mut self, count: usize) -> Result<(), HuffError> {
        if self.position + count > self.end {
            return Err(HuffError::BitstreamExhausted {
                position: self.position,
            });
        }
        self.position += count;
        Ok(())
    }
}
