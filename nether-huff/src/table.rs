//! Canonical decode tables and the decoder scratch arena
//!
//! A [`CanonicalTable`] is a small `Copy` header (per-length ceilings and
//! offsets) plus handles into a caller-owned [`DecoderScratch`] holding the
//! symbol array and the optional prefix table. The scratch is sized once when
//! the decoder is created; loading tables only hands out ranges of it.

use crate::bits::REVERSE_BYTE;
use crate::builder::canonical_codes;
use crate::{CodeLengths, HuffError, MAX_CODE_LENGTH, PREFIX_BITS, PREFIX_TABLE_WORDS};

const LENGTH_SLOTS: usize = MAX_CODE_LENGTH as usize + 1;

/// Scratch words a decoder needs for a table with these lengths
///
/// This is the budget declared by encoders, so it always includes the prefix
/// table for multi-symbol tables even if a decoder opts out of building it.
pub fn scratch_words_for(lengths: &CodeLengths) -> usize {
    let symbols = lengths.len();
    if symbols >= 2 {
        symbols + PREFIX_TABLE_WORDS
    } else {
        symbols
    }
}

// =============================================================================
// Scratch Arena
// =============================================================================

/// Fixed-capacity word arena backing decoder tables
#[derive(Debug, Clone)]
pub struct DecoderScratch {
    words: Vec<u16>,
    used: usize,
}

impl DecoderScratch {
    /// Allocate the arena once; nothing grows it afterwards
    pub fn new(capacity_words: usize) -> Self {
        Self {
            words: vec![0; capacity_words],
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Release every table (their handles become stale)
    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub(crate) fn alloc(&mut self, count: usize) -> Result<usize, HuffError> {
        let available = self.words.len() - self.used;
        if count > available {
            return Err(HuffError::ScratchExhausted {
                requested: count,
                available,
            });
        }
        let start = self.used;
        self.used += count;
        Ok(start)
    }

    #[inline]
    pub(crate) fn words(&self, start: usize, count: usize) -> &[u16] {
        &self.words[start..start + count]
    }

    #[inline]
    pub(crate) fn words_mut(&mut self, start: usize, count: usize) -> &mut [u16] {
        &mut self.words[start..start + count]
    }
}

// =============================================================================
// Canonical Table
// =============================================================================

/// Decode table header
///
/// For every length ℓ: `ceiling[ℓ]` is one past the last code of that length
/// and `offset[ℓ]` maps a code to its index in the (length, symbol) sorted
/// symbol array. Lengths without codes have a ceiling no code can fall below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalTable {
    pub(crate) min_length: u8,
    pub(crate) max_length: u8,
    pub(crate) symbol_count: u16,
    pub(crate) symbols_at: u32,
    pub(crate) prefix_at: Option<u32>,
    pub(crate) ceiling: [u32; LENGTH_SLOTS],
    pub(crate) offset: [i32; LENGTH_SLOTS],
}

impl Default for CanonicalTable {
    fn default() -> Self {
        Self {
            min_length: 0,
            max_length: 0,
            symbol_count: 0,
            symbols_at: 0,
            prefix_at: None,
            ceiling: [0; LENGTH_SLOTS],
            offset: [0; LENGTH_SLOTS],
        }
    }
}

impl CanonicalTable {
    /// Build a table from code lengths, storing symbols in `scratch`
    pub fn build(
        lengths: &CodeLengths,
        scratch: &mut DecoderScratch,
        with_prefix: bool,
    ) -> Result<Self, HuffError> {
        let count = lengths.len();
        let mut table = Self::with_counts(
            lengths.min_length(),
            lengths.max_length(),
            &lengths.length_counts(),
            count,
        );

        table.symbols_at = scratch.alloc(count)? as u32;
        let slots = scratch.words_mut(table.symbols_at as usize, count);
        for (slot, (symbol, _)) in slots.iter_mut().zip(lengths.iter()) {
            *slot = symbol;
        }

        if with_prefix {
            table.attach_prefix(scratch)?;
        }
        debug_assert!(
            count < 2 || canonical_codes(lengths).all(|(s, c, l)| table.lookup(scratch, c, l) == Some(s))
        );
        Ok(table)
    }

    /// Header with ceilings and offsets computed from per-length counts
    ///
    /// `symbols_at` is left at 0 for the caller to fill in.
    pub(crate) fn with_counts(
        min_length: u8,
        max_length: u8,
        counts: &[u16; LENGTH_SLOTS],
        symbol_count: usize,
    ) -> Self {
        let mut table = Self {
            min_length,
            max_length,
            symbol_count: symbol_count as u16,
            ..Self::default()
        };
        if symbol_count < 2 {
            return table;
        }

        let mut code = 0u32;
        let mut index = 0u32;
        for length in 1..=max_length as usize {
            let n = counts[length] as u32;
            table.ceiling[length] = code + n;
            table.offset[length] = code as i32 - index as i32;
            index += n;
            code = (code + n) << 1;
        }
        table
    }

    /// Index of the first symbol of each length in the sorted symbol array
    pub(crate) fn first_indices(counts: &[u16; LENGTH_SLOTS]) -> [u16; LENGTH_SLOTS] {
        let mut first = [0u16; LENGTH_SLOTS];
        let mut index = 0u16;
        for length in 1..LENGTH_SLOTS {
            first[length] = index;
            index += counts[length];
        }
        first
    }

    /// Build the 256-entry prefix length table into scratch
    ///
    /// Entry `i` is keyed by the next 8 stream bits in LSB-first order, so the
    /// candidate code is `REVERSE_BYTE[i]` read MSB-first.
    pub(crate) fn attach_prefix(&mut self, scratch: &mut DecoderScratch) -> Result<(), HuffError> {
        if self.symbol_count < 2 {
            return Ok(());
        }
        let at = scratch.alloc(PREFIX_TABLE_WORDS)?;
        let top = self.max_length.min(PREFIX_BITS);
        let words = scratch.words_mut(at, PREFIX_TABLE_WORDS);
        words.fill(0);

        for index in 0..256usize {
            let window = REVERSE_BYTE[index] as u32;
            let mut matched = 0u8;
            for length in self.min_length.max(1)..=top {
                let code = window >> (PREFIX_BITS - length);
                if code < self.ceiling[length as usize] {
                    matched = length;
                    break;
                }
            }
            words[index / 2] |= (matched as u16) << ((index % 2) * 8);
        }
        self.prefix_at = Some(at as u32);
        Ok(())
    }

    pub fn min_length(&self) -> u8 {
        self.min_length
    }

    pub fn max_length(&self) -> u8 {
        self.max_length
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_count as usize
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix_at.is_some()
    }

    /// One past the last code of `length`
    pub fn ceiling(&self, length: u8) -> u32 {
        self.ceiling[length as usize]
    }

    /// Code value minus first symbol index at `length`
    pub fn offset(&self, length: u8) -> i32 {
        self.offset[length as usize]
    }

    /// Symbols in canonical (length, symbol) order
    pub fn symbols<'s>(&self, scratch: &'s DecoderScratch) -> &'s [u16] {
        scratch.words(self.symbols_at as usize, self.symbol_count as usize)
    }

    /// Prefix table entry for an LSB-first 8-bit window (0 = longer code)
    #[inline]
    pub fn prefix_length(&self, scratch: &DecoderScratch, window: u8) -> Option<u8> {
        let at = self.prefix_at? as usize;
        let word = scratch.words(at + window as usize / 2, 1)[0];
        Some((word >> ((window as usize % 2) * 8)) as u8)
    }

    /// Symbol for a complete code, if `code` is a code of exactly `length`
    #[inline]
    pub(crate) fn lookup(&self, scratch: &DecoderScratch, code: u32, length: u8) -> Option<u16> {
        if length == 0 || length > self.max_length || code >= self.ceiling[length as usize] {
            return None;
        }
        let index = code as i64 - self.offset[length as usize] as i64;
        self.symbols(scratch).get(usize::try_from(index).ok()?).copied()
    }
}
