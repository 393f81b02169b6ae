//! Canonical code construction
//!
//! Huffman merge tree → depth histogram → length limiting → canonical
//! `(length, symbol)` order. The tree shape is discarded once lengths are
//! known; only the sorted length array defines the codes.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::HashMap;

use crate::{BitWriter, HuffError, MAX_CODE_LENGTH, SymbolStatistics};

// =============================================================================
// Code Lengths
// =============================================================================

/// Code length per symbol, kept in canonical `(length, symbol)` order
///
/// A single-symbol table stores length 0: its code is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeLengths {
    entries: Vec<(u16, u8)>,
}

impl CodeLengths {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(symbol: u16) -> Self {
        Self {
            entries: vec![(symbol, 0)],
        }
    }

    /// Validate and sort explicit `(symbol, length)` pairs
    ///
    /// Length 0 marks an absent symbol. A lone remaining symbol becomes a
    /// zero-bit table regardless of its stated length.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u16, u8)>) -> Result<Self, HuffError> {
        let mut entries: Vec<(u16, u8)> = pairs.into_iter().filter(|&(_, len)| len > 0).collect();

        entries.sort_unstable_by_key(|&(symbol, _)| symbol);
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(HuffError::DuplicateSymbol(pair[0].0));
            }
        }

        match entries.len() {
            0 => return Ok(Self::empty()),
            1 => return Ok(Self::single(entries[0].0)),
            _ => {}
        }

        let mut kraft = 0u64;
        for &(symbol, length) in &entries {
            if length > MAX_CODE_LENGTH {
                return Err(HuffError::CodeTooLong {
                    symbol,
                    length,
                    max: MAX_CODE_LENGTH,
                });
            }
            kraft += 1u64 << (MAX_CODE_LENGTH - length);
        }
        if kraft > 1u64 << MAX_CODE_LENGTH {
            return Err(HuffError::KraftViolation);
        }

        entries.sort_by_key(|&(symbol, length)| (length, symbol));
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero or one symbol: no bits are ever read
    pub fn is_degenerate(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Shortest code length (0 for degenerate tables)
    pub fn min_length(&self) -> u8 {
        self.entries.first().map_or(0, |&(_, len)| len)
    }

    /// Longest code length (0 for degenerate tables)
    pub fn max_length(&self) -> u8 {
        self.entries.last().map_or(0, |&(_, len)| len)
    }

    pub fn get(&self, symbol: u16) -> Option<u8> {
        self.entries
            .iter()
            .find(|&&(s, _)| s == symbol)
            .map(|&(_, len)| len)
    }

    /// `(symbol, length)` in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.entries.iter().copied()
    }

    /// Smallest and largest symbol present
    pub fn symbol_range(&self) -> Option<(u16, u16)> {
        let min = self.entries.iter().map(|&(s, _)| s).min()?;
        let max = self.entries.iter().map(|&(s, _)| s).max()?;
        Some((min, max))
    }

    /// Number of codes at each length (index = length)
    pub fn length_counts(&self) -> [u16; MAX_CODE_LENGTH as usize + 1] {
        let mut counts = [0u16; MAX_CODE_LENGTH as usize + 1];
        for &(_, len) in &self.entries {
            counts[len as usize] += 1;
        }
        counts
    }

    /// Kraft sum scaled by `2^15` (complete code ⇔ `1 << 15`)
    pub fn kraft_sum(&self) -> u64 {
        if self.is_degenerate() {
            return 0;
        }
        self.entries
            .iter()
            .map(|&(_, len)| 1u64 << (MAX_CODE_LENGTH - len))
            .sum()
    }

    /// Every bit pattern decodes to some symbol
    pub fn is_complete(&self) -> bool {
        self.kraft_sum() == 1u64 << MAX_CODE_LENGTH
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Build length-limited code lengths from statistics
///
/// Ties in the merge queue break by insertion order: leaves enter in ascending
/// symbol order and every merged node takes the next sequence number, so the
/// result is reproducible across runs and platforms.
pub fn build_code_lengths(
    stats: &SymbolStatistics,
    max_code_length: u8,
) -> Result<CodeLengths, HuffError> {
    if max_code_length == 0 || max_code_length > MAX_CODE_LENGTH {
        return Err(HuffError::CodeTooLong {
            symbol: 0,
            length: max_code_length,
            max: MAX_CODE_LENGTH,
        });
    }

    let leaves = stats.sorted();
    match leaves.len() {
        0 => return Ok(CodeLengths::empty()),
        1 => return Ok(CodeLengths::single(leaves[0].0)),
        _ => {}
    }

    let n = leaves.len();
    if n > 1usize << max_code_length {
        return Err(HuffError::AlphabetTooLarge {
            symbols: n,
            max_length: max_code_length,
        });
    }

    // Merge tree: nodes 0..n are leaves, n.. are merged nodes
    let mut parent = vec![usize::MAX; 2 * n - 1];
    let mut heap = BinaryHeap::with_capacity(n);
    for (index, &(_, count)) in leaves.iter().enumerate() {
        heap.push(Reverse((count as u64, index)));
    }

    let mut next = n;
    while heap.len() > 1 {
        let (Some(Reverse((weight_a, a))), Some(Reverse((weight_b, b)))) = (heap.pop(), heap.pop())
        else {
            break;
        };
        parent[a] = next;
        parent[b] = next;
        heap.push(Reverse((weight_a + weight_b, next)));
        next += 1;
    }

    // Parents always have higher indices than their children
    let root = next - 1;
    let mut depth = vec![0usize; root + 1];
    for node in (0..root).rev() {
        depth[node] = depth[parent[node]] + 1;
    }

    let max_len = max_code_length as usize;
    let max_depth = depth[..n].iter().copied().max().unwrap_or(0);
    let mut counts = vec![0u32; max_depth.max(max_len) + 1];
    for &d in &depth[..n] {
        counts[d] += 1;
    }

    let limited = max_depth > max_len;
    if limited {
        limit_length_counts(&mut counts, max_len);
    }

    // Shallowest leaves take the shortest lengths
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&leaf| (depth[leaf], Reverse(leaves[leaf].1), leaf));

    let mut entries = Vec::with_capacity(n);
    let mut ranked = order.into_iter();
    for (length, &count) in counts.iter().enumerate().take(max_len + 1).skip(1) {
        for leaf in ranked.by_ref().take(count as usize) {
            entries.push((leaves[leaf].0, length as u8));
        }
    }
    entries.sort_by_key(|&(symbol, length)| (length, symbol));

    let lengths = CodeLengths { entries };
    tracing::debug!(
        symbols = n,
        max_depth,
        limited,
        max_length = lengths.max_length(),
        "built code lengths"
    );
    Ok(lengths)
}

/// Fold lengths deeper than `max` into `max`, then rebalance until the Kraft
/// sum is exactly `2^max`
fn limit_length_counts(counts: &mut Vec<u32>, max: usize) {
    let overflow: u32 = counts[max + 1..].iter().sum();
    counts[max] += overflow;
    counts.truncate(max + 1);

    let target = 1u64 << max;
    let mut total: u64 = (1..=max).map(|len| (counts[len] as u64) << (max - len)).sum();

    while total > target {
        counts[max] -= 1;
        for len in (1..max).rev() {
            if counts[len] != 0 {
                counts[len] -= 1;
                counts[len + 1] += 2;
                break;
            }
        }
        total -= 1;
    }
    debug_assert_eq!(total, target);
}

// =============================================================================
// Code Book
// =============================================================================

/// Canonical `(symbol, code, length)` triples in canonical order
pub(crate) fn canonical_codes(lengths: &CodeLengths) -> impl Iterator<Item = (u16, u32, u8)> + '_ {
    let mut code = 0u32;
    let mut current = lengths.min_length();
    lengths.iter().map(move |(symbol, length)| {
        if length > current {
            code <<= length - current;
            current = length;
        }
        let assigned = code;
        code += 1;
        (symbol, assigned, length)
    })
}

/// Encoder-side symbol → code lookup
#[derive(Debug, Clone, Default)]
pub struct CodeBook {
    codes: HashMap<u16, (u32, u8)>,
}

impl CodeBook {
    pub fn new(lengths: &CodeLengths) -> Self {
        let codes = canonical_codes(lengths)
            .map(|(symbol, code, length)| (symbol, (code, length)))
            .collect();
        Self { codes }
    }

    /// `(code, length)` for a symbol
    pub fn code(&self, symbol: u16) -> Option<(u32, u8)> {
        self.codes.get(&symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Write the code for `symbol`, returning the number of bits written
    pub fn write(&self, symbol: u16, writer: &mut BitWriter) -> Result<u8, HuffError> {
        let (code, length) = self.code(symbol).ok_or(HuffError::UnknownSymbol(symbol))?;
        writer.write_code(code, length);
        Ok(length)
    }
}
