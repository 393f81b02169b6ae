//! Symbol frequency statistics (encoder pass 1)

use hashbrown::HashMap;

/// Observed count per symbol
///
/// Filled while walking the data once, then consumed by
/// [`build_code_lengths`](crate::build_code_lengths).
#[derive(Debug, Clone, Default)]
pub struct SymbolStatistics {
    counts: HashMap<u16, u32>,
    total: u64,
}

impl SymbolStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build statistics from `(symbol, count)` pairs; zero counts are ignored
    pub fn from_counts(pairs: impl IntoIterator<Item = (u16, u32)>) -> Self {
        let mut stats = Self::new();
        for (symbol, count) in pairs {
            stats.observe_n(symbol, count);
        }
        stats
    }

    /// Build statistics by observing every symbol in `symbols`
    pub fn from_symbols(symbols: &[u16]) -> Self {
        let mut stats = Self::new();
        for &symbol in symbols {
            stats.observe(symbol);
        }
        stats
    }

    #[inline]
    pub fn observe(&mut self, symbol: u16) {
        self.observe_n(symbol, 1);
    }

    pub fn observe_n(&mut self, symbol: u16, count: u32) {
        if count == 0 {
            return;
        }
        *self.counts.entry(symbol).or_insert(0) += count;
        self.total += count as u64;
    }

    pub fn count(&self, symbol: u16) -> u32 {
        self.counts.get(&symbol).copied().unwrap_or(0)
    }

    /// Total number of observations
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct symbols observed
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(symbol, count)` pairs in ascending symbol order
    pub fn sorted(&self) -> Vec<(u16, u32)> {
        let mut pairs: Vec<(u16, u32)> = self.counts.iter().map(|(&s, &c)| (s, c)).collect();
        pairs.sort_unstable_by_key(|&(symbol, _)| symbol);
        pairs
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }
}
