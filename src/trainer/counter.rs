use std::cmp::Ordering;
use std::collections::{hash_map::Entry, BinaryHeap};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::PairCounting;
use crate::trainer::symbols::{Pair, SymbolId, SymbolTable};
use crate::trainer::word::PretokenTable;

/// Maintains adjacent pair counts across merge iterations.
#[derive(Debug)]
pub(crate) enum PairCounter {
    /// Recounts the whole table before every selection.
    FullRescan(FullRescan),
    /// Updates counts from per-merge deltas and keeps a lazy max-heap.
    Incremental(Incremental),
}

impl PairCounter {
    pub(crate) fn new(
        strategy: PairCounting,
        table: &PretokenTable,
        symbols: &SymbolTable,
    ) -> Self {
        match strategy {
            PairCounting::FullRescan => Self::FullRescan(FullRescan::default()),
            PairCounting::Incremental => Self::Incremental(Incremental::new(table, symbols)),
        }
    }

    /// Returns the most frequent pair and its count.
    ///
    /// Ties are broken by taking the pair with the greatest `(left, right)` bytes.
    pub(crate) fn best(
        &mut self,
        table: &PretokenTable,
        symbols: &SymbolTable,
    ) -> Option<(Pair, usize)> {
        match self {
            Self::FullRescan(counter) => counter.best(table, symbols),
            Self::Incremental(counter) => counter.best(),
        }
    }

    /// Fuses `pair` into `replacement` throughout the table and refreshes the counts.
    ///
    /// Compacts the table once emptied slots outnumber live ones. Returns the number
    /// of distinct pretokens rewritten.
    pub(crate) fn apply_merge(
        &mut self,
        table: &mut PretokenTable,
        pair: Pair,
        replacement: SymbolId,
        symbols: &SymbolTable,
    ) -> usize {
        let rewritten = match self {
            Self::FullRescan(_) => {
                let slots = table.live_slots();
                table.apply_merge(pair, replacement, slots, false).rewritten
            }
            Self::Incremental(counter) => counter.apply_merge(table, pair, replacement, symbols),
        };
        if table.needs_compaction() {
            let remap = table.compact();
            if let Self::Incremental(counter) = self {
                counter.remap_slots(&remap);
            }
        }
        rewritten
    }

    /// Number of distinct pairs with a positive count, as of the last update.
    pub(crate) fn distinct_pairs(&self) -> usize {
        match self {
            Self::FullRescan(counter) => counter.distinct_pairs,
            Self::Incremental(counter) => counter.pair_counts.len(),
        }
    }
}

/// Full recount each iteration; matches the reference selection by construction.
#[derive(Debug, Default)]
pub(crate) struct FullRescan {
    distinct_pairs: usize,
}

impl FullRescan {
    fn best(&mut self, table: &PretokenTable, symbols: &SymbolTable) -> Option<(Pair, usize)> {
        let pair_counts = compute_pair_counts(table);
        self.distinct_pairs = pair_counts.len();
        select_best(&pair_counts, symbols)
    }
}

/// Counts every adjacent pair, weighting each occurrence by its pretoken count.
pub(crate) fn compute_pair_counts(table: &PretokenTable) -> FxHashMap<Pair, usize> {
    table
        .words()
        .par_iter()
        .filter(|word| word.count() > 0)
        .fold(FxHashMap::default, |mut local, word| {
            let count = word.count();
            word.for_each_pair(|pair| *local.entry(pair).or_insert(0) += count);
            local
        })
        .reduce(FxHashMap::default, |mut acc, local| {
            for (pair, count) in local {
                *acc.entry(pair).or_insert(0) += count;
            }
            acc
        })
}

/// Picks the highest count, breaking ties on the byte-lexicographically greatest pair.
pub(crate) fn select_best(
    pair_counts: &FxHashMap<Pair, usize>,
    symbols: &SymbolTable,
) -> Option<(Pair, usize)> {
    pair_counts
        .iter()
        .max_by(|(pair_a, count_a), (pair_b, count_b)| {
            count_a
                .cmp(count_b)
                .then_with(|| symbols.compare_pairs(**pair_a, **pair_b))
        })
        .map(|(&pair, &count)| (pair, count))
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct PairScore {
    frequency: usize,
    left: Arc<[u8]>,
    right: Arc<[u8]>,
    pair: Pair,
}

impl PairScore {
    fn new(pair: Pair, frequency: usize, symbols: &SymbolTable) -> Self {
        Self {
            frequency,
            left: symbols.shared(pair.0),
            right: symbols.shared(pair.1),
            pair,
        }
    }
}

impl Ord for PairScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| self.left.cmp(&other.left))
            .then_with(|| self.right.cmp(&other.right))
            .then_with(|| self.pair.cmp(&other.pair))
    }
}

impl PartialOrd for PairScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Incremental pair counts with a pair → slot index and a lazily invalidated heap.
#[derive(Debug, Default)]
pub(crate) struct Incremental {
    pair_counts: FxHashMap<Pair, usize>,
    locations: FxHashMap<Pair, FxHashSet<usize>>,
    heap: BinaryHeap<PairScore>,
}

impl Incremental {
    fn new(table: &PretokenTable, symbols: &SymbolTable) -> Self {
        let mut counter = Self::default();
        for (slot, word) in table.live() {
            let count = word.count();
            word.for_each_pair(|pair| {
                *counter.pair_counts.entry(pair).or_insert(0) += count;
                counter.locations.entry(pair).or_default().insert(slot);
            });
        }
        counter.heap = counter
            .pair_counts
            .iter()
            .map(|(&pair, &count)| PairScore::new(pair, count, symbols))
            .collect();
        counter
    }

    fn best(&mut self) -> Option<(Pair, usize)> {
        while let Some(score) = self.heap.pop() {
            match self.pair_counts.get(&score.pair) {
                Some(&current) if current == score.frequency => {
                    return Some((score.pair, current));
                }
                _ => continue,
            }
        }
        None
    }

    fn apply_merge(
        &mut self,
        table: &mut PretokenTable,
        pair: Pair,
        replacement: SymbolId,
        symbols: &SymbolTable,
    ) -> usize {
        let mut candidates: Vec<usize> = self
            .locations
            .remove(&pair)
            .map(|slots| slots.into_iter().collect())
            .unwrap_or_default();
        candidates.sort_unstable();

        let outcome = table.apply_merge(pair, replacement, candidates, true);
        for (pair_key, delta) in outcome.deltas {
            self.apply_delta(pair_key, delta, symbols);
        }
        for slot in outcome.touched {
            let word = table.word(slot);
            word.for_each_pair(|adjacent| {
                self.locations.entry(adjacent).or_default().insert(slot);
            });
        }
        outcome.rewritten
    }

    /// Rewrites indexed slots after a table compaction, dropping emptied ones.
    fn remap_slots(&mut self, remap: &[Option<usize>]) {
        for slots in self.locations.values_mut() {
            *slots = slots
                .iter()
                .filter_map(|&slot| remap.get(slot).copied().flatten())
                .collect();
        }
        self.locations.retain(|_, slots| !slots.is_empty());
    }

    fn apply_delta(&mut self, pair: Pair, delta: i64, symbols: &SymbolTable) {
        match delta.cmp(&0) {
            Ordering::Greater => {
                let amount = usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX);
                let count = self.pair_counts.entry(pair).or_insert(0);
                *count += amount;
                let score = PairScore::new(pair, *count, symbols);
                self.heap.push(score);
            }
            Ordering::Less => {
                let amount = usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX);
                if let Entry::Occupied(mut occupied) = self.pair_counts.entry(pair) {
                    let new_value = occupied.get().saturating_sub(amount);
                    if new_value == 0 {
                        occupied.remove();
                        self.locations.remove(&pair);
                    } else {
                        *occupied.get_mut() = new_value;
                        self.heap.push(PairScore::new(pair, new_value, symbols));
                    }
                }
            }
            Ordering::Equal => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(segments: &[(&str, usize)]) -> PretokenTable {
        PretokenTable::from_segments(
            segments
                .iter()
                .map(|(segment, count)| (segment.as_bytes(), *count)),
        )
    }

    fn id(byte: u8) -> SymbolId {
        SymbolId::from(byte)
    }

    #[test]
    fn pair_counts_weight_by_pretoken_count() {
        let counts = compute_pair_counts(&table(&[("aba", 3), ("ab", 1)]));
        assert_eq!(counts[&(id(b'a'), id(b'b'))], 4);
        assert_eq!(counts[&(id(b'b'), id(b'a'))], 3);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn ties_prefer_the_lexicographically_greater_pair() {
        let symbols = SymbolTable::with_byte_alphabet();
        let counts = compute_pair_counts(&table(&[("ab", 2), ("cd", 2), ("ba", 1)]));
        assert_eq!(select_best(&counts, &symbols), Some(((id(b'c'), id(b'd')), 2)));
    }

    #[test]
    fn higher_count_beats_greater_bytes() {
        let symbols = SymbolTable::with_byte_alphabet();
        let counts = compute_pair_counts(&table(&[("ab", 3), ("zz", 2)]));
        assert_eq!(select_best(&counts, &symbols), Some(((id(b'a'), id(b'b')), 3)));
    }

    #[test]
    fn single_symbol_pretokens_have_no_best_pair() {
        let symbols = SymbolTable::with_byte_alphabet();
        let single_bytes = table(&[("x", 4), ("y", 1)]);
        for strategy in [PairCounting::FullRescan, PairCounting::Incremental] {
            let mut counter = PairCounter::new(strategy, &single_bytes, &symbols);
            assert_eq!(counter.best(&single_bytes, &symbols), None);
        }
    }

    #[test]
    fn incremental_tracks_full_rescan_through_merges() {
        let mut symbols = SymbolTable::with_byte_alphabet();
        let segments = [("banana", 3), (" bandana", 2), ("nab", 4), ("aaaa", 1)];
        let mut full_table = table(&segments);
        let mut inc_table = table(&segments);
        let mut full = PairCounter::new(PairCounting::FullRescan, &full_table, &symbols);
        let mut inc = PairCounter::new(PairCounting::Incremental, &inc_table, &symbols);

        for _ in 0..8 {
            let expected = full.best(&full_table, &symbols);
            let actual = inc.best(&inc_table, &symbols);
            assert_eq!(actual, expected);
            let Some((pair, _)) = expected else { break };
            let replacement = symbols.fuse(pair).unwrap();
            full.apply_merge(&mut full_table, pair, replacement, &symbols);
            inc.apply_merge(&mut inc_table, pair, replacement, &symbols);
            assert_eq!(compute_pair_counts(&inc_table).len(), inc.distinct_pairs());
            assert_eq!(full_table.to_map(), inc_table.to_map());
        }
    }

    #[test]
    fn compaction_keeps_both_strategies_in_step() {
        let mut symbols = SymbolTable::with_byte_alphabet();
        let segments = [
            ("abcdefgh", 5),
            (" abcdefg", 3),
            ("hgfedcba", 2),
            ("abab", 4),
            ("zz", 1),
        ];
        let mut full_table = table(&segments);
        let mut inc_table = table(&segments);
        let mut full = PairCounter::new(PairCounting::FullRescan, &full_table, &symbols);
        let mut inc = PairCounter::new(PairCounting::Incremental, &inc_table, &symbols);

        loop {
            let expected = full.best(&full_table, &symbols);
            assert_eq!(inc.best(&inc_table, &symbols), expected);
            let Some((pair, _)) = expected else { break };
            let replacement = symbols.fuse(pair).unwrap();
            full.apply_merge(&mut full_table, pair, replacement, &symbols);
            inc.apply_merge(&mut inc_table, pair, replacement, &symbols);
            for table in [&full_table, &inc_table] {
                assert!(table.words().len() <= 2 * table.len());
            }
            assert_eq!(full_table.to_map(), inc_table.to_map());
        }
        assert_eq!(inc_table.len(), 5);
    }
}
