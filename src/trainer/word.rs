use rustc_hash::FxHashMap;

use crate::trainer::symbols::{Pair, SymbolId};

/// Pair count deltas and bookkeeping produced by one merge over the table.
#[derive(Debug, Default)]
pub(crate) struct MergeOutcome {
    /// Number of distinct pretokens rewritten.
    pub(crate) rewritten: usize,
    /// Pair count changes. Only filled when deltas are requested.
    pub(crate) deltas: FxHashMap<Pair, i64>,
    /// Slots now holding a rewritten word.
    pub(crate) touched: Vec<usize>,
}

/// One distinct pretoken and its corpus count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Word {
    symbols: Vec<SymbolId>,
    count: usize,
}

impl Word {
    /// Builds a word of single-byte symbols.
    pub(crate) fn from_bytes(bytes: &[u8], count: usize) -> Self {
        Self {
            symbols: bytes.iter().map(|&byte| SymbolId::from(byte)).collect(),
            count,
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Invokes `f` for every adjacent pair, left to right, including repeats.
    pub(crate) fn for_each_pair<F>(&self, mut f: F)
    where
        F: FnMut(Pair),
    {
        for window in self.symbols.windows(2) {
            f((window[0], window[1]));
        }
    }

    /// Returns the symbols with every non-overlapping occurrence of `pair` fused.
    ///
    /// Scanning is greedy left to right and resumes after a fused symbol, so `a a a`
    /// merged on `(a, a)` becomes `aa a`. Returns `None` when `pair` does not occur.
    pub(crate) fn fused(&self, pair: Pair, replacement: SymbolId) -> Option<Vec<SymbolId>> {
        let len = self.symbols.len();
        let mut out = Vec::with_capacity(len);
        let mut fused_any = false;
        let mut i = 0usize;
        while i < len {
            if i + 1 < len && self.symbols[i] == pair.0 && self.symbols[i + 1] == pair.1 {
                out.push(replacement);
                fused_any = true;
                i += 2;
            } else {
                out.push(self.symbols[i]);
                i += 1;
            }
        }
        fused_any.then_some(out)
    }
}

/// Pretoken frequency table: distinct symbol sequences with positive counts.
///
/// Words keep their slot between compactions, so slot numbers can be indexed by
/// pair counters. A rewritten word is folded into an existing key or pushed to a
/// new slot, and its old slot is emptied. Once emptied slots outnumber live ones,
/// [`PretokenTable::compact`] drops them and returns the slot remapping.
#[derive(Debug, Default)]
pub(crate) struct PretokenTable {
    words: Vec<Word>,
    slots: FxHashMap<Vec<SymbolId>, usize>,
}

impl PretokenTable {
    /// Builds a table from segment byte strings and their counts.
    pub(crate) fn from_segments<'a, I>(segments: I) -> Self
    where
        I: IntoIterator<Item = (&'a [u8], usize)>,
    {
        let mut table = Self::default();
        for (bytes, count) in segments {
            table.insert(Word::from_bytes(bytes, count));
        }
        table
    }

    /// Builds a table from already interned symbol sequences.
    pub(crate) fn from_symbols<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Vec<SymbolId>, usize)>,
    {
        let mut table = Self::default();
        for (symbols, count) in entries {
            table.insert(Word { symbols, count });
        }
        table
    }

    /// Adds `word`, accumulating into an existing slot with the same symbols.
    fn insert(&mut self, word: Word) -> Option<usize> {
        if word.count == 0 {
            return None;
        }
        if let Some(&slot) = self.slots.get(&word.symbols) {
            self.words[slot].count += word.count;
            return Some(slot);
        }
        let slot = self.words.len();
        self.slots.insert(word.symbols.clone(), slot);
        self.words.push(word);
        Some(slot)
    }

    /// Iterates live `(slot, word)` entries.
    pub(crate) fn live(&self) -> impl Iterator<Item = (usize, &Word)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter(|(_, word)| word.count > 0)
    }

    pub(crate) fn words(&self) -> &[Word] {
        &self.words
    }

    pub(crate) fn word(&self, slot: usize) -> &Word {
        &self.words[slot]
    }

    /// Number of distinct pretokens currently held.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Sum of all pretoken counts.
    pub(crate) fn total_count(&self) -> usize {
        self.live().map(|(_, word)| word.count).sum()
    }

    /// Slots of all live words, in slot order.
    pub(crate) fn live_slots(&self) -> Vec<usize> {
        self.live().map(|(slot, _)| slot).collect()
    }

    /// True once emptied slots outnumber live words.
    pub(crate) fn needs_compaction(&self) -> bool {
        self.words.len() - self.slots.len() > self.slots.len()
    }

    /// Removes emptied slots, keeping live words in their relative order.
    ///
    /// Returns `old slot -> new slot`, with `None` for the slots that were dropped.
    pub(crate) fn compact(&mut self) -> Vec<Option<usize>> {
        let mut remap = vec![None; self.words.len()];
        let mut live = Vec::with_capacity(self.slots.len());
        for (old, word) in std::mem::take(&mut self.words).into_iter().enumerate() {
            if word.count > 0 {
                remap[old] = Some(live.len());
                live.push(word);
            }
        }
        for slot in self.slots.values_mut() {
            if let Some(new_slot) = remap[*slot] {
                *slot = new_slot;
            }
        }
        self.words = live;
        remap
    }

    /// Rewrites every candidate word containing `pair`, fusing it into `replacement`.
    ///
    /// The rewritten word's count moves to the fused key, which is created or
    /// accumulated, and the old key is removed. Candidates that do not contain the
    /// pair are left untouched. With `track_deltas` the outcome carries the pair
    /// count changes implied by every rewrite.
    pub(crate) fn apply_merge<I>(
        &mut self,
        pair: Pair,
        replacement: SymbolId,
        candidates: I,
        track_deltas: bool,
    ) -> MergeOutcome
    where
        I: IntoIterator<Item = usize>,
    {
        let mut outcome = MergeOutcome::default();
        for slot in candidates {
            let word = &self.words[slot];
            if word.count == 0 {
                continue;
            }
            let Some(fused) = word.fused(pair, replacement) else {
                continue;
            };
            let old = std::mem::take(&mut self.words[slot]);
            self.slots.remove(&old.symbols);
            let count = old.count;
            let new_word = Word {
                symbols: fused,
                count,
            };

            if track_deltas {
                let delta = i64::try_from(count).unwrap_or(i64::MAX);
                old.for_each_pair(|p| *outcome.deltas.entry(p).or_insert(0) -= delta);
                new_word.for_each_pair(|p| *outcome.deltas.entry(p).or_insert(0) += delta);
            }

            if let Some(target) = self.insert(new_word) {
                outcome.touched.push(target);
            }
            outcome.rewritten += 1;
        }
        if track_deltas {
            outcome.deltas.retain(|_, delta| *delta != 0);
        }
        outcome
    }

    /// Snapshot of the table as a plain map, used by tests.
    #[cfg(test)]
    pub(crate) fn to_map(&self) -> FxHashMap<Vec<SymbolId>, usize> {
        self.live()
            .map(|(_, word)| (word.symbols.clone(), word.count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: SymbolId = b'a' as SymbolId;
    const B: SymbolId = b'b' as SymbolId;
    const C: SymbolId = b'c' as SymbolId;
    const AB: SymbolId = 300;
    const AA: SymbolId = 301;

    #[test]
    fn fused_replaces_all_non_overlapping_pairs() {
        let word = Word::from_bytes(b"ababc", 1);
        assert_eq!(word.fused((A, B), AB), Some(vec![AB, AB, C]));
    }

    #[test]
    fn fused_is_greedy_for_repeated_symbols() {
        let word = Word::from_bytes(b"aaa", 1);
        assert_eq!(word.fused((A, A), AA), Some(vec![AA, A]));
        let word = Word::from_bytes(b"aaaa", 1);
        assert_eq!(word.fused((A, A), AA), Some(vec![AA, AA]));
    }

    #[test]
    fn fused_returns_none_without_the_pair() {
        let word = Word::from_bytes(b"bac", 1);
        assert_eq!(word.fused((A, B), AB), None);
    }

    #[test]
    fn for_each_pair_reports_repeats() {
        let word = Word::from_bytes(b"abab", 2);
        let mut pairs = Vec::new();
        word.for_each_pair(|pair| pairs.push(pair));
        assert_eq!(pairs, vec![(A, B), (B, A), (A, B)]);
    }

    #[test]
    fn table_accumulates_duplicate_segments() {
        let table =
            PretokenTable::from_segments([(&b"ab"[..], 2), (&b"ab"[..], 3), (&b"c"[..], 1)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.total_count(), 6);
    }

    #[test]
    fn merge_moves_counts_and_conserves_mass() {
        let mut table = PretokenTable::from_segments([
            (&b"abc"[..], 4),
            (&b"cab"[..], 2),
            (&b"bc"[..], 5),
        ]);
        let before = table.total_count();
        let slots = table.live_slots();
        let outcome = table.apply_merge((A, B), AB, slots, false);
        assert_eq!(outcome.rewritten, 2);
        assert_eq!(table.total_count(), before);

        let map = table.to_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map[&vec![AB, C]], 4);
        assert_eq!(map[&vec![C, AB]], 2);
        assert_eq!(map[&vec![B, C]], 5);
    }

    #[test]
    fn merge_folds_into_existing_key() {
        let mut table = PretokenTable::from_symbols([(vec![A, B], 3), (vec![AB], 2)]);
        let slots = table.live_slots();
        let outcome = table.apply_merge((A, B), AB, slots, true);
        assert_eq!(outcome.rewritten, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.to_map()[&vec![AB]], 5);
        assert_eq!(outcome.deltas.get(&(A, B)), Some(&-3));
    }

    #[test]
    fn compaction_drops_emptied_slots() {
        const X: SymbolId = b'x' as SymbolId;
        const Y: SymbolId = b'y' as SymbolId;
        const XAB: SymbolId = 302;
        const ABY: SymbolId = 303;
        let mut table = PretokenTable::from_segments([
            (&b"ab"[..], 2),
            (&b"c"[..], 7),
            (&b"xab"[..], 1),
            (&b"aby"[..], 4),
        ]);

        let slots = table.live_slots();
        table.apply_merge((A, B), AB, slots, false);
        let slots = table.live_slots();
        table.apply_merge((X, AB), XAB, slots, false);
        assert_eq!(table.words().len(), 8);
        assert!(!table.needs_compaction());

        let slots = table.live_slots();
        table.apply_merge((AB, Y), ABY, slots, false);
        assert!(table.needs_compaction());

        let before = table.to_map();
        let remap = table.compact();
        assert_eq!(remap.len(), 9);
        assert_eq!(remap[1], Some(0));
        assert_eq!(remap[0], None);
        assert_eq!(remap.iter().flatten().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(table.words().len(), 4);
        assert!(!table.needs_compaction());
        assert_eq!(table.to_map(), before);
        assert_eq!(table.total_count(), 14);
        for (symbols, &slot) in &table.slots {
            assert_eq!(&table.words[slot].symbols, symbols);
        }
    }

    #[test]
    fn merge_deltas_match_recount() {
        let mut table = PretokenTable::from_segments([(&b"abab"[..], 2), (&b"cab"[..], 1)]);
        let count_all = |table: &PretokenTable| {
            let mut counts: FxHashMap<Pair, i64> = FxHashMap::default();
            for (_, word) in table.live() {
                word.for_each_pair(|p| *counts.entry(p).or_insert(0) += word.count() as i64);
            }
            counts
        };
        let before = count_all(&table);
        let slots = table.live_slots();
        let outcome = table.apply_merge((A, B), AB, slots, true);
        let after = count_all(&table);

        let mut predicted = before;
        for (pair, delta) in outcome.deltas {
            *predicted.entry(pair).or_insert(0) += delta;
        }
        predicted.retain(|_, count| *count != 0);
        assert_eq!(predicted, after);
    }
}
