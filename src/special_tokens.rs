//! Helpers for arranging special token inventories.

use rustc_hash::FxHashSet;

/// Deduplicates tokens in-place while preserving the first occurrence ordering.
pub fn dedup_in_place(tokens: &mut Vec<String>) {
    let mut seen = FxHashSet::default();
    tokens.retain(|token| seen.insert(token.clone()));
}

/// Returns the tokens ordered by descending UTF-8 byte length.
///
/// The sort is stable, so tokens of equal length keep the caller's order. Used to
/// build boundary matchers where a longer token must win over any shorter token
/// that is a prefix of it.
pub fn by_match_priority<S: AsRef<str>>(tokens: &[S]) -> Vec<&str> {
    let mut ordered: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()));
    ordered
}

/// Returns the single byte values whose one-byte symbol coincides with a special token.
///
/// Those bytes are not seeded a second time into the vocabulary.
pub fn colliding_bytes<S: AsRef<str>>(tokens: &[S]) -> FxHashSet<u8> {
    tokens
        .iter()
        .filter_map(|token| match token.as_ref().as_bytes() {
            [byte] => Some(*byte),
            _ => None,
        })
        .collect()
}
