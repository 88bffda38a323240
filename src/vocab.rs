//! Vocabulary table and merge rule types produced by training.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::error::{Result, TextBpeError};
use crate::special_tokens;

/// Token identifier used throughout the crate.
pub type TokenId = u32;

/// A learned merge: the left and right symbol bytes fused into one new symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeRule {
    /// Bytes of the left symbol.
    pub left: Vec<u8>,
    /// Bytes of the right symbol.
    pub right: Vec<u8>,
}

impl MergeRule {
    /// Creates a merge rule from the two symbol byte strings.
    #[must_use]
    pub fn new(left: Vec<u8>, right: Vec<u8>) -> Self {
        Self { left, right }
    }

    /// Returns the bytes of the symbol created by this merge.
    #[must_use]
    pub fn merged(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.left.len() + self.right.len());
        bytes.extend_from_slice(&self.left);
        bytes.extend_from_slice(&self.right);
        bytes
    }

    /// Converts the rule into a `(left, right)` tuple.
    #[must_use]
    pub fn into_pair(self) -> (Vec<u8>, Vec<u8>) {
        (self.left, self.right)
    }
}

/// Insertion-ordered mapping from contiguous [`TokenId`]s to symbol bytes.
///
/// Ids are handed out as special tokens first, then the byte alphabet (minus bytes
/// already taken by a one-byte special token), then one entry per merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<Vec<u8>>,
    special_count: usize,
    seed_len: usize,
}

impl Vocabulary {
    /// Seeds a vocabulary with `special_tokens` followed by the single-byte symbols.
    #[must_use]
    pub fn seeded<S: AsRef<str>>(special_tokens: &[S]) -> Self {
        let colliding = special_tokens::colliding_bytes(special_tokens);
        let mut entries: Vec<Vec<u8>> = special_tokens
            .iter()
            .map(|token| token.as_ref().as_bytes().to_vec())
            .collect();
        entries.extend(
            (0u8..=u8::MAX)
                .filter(|byte| !colliding.contains(byte))
                .map(|byte| vec![byte]),
        );
        let seed_len = entries.len();
        Self {
            entries,
            special_count: special_tokens.len(),
            seed_len,
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the vocabulary holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leading special token entries.
    #[must_use]
    pub fn special_count(&self) -> usize {
        self.special_count
    }

    /// Number of entries present before any merge was added.
    #[must_use]
    pub fn seed_len(&self) -> usize {
        self.seed_len
    }

    /// Number of byte values that were not seeded because a special token covers them.
    #[must_use]
    pub fn skipped_bytes(&self) -> usize {
        self.special_count + 256 - self.seed_len
    }

    /// Returns the bytes for `id`.
    #[must_use]
    pub fn get(&self, id: TokenId) -> Option<&[u8]> {
        self.entries.get(id as usize).map(Vec::as_slice)
    }

    /// Appends a new symbol and returns its id.
    pub fn push(&mut self, bytes: Vec<u8>) -> Result<TokenId> {
        let id = TokenId::try_from(self.entries.len())
            .map_err(|_| TextBpeError::Internal("vocabulary size exceeded u32::MAX".into()))?;
        self.entries.push(bytes);
        Ok(id)
    }

    /// Iterates `(id, bytes)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &[u8])> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, bytes)| (idx as TokenId, bytes.as_slice()))
    }

    /// Returns a copy keeping only the first `len` entries.
    ///
    /// `len` is clamped to the seeded size so the special and byte entries survive.
    #[must_use]
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.clamp(self.seed_len, self.entries.len().max(self.seed_len));
        Self {
            entries: self.entries[..len].to_vec(),
            special_count: self.special_count,
            seed_len: self.seed_len,
        }
    }

    /// Converts the vocabulary into an ordered id → bytes map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<TokenId, Vec<u8>> {
        self.iter().map(|(id, bytes)| (id, bytes.to_vec())).collect()
    }
}
