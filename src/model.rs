//! The trained artefact: vocabulary table plus ordered merge rules.

use std::collections::BTreeMap;

use crate::error::{Result, TextBpeError};
use crate::vocab::{MergeRule, TokenId, Vocabulary};

/// Id → bytes view of a vocabulary.
pub type VocabMap = BTreeMap<TokenId, Vec<u8>>;
/// Merge rules as `(left, right)` byte pairs in selection order.
pub type MergeList = Vec<(Vec<u8>, Vec<u8>)>;

/// Trained BPE model containing the learned vocabulary and merge table.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpeModel {
    vocab: Vocabulary,
    merges: Vec<MergeRule>,
    special_tokens: Vec<String>,
}

impl BpeModel {
    /// Constructs a new model from a vocabulary, its merges, and the seeding special tokens.
    pub fn new(vocab: Vocabulary, merges: Vec<MergeRule>, special_tokens: Vec<String>) -> Self {
        Self {
            vocab,
            merges,
            special_tokens,
        }
    }

    /// Returns the vocabulary table.
    #[must_use]
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Returns the merge rules in the order they were learned.
    #[must_use]
    pub fn merges(&self) -> &[MergeRule] {
        &self.merges
    }

    /// Returns the special tokens occupying the first vocabulary ids.
    #[must_use]
    pub fn special_tokens(&self) -> &[String] {
        &self.special_tokens
    }

    /// Returns the total vocabulary size including special tokens.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Returns the bytes of token `id`.
    #[must_use]
    pub fn token_bytes(&self, id: TokenId) -> Option<&[u8]> {
        self.vocab.get(id)
    }

    /// Splits the model into the plain vocabulary map and merge list.
    #[must_use]
    pub fn into_parts(self) -> (VocabMap, MergeList) {
        let vocab = self.vocab.to_map();
        let merges = self.merges.into_iter().map(MergeRule::into_pair).collect();
        (vocab, merges)
    }

    /// Creates a derived model trimmed to the requested vocabulary size while preserving merge order.
    ///
    /// Merge selection never looks ahead, so the result equals training the same corpus
    /// with `target_vocab_size` as the target.
    pub fn derive_with_vocab(&self, target_vocab_size: usize) -> Result<Self> {
        let min_vocab = self.vocab.seed_len();
        if target_vocab_size < min_vocab {
            return Err(TextBpeError::InvalidConfig(format!(
                "requested vocab {target_vocab_size} is smaller than the seeded size {min_vocab}"
            )));
        }
        let current_total = self.vocab_size();
        if target_vocab_size > current_total {
            return Err(TextBpeError::InvalidConfig(format!(
                "requested vocab {target_vocab_size} exceeds trained size {current_total}"
            )));
        }
        let target_merges = target_vocab_size - min_vocab;
        Ok(Self::new(
            self.vocab.truncated(target_vocab_size),
            self.merges[..target_merges].to_vec(),
            self.special_tokens.clone(),
        ))
    }
}
