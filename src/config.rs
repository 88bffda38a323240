//! Configuration builders controlling training and corpus ingestion.

use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TextBpeError};
use crate::special_tokens;

/// Strategy used to maintain adjacent pair counts between merge iterations.
///
/// Both strategies select exactly the same merge sequence; they only differ in cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PairCounting {
    /// Recount every pair across the whole pretoken table before each merge.
    FullRescan,
    /// Count once, then only revisit pretokens containing the merged pair.
    #[default]
    Incremental,
}

/// Configuration for BPE training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Target vocabulary size including special tokens and the byte alphabet.
    pub target_vocab_size: usize,
    /// Boundary markers seeded at the front of the vocabulary, in id order.
    pub special_tokens: Vec<String>,
    /// Minimum pair count required before a merge is performed.
    pub min_frequency: usize,
    /// Hard cap on merge iterations; `None` only stops on the vocabulary target.
    pub max_merge_iterations: Option<usize>,
    /// Pair counting strategy used by the merge loop.
    pub pair_counting: PairCounting,
    /// Enables per-iteration logging through the `log` facade.
    pub show_progress: bool,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Reads a JSON encoded configuration; absent fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw =
            fs::read_to_string(path).map_err(|err| TextBpeError::io(err, Some(path.into())))?;
        let mut cfg: TrainerConfig = serde_json::from_str(&raw)?;
        special_tokens::dedup_in_place(&mut cfg.special_tokens);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates the invariants required for training.
    ///
    /// A target smaller than the seeded vocabulary is accepted: training then
    /// returns the seed unchanged.
    pub fn validate(&self) -> Result<()> {
        if self.min_frequency == 0 {
            return Err(TextBpeError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        let max_vocab = usize::try_from(u32::MAX).unwrap_or(usize::MAX);
        if self.target_vocab_size > max_vocab {
            return Err(TextBpeError::InvalidConfig(format!(
                "target_vocab_size ({}) exceeds {max_vocab}, the maximum representable TokenId",
                self.target_vocab_size
            )));
        }
        if let Some(position) = self.special_tokens.iter().position(String::is_empty) {
            return Err(TextBpeError::InvalidConfig(format!(
                "special token at position {position} is empty"
            )));
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            target_vocab_size: 10_000,
            special_tokens: vec!["<|endoftext|>".into()],
            min_frequency: 1,
            max_merge_iterations: None,
            pair_counting: PairCounting::default(),
            show_progress: true,
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the desired vocabulary size (including special and byte tokens).
    #[must_use]
    pub fn target_vocab_size(mut self, value: usize) -> Self {
        self.cfg.target_vocab_size = value;
        self
    }

    /// Overrides the ordered set of special tokens.
    #[must_use]
    pub fn special_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.special_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the minimum merge frequency.
    #[must_use]
    pub fn min_frequency(mut self, value: usize) -> Self {
        self.cfg.min_frequency = value;
        self
    }

    /// Sets a hard merge iteration limit.
    #[must_use]
    pub fn max_merge_iterations(mut self, value: Option<usize>) -> Self {
        self.cfg.max_merge_iterations = value;
        self
    }

    /// Selects the pair counting strategy.
    #[must_use]
    pub fn pair_counting(mut self, value: PairCounting) -> Self {
        self.cfg.pair_counting = value;
        self
    }

    /// Enables or disables per-iteration logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(mut self) -> Result<TrainerConfig> {
        special_tokens::dedup_in_place(&mut self.cfg.special_tokens);
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

impl From<TrainerConfig> for TrainerBuilder {
    fn from(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }
}

/// Configuration controlling how text corpora are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Creates a new builder with [`IngestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}
