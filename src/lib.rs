//! Byte pair encoding (BPE) vocabulary training for UTF-8 text.
//!
//! The crate exposes both a library API and a `textbpe` command line interface.
//! Training pre-tokenizes the corpus with a GPT-2 style pattern, treats special
//! tokens as hard segment boundaries, and then learns merges over raw bytes until
//! the target vocabulary size is reached or no pair remains.
//!
//! ```no_run
//! use textbpe::{IngestConfig, Trainer, TrainerConfig};
//!
//! # fn main() -> textbpe::Result<()> {
//! let trainer_cfg = TrainerConfig::builder()
//!     .target_vocab_size(10_000)
//!     .special_tokens(["<|endoftext|>"])
//!     .show_progress(false)
//!     .build()?;
//! let trainer = Trainer::new(trainer_cfg);
//! let artifacts = trainer.train_from_paths(&["/path/to/corpus"], &IngestConfig::default())?;
//! let (vocab, merges) = artifacts.model.into_parts();
//! println!("{} tokens, {} merges", vocab.len(), merges.len());
//! # Ok(())
//! # }
//! ```
//!
//! For the common single-file case [`train_bpe`] returns the vocabulary map and
//! merge list directly.
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting the
//! library portion only can disable default features to avoid the CLI
//! dependencies: `textbpe = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod bytes;
pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pretokenize;
pub mod special_tokens;
pub mod trainer;
pub mod vocab;

pub use config::{IngestConfig, PairCounting, TrainerBuilder, TrainerConfig};
pub use error::{Result, TextBpeError};
pub use metrics::{IterationMetrics, StopReason, TrainingMetrics};
pub use model::{BpeModel, MergeList, VocabMap};
pub use pretokenize::{pre_tokenize, PreTokenizer, Pretoken};
pub use trainer::{train_bpe, Trainer, TrainerArtifacts};
pub use vocab::{MergeRule, TokenId, Vocabulary};
