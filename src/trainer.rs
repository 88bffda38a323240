//! Core training loop producing the vocabulary table and merge list.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::bytes::{render_merge, render_symbol};
use crate::config::{IngestConfig, TrainerBuilder, TrainerConfig};
use crate::corpus::{load_text, load_text_corpus};
use crate::error::{Result, TextBpeError};
use crate::metrics::{IterationMetrics, StopReason, TrainingMetrics};
use crate::model::{BpeModel, MergeList, VocabMap};
use crate::pretokenize::{PreTokenizer, Pretoken};
use crate::vocab::{MergeRule, Vocabulary};

mod counter;
mod symbols;
mod word;

use counter::PairCounter;
use symbols::SymbolTable;
use word::PretokenTable;

/// High-level façade configuring and executing BPE training runs.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
}

/// Artifacts returned after a training session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct TrainerArtifacts {
    /// Trained BPE model.
    pub model: BpeModel,
    /// Detailed metrics captured during training.
    pub metrics: TrainingMetrics,
}

impl Trainer {
    /// Creates a new trainer for the supplied configuration.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`TrainerBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Builds the pre-tokenizer matching this trainer's special tokens.
    pub fn pre_tokenizer(&self) -> Result<PreTokenizer> {
        PreTokenizer::new(&self.cfg.special_tokens)
    }

    /// Trains on text files discovered according to [`IngestConfig`].
    ///
    /// Every file is pre-tokenized on its own, so file ends act as segment boundaries.
    pub fn train_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<TrainerArtifacts> {
        let documents = load_text_corpus(inputs, ingest)?;
        self.train_from_texts(&documents)
    }

    /// Trains on a single in-memory text.
    pub fn train_from_text(&self, text: &str) -> Result<TrainerArtifacts> {
        self.train_from_texts(&[text])
    }

    /// Trains on several in-memory documents.
    pub fn train_from_texts<S: AsRef<str>>(&self, texts: &[S]) -> Result<TrainerArtifacts> {
        self.cfg.validate()?;
        let pre_tokenizer = self.pre_tokenizer()?;
        let mut segment_counts: FxHashMap<&str, usize> = FxHashMap::default();
        for text in texts {
            for (segment, count) in pre_tokenizer.count_segments(text.as_ref())? {
                *segment_counts.entry(segment).or_insert(0) += count;
            }
        }
        debug!(
            "pre-tokenized {} documents into {} distinct segments ({} total)",
            texts.len(),
            segment_counts.len(),
            segment_counts.values().sum::<usize>()
        );
        let table = PretokenTable::from_segments(
            segment_counts
                .iter()
                .map(|(segment, &count)| (segment.as_bytes(), count)),
        );
        self.run(table, SymbolTable::with_byte_alphabet())
    }

    /// Trains directly on a pretoken frequency table.
    ///
    /// Pretokens may already contain multi-byte symbols; symbols are identified by their
    /// bytes. Entries with a zero count are ignored. An empty symbol is rejected with
    /// [`TextBpeError::InvalidConfig`].
    pub fn train_from_pretokens(
        &self,
        pretokens: &FxHashMap<Pretoken, usize>,
    ) -> Result<TrainerArtifacts> {
        self.cfg.validate()?;
        let mut symbols = SymbolTable::with_byte_alphabet();
        let mut entries = Vec::with_capacity(pretokens.len());
        for (pretoken, &count) in pretokens {
            let ids = pretoken
                .iter()
                .map(|symbol| {
                    if symbol.is_empty() {
                        return Err(TextBpeError::InvalidConfig(format!(
                            "pretoken {} contains an empty symbol",
                            render_pretoken(pretoken)
                        )));
                    }
                    symbols.intern(symbol)
                })
                .collect::<Result<Vec<_>>>()?;
            entries.push((ids, count));
        }
        self.run(PretokenTable::from_symbols(entries), symbols)
    }

    fn run(&self, mut table: PretokenTable, mut symbols: SymbolTable) -> Result<TrainerArtifacts> {
        let cfg = &self.cfg;
        let mut vocab = Vocabulary::seeded(&cfg.special_tokens);
        let budget = cfg.target_vocab_size.saturating_sub(vocab.len());
        let mut merges: Vec<MergeRule> = Vec::with_capacity(budget.min(1 << 20));
        let mut metrics = TrainingMetrics::new(budget.min(16_384));
        metrics.initial_pretokens = table.len();
        debug!(
            "training on {} distinct pretokens ({} occurrences); seed vocab {} target {}",
            table.len(),
            table.total_count(),
            vocab.len(),
            cfg.target_vocab_size
        );
        let training_start = Instant::now();

        let mut counter = PairCounter::new(cfg.pair_counting, &table, &symbols);
        let mut stop_reason = StopReason::TargetVocabReached;

        while vocab.len() < cfg.target_vocab_size {
            if cfg
                .max_merge_iterations
                .is_some_and(|max_iters| merges.len() >= max_iters)
            {
                stop_reason = StopReason::MaxIterationsReached;
                break;
            }

            let iteration_start = Instant::now();
            let Some((pair, frequency)) = counter.best(&table, &symbols) else {
                stop_reason = StopReason::NoPairsRemaining;
                break;
            };
            if frequency < cfg.min_frequency {
                stop_reason = StopReason::BelowMinFrequency;
                break;
            }

            let rule = MergeRule::new(
                symbols.bytes(pair.0).to_vec(),
                symbols.bytes(pair.1).to_vec(),
            );
            let replacement = symbols.fuse(pair)?;
            let rewritten = counter.apply_merge(&mut table, pair, replacement, &symbols);
            vocab.push(rule.merged())?;
            let iteration = merges.len() + 1;

            if cfg.show_progress {
                info!(
                    "iter {:>6} freq {:>8} rewritten {:>8} distinct_pairs {:>8} vocab {:>8} merge {}",
                    iteration,
                    frequency,
                    rewritten,
                    counter.distinct_pairs(),
                    vocab.len(),
                    render_merge(&rule.left, &rule.right)
                );
            }
            merges.push(rule);

            metrics.iterations.push(IterationMetrics {
                iteration,
                best_frequency: frequency,
                pretokens_rewritten: rewritten,
                distinct_pairs: counter.distinct_pairs(),
                vocab_size: vocab.len(),
                elapsed_iteration: iteration_start.elapsed(),
            });
        }

        metrics.stop_reason = stop_reason;
        metrics.total_duration = training_start.elapsed();

        if cfg.show_progress {
            info!(
                "completed {} merges in {:.2?}; vocab size {} ({:?})",
                merges.len(),
                metrics.total_duration,
                vocab.len(),
                metrics.stop_reason
            );
        }

        let model = BpeModel::new(vocab, merges, cfg.special_tokens.clone());
        Ok(TrainerArtifacts { model, metrics })
    }
}

/// Trains a vocabulary from the UTF-8 text file at `input_path`.
///
/// Returns the id → bytes vocabulary and the merges in the order they were learned.
/// The vocabulary may end up smaller than `vocab_size` when the corpus runs out of pairs.
pub fn train_bpe<P, S>(
    input_path: P,
    vocab_size: usize,
    special_tokens: &[S],
) -> Result<(VocabMap, MergeList)>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let cfg = TrainerConfig::builder()
        .target_vocab_size(vocab_size)
        .special_tokens(special_tokens.iter().map(|token| token.as_ref().to_owned()))
        .show_progress(false)
        .build()?;
    let text = load_text(input_path)?;
    let artifacts = Trainer::new(cfg).train_from_text(&text)?;
    Ok(artifacts.model.into_parts())
}

fn render_pretoken(pretoken: &Pretoken) -> String {
    let symbols: Vec<String> = pretoken
        .iter()
        .map(|symbol| format!("\"{}\"", render_symbol(symbol)))
        .collect();
    format!("[{}]", symbols.join(", "))
}

impl fmt::Display for TrainerArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BPE model with vocab size {}", self.model.vocab_size())?;
        writeln!(f, "Merges: {}", self.model.merges().len())?;
        writeln!(f, "Stop reason: {:?}", self.metrics.stop_reason)?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
