//! Per-merge statistics and the reason a run ended.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why the merge loop stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The vocabulary reached its target size, or the seed already did.
    TargetVocabReached,
    /// No pretoken has two or more symbols left.
    NoPairsRemaining,
    /// The best pair occurred fewer than `min_frequency` times.
    BelowMinFrequency,
    /// `max_merge_iterations` merges were learned.
    MaxIterationsReached,
}

/// Statistics for one learned merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationMetrics {
    /// 1-based merge number.
    pub iteration: usize,
    /// Corpus count of the merged pair.
    pub best_frequency: usize,
    /// Distinct pretokens rewritten by the merge.
    pub pretokens_rewritten: usize,
    /// Distinct pairs with a positive count, as seen by the pair counter.
    pub distinct_pairs: usize,
    /// Vocabulary size once the merge was added.
    pub vocab_size: usize,
    /// Wall time spent selecting and applying the merge.
    pub elapsed_iteration: Duration,
}

/// Summary of a training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingMetrics {
    /// One entry per learned merge, in merge order.
    pub iterations: Vec<IterationMetrics>,
    /// Distinct pretokens before the first merge.
    pub initial_pretokens: usize,
    /// Wall time of the merge loop.
    pub total_duration: Duration,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
}

impl TrainingMetrics {
    /// Creates an empty record with room for `capacity` merges.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            iterations: Vec::with_capacity(capacity),
            initial_pretokens: 0,
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
        }
    }

    /// Count of the last merged pair, if any merge was learned.
    #[must_use]
    pub fn final_frequency(&self) -> Option<usize> {
        self.iterations.last().map(|iter| iter.best_frequency)
    }

    /// Sum of distinct pretokens rewritten over all merges.
    #[must_use]
    pub fn total_rewrites(&self) -> usize {
        self.iterations
            .iter()
            .map(|iter| iter.pretokens_rewritten)
            .sum()
    }

    /// The merge that took the longest wall time.
    #[must_use]
    pub fn slowest_iteration(&self) -> Option<&IterationMetrics> {
        self.iterations
            .iter()
            .max_by_key(|iter| iter.elapsed_iteration)
    }
}
