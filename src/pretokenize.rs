//! Pre-tokenization: splitting raw text into the word-like segments merges operate on.
//!
//! Text is first cut at special-token boundaries (the tokens themselves are dropped),
//! then every remaining chunk is split with [`PRETOKENIZE_PATTERN`]. Each resulting
//! segment becomes a pretoken: the tuple of its UTF-8 bytes, one symbol per byte.

use fancy_regex::Regex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::special_tokens;

/// Byte symbol sequence for a single segment.
pub type Pretoken = Vec<Vec<u8>>;

/// GPT-2 style segmentation grammar.
///
/// Alternatives in order: contraction suffixes, letter runs, number runs and
/// punctuation runs (each with an optional leading space), whitespace not followed
/// by a non-whitespace character, and any remaining whitespace run.
pub const PRETOKENIZE_PATTERN: &str =
    r"'(?:[sdmt]|ll|ve|re)| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Compiled pre-tokenizer for a fixed set of special tokens.
#[derive(Debug, Clone)]
pub struct PreTokenizer {
    word_re: Regex,
    special_re: Option<Regex>,
}

impl PreTokenizer {
    /// Compiles the segmentation pattern and a boundary matcher for `special_tokens`.
    ///
    /// Longer special tokens take priority over shorter ones sharing a prefix.
    pub fn new<S: AsRef<str>>(special_tokens: &[S]) -> Result<Self> {
        let word_re = Regex::new(PRETOKENIZE_PATTERN)?;
        let ordered = special_tokens::by_match_priority(special_tokens);
        let special_re = if ordered.is_empty() {
            None
        } else {
            let union = ordered
                .iter()
                .map(|token| fancy_regex::escape(token))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&union)?)
        };
        Ok(Self {
            word_re,
            special_re,
        })
    }

    /// Splits `text` at special-token occurrences, dropping the tokens and empty chunks.
    pub fn chunks<'t>(&self, text: &'t str) -> Result<Vec<&'t str>> {
        let Some(special_re) = &self.special_re else {
            return Ok(if text.is_empty() { Vec::new() } else { vec![text] });
        };
        let mut chunks = Vec::new();
        let mut start = 0usize;
        for found in special_re.find_iter(text) {
            let found = found?;
            if found.start() > start {
                chunks.push(&text[start..found.start()]);
            }
            start = found.end();
        }
        if start < text.len() {
            chunks.push(&text[start..]);
        }
        Ok(chunks)
    }

    /// Returns every segment of `text`, in left-to-right order.
    pub fn segments<'t>(&self, text: &'t str) -> Result<Vec<&'t str>> {
        let mut segments = Vec::new();
        for chunk in self.chunks(text)? {
            self.extend_segments(chunk, &mut segments)?;
        }
        Ok(segments)
    }

    /// Counts segment occurrences in `text`.
    ///
    /// Chunks are split in parallel; the counts do not depend on chunk order.
    pub fn count_segments<'t>(&self, text: &'t str) -> Result<FxHashMap<&'t str, usize>> {
        self.chunks(text)?
            .into_par_iter()
            .map(|chunk| -> Result<FxHashMap<&'t str, usize>> {
                let mut local = FxHashMap::default();
                for found in self.word_re.find_iter(chunk) {
                    *local.entry(found?.as_str()).or_insert(0) += 1;
                }
                Ok(local)
            })
            .try_reduce(FxHashMap::default, |mut acc, local| {
                for (segment, count) in local {
                    *acc.entry(segment).or_insert(0) += count;
                }
                Ok(acc)
            })
    }

    fn extend_segments<'t>(&self, chunk: &'t str, out: &mut Vec<&'t str>) -> Result<()> {
        for found in self.word_re.find_iter(chunk) {
            out.push(found?.as_str());
        }
        Ok(())
    }
}

/// Splits `text` into segments, treating `special_tokens` as pure boundaries.
pub fn pre_tokenize<'t, S: AsRef<str>>(
    text: &'t str,
    special_tokens: &[S],
) -> Result<Vec<&'t str>> {
    PreTokenizer::new(special_tokens)?.segments(text)
}

/// Converts a segment into its byte-level pretoken.
#[must_use]
pub fn segment_to_pretoken(segment: &str) -> Pretoken {
    segment.bytes().map(|byte| vec![byte]).collect()
}

/// Builds the pretoken frequency table for a sequence of segments.
pub fn count_pretokens<'a, I>(segments: I) -> FxHashMap<Pretoken, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_segment: FxHashMap<&str, usize> = FxHashMap::default();
    for segment in segments {
        *by_segment.entry(segment).or_insert(0) += 1;
    }
    by_segment
        .into_iter()
        .map(|(segment, count)| (segment_to_pretoken(segment), count))
        .collect()
}
