use std::fs;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use textbpe::pretokenize::count_pretokens;
use textbpe::{
    pre_tokenize, train_bpe, MergeList, PairCounting, StopReason, TextBpeError, Trainer,
    TrainerArtifacts, TrainerConfig, VocabMap,
};

fn train(text: &str, vocab_size: usize, specials: &[&str]) -> TrainerArtifacts {
    train_with(text, vocab_size, specials, PairCounting::Incremental)
}

fn train_with(
    text: &str,
    vocab_size: usize,
    specials: &[&str],
    counting: PairCounting,
) -> TrainerArtifacts {
    let cfg = TrainerConfig::builder()
        .target_vocab_size(vocab_size)
        .special_tokens(specials.iter().copied())
        .pair_counting(counting)
        .show_progress(false)
        .build()
        .expect("valid config");
    Trainer::new(cfg).train_from_text(text).expect("training")
}

fn parts(artifacts: TrainerArtifacts) -> (VocabMap, MergeList) {
    artifacts.model.into_parts()
}

fn pair(left: &str, right: &str) -> (Vec<u8>, Vec<u8>) {
    (left.as_bytes().to_vec(), right.as_bytes().to_vec())
}

fn random_corpus(seed: u64, documents: usize) -> Vec<String> {
    const STEMS: &[&str] = &[
        "low", "lower", "newest", "widest", "the", "then", "there", "aa", "ab", "ba", "é", "naïve",
        "don't", "we'll", "42", "007", "?!", "--",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    (0..documents)
        .map(|_| {
            let words = rng.gen_range(0..60);
            let mut text = String::new();
            for _ in 0..words {
                match rng.gen_range(0..10) {
                    0 => text.push_str("  "),
                    1 => text.push('\n'),
                    2 => text.push_str("<|endoftext|>"),
                    _ => text.push(' '),
                }
                text.push_str(STEMS[rng.gen_range(0..STEMS.len())]);
                if rng.gen_bool(0.2) {
                    text.push(char::from(rng.gen_range(b'a'..=b'z')));
                }
            }
            text
        })
        .collect()
}

#[test]
fn low_lower_widest_learns_five_merges() {
    let (vocab, merges) = parts(train("low lower widest", 261, &[]));
    assert_eq!(vocab.len(), 261);
    assert_eq!(
        merges,
        vec![
            pair("o", "w"),
            pair("l", "ow"),
            pair("w", "i"),
            pair("wi", "d"),
            pair("wid", "e"),
        ]
    );
    assert_eq!(vocab[&256], b"ow".to_vec());
    assert_eq!(vocab[&260], b"wide".to_vec());
}

#[test]
fn ties_choose_the_greater_pair() {
    let (vocab, merges) = parts(train("ab cd", 257, &[]));
    assert_eq!(merges, vec![pair("c", "d")]);
    assert_eq!(vocab[&256], b"cd".to_vec());
}

#[test]
fn higher_counts_win_before_tie_breaks() {
    let (_, merges) = parts(train("the the the cat", 257, &[]));
    assert_eq!(merges, vec![pair("t", "h")]);
}

#[test]
fn special_tokens_are_boundaries() {
    let segments = pre_tokenize("a<SEP>b", &["<SEP>"]).expect("pre-tokenize");
    assert_eq!(segments, vec!["a", "b"]);

    // No pair spans the special token, so nothing can be merged.
    let artifacts = train("a<SEP>b", 300, &["<SEP>"]);
    assert!(artifacts.model.merges().is_empty());
    assert_eq!(artifacts.metrics.stop_reason, StopReason::NoPairsRemaining);
    let (vocab, _) = parts(artifacts);
    assert_eq!(vocab[&0], b"<SEP>".to_vec());
    assert_eq!(vocab.len(), 257);
}

#[test]
fn longer_special_token_takes_priority() {
    let segments = pre_tokenize("x<a>by", &["<a>", "<a>b"]).expect("pre-tokenize");
    assert_eq!(segments, vec!["x", "y"]);
}

#[test]
fn empty_corpus_returns_the_seed() {
    let artifacts = train("", 300, &["<|endoftext|>"]);
    assert_eq!(artifacts.metrics.stop_reason, StopReason::NoPairsRemaining);
    let (vocab, merges) = parts(artifacts);
    assert!(merges.is_empty());
    assert_eq!(vocab.len(), 257);
    assert_eq!(vocab[&0], b"<|endoftext|>".to_vec());
    assert_eq!(vocab[&1], vec![0u8]);
    assert_eq!(vocab[&256], vec![255u8]);
}

#[test]
fn training_is_deterministic() {
    let corpus = random_corpus(7, 1).join("");
    let first = parts(train(&corpus, 330, &["<|endoftext|>"]));
    let second = parts(train(&corpus, 330, &["<|endoftext|>"]));
    assert_eq!(first, second);
}

#[test]
fn vocabulary_ids_are_contiguous_and_sized_by_merges() {
    let corpus = "hi! hi! high! hit!";
    let artifacts = train(corpus, 280, &["!"]);
    let skipped = artifacts.model.vocab().skipped_bytes();
    assert_eq!(skipped, 1);
    let (vocab, merges) = parts(artifacts);
    assert_eq!(vocab.len(), 1 + 256 - skipped + merges.len());
    assert!(vocab.keys().copied().eq(0..vocab.len() as u32));
    assert_eq!(vocab[&0], b"!".to_vec());
    assert_eq!(vocab.values().filter(|bytes| bytes.as_slice() == b"!").count(), 1);
    for (idx, (left, right)) in merges.iter().enumerate() {
        let mut merged = left.clone();
        merged.extend_from_slice(right);
        assert_eq!(vocab[&((256 + idx) as u32)], merged);
    }
}

#[test]
fn incremental_and_full_rescan_agree_on_random_corpora() {
    for seed in [1u64, 2, 3, 42] {
        let documents = random_corpus(seed, 12);
        let mut runs = [PairCounting::Incremental, PairCounting::FullRescan]
            .into_iter()
            .map(|counting| {
                let cfg = TrainerConfig::builder()
                    .target_vocab_size(420)
                    .pair_counting(counting)
                    .show_progress(false)
                    .build()
                    .expect("valid config");
                Trainer::new(cfg)
                    .train_from_texts(&documents)
                    .expect("training")
            });
        let incremental = runs.next().expect("incremental run");
        let full = runs.next().expect("full rescan run");
        assert_eq!(
            incremental.model.merges(),
            full.model.merges(),
            "seed {seed}"
        );
        assert_eq!(incremental.model, full.model, "seed {seed}");
        assert_eq!(incremental.metrics.stop_reason, full.metrics.stop_reason);
    }
}

#[test]
fn derived_model_matches_training_with_smaller_target() {
    let corpus = random_corpus(11, 4).join("\n");
    let full = train(&corpus, 360, &["<|endoftext|>"]);
    let smaller = full.model.vocab_size().min(300);
    let derived = full.model.derive_with_vocab(smaller).expect("derive");
    let direct = train(&corpus, smaller, &["<|endoftext|>"]);
    assert_eq!(derived.into_parts(), direct.model.into_parts());
}

#[test]
fn pretoken_counts_train_like_raw_text() {
    let specials = ["<|endoftext|>"];
    let text = random_corpus(5, 3).join("<|endoftext|>");
    let segments = pre_tokenize(&text, &specials).expect("pre-tokenize");
    let pretokens = count_pretokens(segments.iter().copied());

    let cfg = TrainerConfig::builder()
        .target_vocab_size(340)
        .special_tokens(specials)
        .show_progress(false)
        .build()
        .expect("valid config");
    let trainer = Trainer::new(cfg);
    let from_pretokens = trainer.train_from_pretokens(&pretokens).expect("training");
    let from_text = trainer.train_from_text(&text).expect("training");

    assert!(!from_text.model.merges().is_empty());
    assert_eq!(from_pretokens.model, from_text.model);
    assert_eq!(
        from_pretokens.metrics.initial_pretokens,
        from_text.metrics.initial_pretokens
    );
}

#[test]
fn pretokens_with_empty_symbols_are_rejected() {
    let mut pretokens = rustc_hash::FxHashMap::default();
    pretokens.insert(vec![b"a".to_vec(), Vec::new(), b"b".to_vec()], 3);
    let err = Trainer::new(TrainerConfig::default())
        .train_from_pretokens(&pretokens)
        .expect_err("empty symbol");
    assert!(matches!(err, TextBpeError::InvalidConfig(_)));
}

#[test]
fn documents_do_not_share_pairs_across_file_ends() {
    let cfg = TrainerConfig::builder()
        .target_vocab_size(300)
        .special_tokens(Vec::<String>::new())
        .show_progress(false)
        .build()
        .expect("valid config");
    let artifacts = Trainer::new(cfg)
        .train_from_texts(&["a", "b"])
        .expect("training");
    assert!(artifacts.model.merges().is_empty());
}

#[test]
fn train_bpe_reads_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.txt");
    fs::write(&path, "low lower widest<|endoftext|>low").expect("write corpus");

    let (vocab, merges) = train_bpe(&path, 262, &["<|endoftext|>"]).expect("train");
    assert_eq!(vocab.len(), 262);
    assert_eq!(merges.len(), 5);
    assert_eq!(vocab[&0], b"<|endoftext|>".to_vec());
    assert_eq!(merges[0], pair("o", "w"));
}

#[test]
fn train_bpe_rejects_invalid_utf8() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.bin");
    fs::write(&path, [b'o', 0xc3, 0x28, b'k']).expect("write corpus");

    let err = train_bpe(&path, 300, &["<|endoftext|>"]).expect_err("invalid utf-8");
    assert!(matches!(err, TextBpeError::Utf8 { .. }));
}

#[test]
fn train_from_paths_rejects_missing_inputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let trainer = Trainer::new(TrainerConfig::default());
    let err = trainer
        .train_from_paths(&[dir.path().join("missing")], &Default::default())
        .expect_err("missing input");
    assert!(matches!(err, TextBpeError::InvalidConfig(_)));
}
