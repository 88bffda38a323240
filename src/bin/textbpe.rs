use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::ThreadPoolBuilder;
use serde_json::json;
use textbpe::bytes::{render_merge, render_symbol};
use textbpe::config::{IngestConfig, PairCounting, TrainerBuilder, TrainerConfig};
use textbpe::corpus::load_text;
use textbpe::{PreTokenizer, Trainer, TrainerArtifacts};

const DEFAULT_SHOWN_MERGES: usize = 10;

#[derive(Parser, Debug)]
#[command(author, version, about = "Byte pair encoding trainer for text corpora", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train merges on text files and print a summary
    Train(TrainArgs),
    /// Print the segments produced by the pre-tokenizer
    Pretokenize(PretokenizeArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PairCountingArg {
    Incremental,
    FullRescan,
}

impl From<PairCountingArg> for PairCounting {
    fn from(value: PairCountingArg) -> Self {
        match value {
            PairCountingArg::Incremental => PairCounting::Incremental,
            PairCountingArg::FullRescan => PairCounting::FullRescan,
        }
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON trainer configuration; explicit flags take precedence
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Target vocabulary size
    #[arg(long, value_name = "SIZE")]
    vocab_size: Option<usize>,

    /// Special tokens, in id order (repeat flag); replaces the default set
    #[arg(long = "special-token", value_name = "TOKEN")]
    special_tokens: Vec<String>,

    /// Train without any special tokens
    #[arg(long, conflicts_with = "special_tokens")]
    no_special_tokens: bool,

    /// Minimum frequency for merges
    #[arg(long, value_name = "COUNT")]
    min_frequency: Option<usize>,

    /// Maximum merge iterations
    #[arg(long, value_name = "COUNT")]
    max_merge_iterations: Option<usize>,

    /// Pair counting strategy
    #[arg(long, value_enum)]
    pair_counting: Option<PairCountingArg>,

    /// Disable per-iteration logging/progress
    #[arg(long)]
    no_progress: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,

    /// Emit the summary as JSON
    #[arg(long)]
    json: bool,

    /// Number of leading merges to include in the summary
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SHOWN_MERGES)]
    show_merges: usize,
}

#[derive(Args, Debug)]
struct PretokenizeArgs {
    /// UTF-8 text file to segment
    input: PathBuf,

    /// Special tokens treated as boundaries (repeat flag)
    #[arg(long = "special-token", value_name = "TOKEN")]
    special_tokens: Vec<String>,

    /// Emit a JSON array instead of one segment per line
    #[arg(long)]
    json: bool,

    /// Print at most N segments
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Pretokenize(args) => run_pretokenize(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn trainer_config(args: &TrainArgs) -> Result<TrainerConfig> {
    let mut cfg = match &args.config {
        Some(path) => TrainerBuilder::from(
            TrainerConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
        ),
        None => TrainerConfig::builder(),
    };
    if let Some(vocab_size) = args.vocab_size {
        cfg = cfg.target_vocab_size(vocab_size);
    }
    if args.no_special_tokens {
        cfg = cfg.special_tokens(Vec::<String>::new());
    } else if !args.special_tokens.is_empty() {
        cfg = cfg.special_tokens(args.special_tokens.clone());
    }
    if let Some(min_frequency) = args.min_frequency {
        cfg = cfg.min_frequency(min_frequency);
    }
    if args.max_merge_iterations.is_some() {
        cfg = cfg.max_merge_iterations(args.max_merge_iterations);
    }
    if let Some(strategy) = args.pair_counting {
        cfg = cfg.pair_counting(strategy.into());
    }
    if args.no_progress {
        cfg = cfg.show_progress(false);
    }
    Ok(cfg.build()?)
}

fn run_train(args: TrainArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    let trainer_cfg = trainer_config(&args)?;
    let ingest_cfg = IngestConfig::builder()
        .recursive(!args.no_recursive)
        .follow_symlinks(args.follow_symlinks)
        .build();

    let spinner = if trainer_cfg.show_progress && !args.json {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} training merges... {elapsed}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    } else {
        None
    };

    let trainer = Trainer::new(trainer_cfg);
    let artifacts = trainer
        .train_from_paths(&args.inputs, &ingest_cfg)
        .context("training failed")?;
    if let Some(pb) = spinner {
        pb.finish_with_message("training complete");
    }

    info!(
        "training complete: merges={} vocab={} duration={:.2?}",
        artifacts.model.merges().len(),
        artifacts.model.vocab_size(),
        artifacts.metrics.total_duration
    );

    if args.json {
        print_json_summary(&artifacts, args.show_merges)
    } else {
        print_summary(&artifacts, args.show_merges);
        Ok(())
    }
}

fn print_summary(artifacts: &TrainerArtifacts, show_merges: usize) {
    print!("{artifacts}");
    let metrics = &artifacts.metrics;
    println!("Initial pretokens: {}", metrics.initial_pretokens);
    println!("Pretoken rewrites: {}", metrics.total_rewrites());
    if let Some(frequency) = metrics.final_frequency() {
        println!("Final merge frequency: {frequency}");
    }
    if let Some(slowest) = metrics.slowest_iteration() {
        println!(
            "Slowest merge: #{} ({:.2?})",
            slowest.iteration, slowest.elapsed_iteration
        );
    }
    let merges = artifacts.model.merges();
    if show_merges > 0 && !merges.is_empty() {
        println!("First merges:");
        for (idx, rule) in merges.iter().take(show_merges).enumerate() {
            println!("  {:>5}  {}", idx + 1, render_merge(&rule.left, &rule.right));
        }
    }
}

fn print_json_summary(artifacts: &TrainerArtifacts, show_merges: usize) -> Result<()> {
    let merges: Vec<_> = artifacts
        .model
        .merges()
        .iter()
        .take(show_merges)
        .map(|rule| {
            json!({
                "left": render_symbol(&rule.left),
                "right": render_symbol(&rule.right),
            })
        })
        .collect();
    let summary = json!({
        "vocab_size": artifacts.model.vocab_size(),
        "merges": artifacts.model.merges().len(),
        "special_tokens": artifacts.model.special_tokens(),
        "stop_reason": artifacts.metrics.stop_reason,
        "initial_pretokens": artifacts.metrics.initial_pretokens,
        "duration_ms": artifacts.metrics.total_duration.as_millis(),
        "final_frequency": artifacts.metrics.final_frequency(),
        "pretoken_rewrites": artifacts.metrics.total_rewrites(),
        "first_merges": merges,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_pretokenize(args: PretokenizeArgs) -> Result<()> {
    let text = load_text(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let pre_tokenizer = PreTokenizer::new(&args.special_tokens)?;
    let mut segments = pre_tokenizer.segments(&text)?;
    if let Some(limit) = args.limit {
        segments.truncate(limit);
    }

    if args.json {
        println!("{}", serde_json::to_string(&segments)?);
    } else {
        for segment in &segments {
            println!("{segment:?}");
        }
    }
    Ok(())
}
