use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind};
use tracing::info;

use crate::config::PipelineConfig;
use crate::constants::export::{
    CHUNKS_FILENAME, EXAMPLES_FILENAME, KEYWORD_SPANS_FILENAME, LINE_STATS_FILENAME,
    SCORES_FILENAME, SFT_FILENAME, SUMMARY_FILENAME, TOKEN_RECORDS_FILENAME,
};
use crate::constants::oracle::{DEFAULT_TIMEOUT_SECS, IVERILOG_PROGRAM};
use crate::data::{Dimension, SourceFile};
use crate::export::{materialize_split, write_chunks, write_examples, write_json, write_jsonl, write_sft};
use crate::metrics::{ScoreSummary, SeriesSummary, score_summary};
use crate::oracle::IverilogValidator;
use crate::permute::ByteTokenizer;
use crate::pipeline::{CorpusPipeline, RunSummary};
use crate::splits::{CorpusSplit, SplitLabel};
use crate::transport::{CorpusReader, CorpusScan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SplitArg {
    Eval,
    Train,
    All,
}

impl SplitArg {
    fn label(self) -> Option<SplitLabel> {
        match self {
            SplitArg::Eval => Some(SplitLabel::Eval),
            SplitArg::Train => Some(SplitLabel::Train),
            SplitArg::All => None,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "fimcorpus",
    disable_help_subcommand = true,
    about = "Score HDL corpora and sample fill-in-the-middle training data",
    long_about = "Rank HDL source files by heuristic quality, bucket them into eval/train splits, and cut the accepted files into prefix/middle/suffix examples.",
    after_help = "Logging follows RUST_LOG (default: info)."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score and rank every file under the input directory.
    Score(ScoreArgs),
    /// Score, then chunk and mask the accepted files.
    Generate(GenerateArgs),
    /// Emit token-level FIM permutations of every decoded file.
    Permute(CommonArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    #[arg(long, value_name = "DIR", help = "Corpus root directory")]
    input: PathBuf,
    #[arg(long, value_name = "DIR", help = "Directory output files are written to")]
    output: PathBuf,
    #[arg(
        long,
        value_name = "JSON",
        help = "Optional pipeline config; missing keys keep their defaults"
    )]
    config: Option<PathBuf>,
    #[arg(long, help = "Optional deterministic seed override")]
    seed: Option<u64>,
    #[arg(long = "no-recursive", help = "Only read files directly under --input")]
    no_recursive: bool,
    #[arg(long = "follow-symlinks", help = "Follow symlinked files and directories")]
    follow_symlinks: bool,
}

#[derive(Debug, Args)]
struct ScoringArgs {
    #[arg(long, help = "Check syntax with iverilog for the compiles dimension")]
    iverilog: bool,
    #[arg(
        long = "iverilog-program",
        value_name = "PATH",
        default_value = IVERILOG_PROGRAM,
        help = "iverilog executable used with --iverilog"
    )]
    iverilog_program: PathBuf,
    #[arg(
        long = "include-dir",
        value_name = "DIR",
        help = "Include directory passed to iverilog, repeat as needed"
    )]
    include_dirs: Vec<PathBuf>,
    #[arg(
        long = "timeout-secs",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = parse_positive_u64,
        help = "Per-file iverilog timeout"
    )]
    timeout_secs: u64,
    #[arg(long, help = "Optional acceptance threshold override")]
    threshold: Option<f64>,
}

#[derive(Debug, Args)]
struct ScoreArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    scoring: ScoringArgs,
    #[arg(
        long,
        help = "Copy eval/train files into <output>/eval and <output>/train"
    )]
    materialize: bool,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    scoring: ScoringArgs,
    #[arg(
        long,
        value_enum,
        default_value = "all",
        help = "Accepted files to sample from"
    )]
    split: SplitArg,
}

/// Run the `fimcorpus` command line (arguments exclude the program name).
pub fn run_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let Some(cli) = parse_cli::<Cli, _>(std::iter::once("fimcorpus".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    match cli.command {
        Command::Score(args) => run_score(args),
        Command::Generate(args) => run_generate(args),
        Command::Permute(args) => run_permute(args),
    }
}

fn run_score(args: ScoreArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.common, Some(&args.scoring))?;
    let pipeline = build_pipeline(config, &args.common, &args.scoring)?;
    let scan = scan_corpus(&args.common)?;

    let scoring = pipeline.score_files(&scan.files);
    let split = pipeline.bucket(scoring.accepted.clone());

    let rows = scoring.accepted.iter().chain(scoring.rejected.iter());
    let scores_path = args.common.output.join(SCORES_FILENAME);
    let written = write_jsonl(&scores_path, rows)?;
    info!(
        "[fimcorpus:cli] wrote {written} score rows to {}",
        scores_path.display()
    );
    let stats_path = args.common.output.join(LINE_STATS_FILENAME);
    let written = write_jsonl(&stats_path, pipeline.line_stats(&scan.files))?;
    info!(
        "[fimcorpus:cli] wrote {written} line-stat rows to {}",
        stats_path.display()
    );

    let mut all_scores = scoring.accepted.clone();
    all_scores.extend(scoring.rejected.iter().cloned());
    println!("=== corpus scores ===");
    println!("input: {}", args.common.input.display());
    println!(
        "files: decoded={} skipped={} excluded_line_count={} validator_failures={}",
        scan.files.len(),
        scan.skipped.len(),
        scoring.excluded.len(),
        scoring.validator_failures.len()
    );
    println!(
        "threshold: {:.2} accepted={} rejected={}",
        pipeline.config().scoring.acceptance_threshold,
        scoring.accepted.len(),
        scoring.rejected.len()
    );
    println!();
    print_score_summary(&score_summary(&all_scores));
    print_split(&split);

    if args.materialize {
        let copied = materialize_split(&split, &args.common.input, &args.common.output)?;
        println!(
            "materialized {} files under {}",
            copied.len(),
            args.common.output.display()
        );
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.common, Some(&args.scoring))?;
    let pipeline = build_pipeline(config, &args.common, &args.scoring)?;
    let scan = scan_corpus(&args.common)?;

    let run = pipeline.run_split(scan, args.split.label());
    let out = &args.common.output;
    write_chunks(&out.join(CHUNKS_FILENAME), &run.generation.chunks)?;
    write_examples(&out.join(EXAMPLES_FILENAME), &run.generation.examples)?;
    write_examples(
        &out.join(KEYWORD_SPANS_FILENAME),
        &run.generation.keyword_spans,
    )?;
    let mut sft_examples = run.generation.examples.clone();
    sft_examples.extend(run.generation.keyword_spans.iter().cloned());
    write_sft(&out.join(SFT_FILENAME), &sft_examples)?;
    write_json(&out.join(SUMMARY_FILENAME), &run.summary)?;

    println!("=== fim generation ===");
    println!("input : {}", args.common.input.display());
    println!("output: {}", out.display());
    println!("split : {:?}", args.split);
    println!();
    print_split(&run.split);
    print_run_summary(&run.summary);
    Ok(())
}

fn run_permute(args: CommonArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args, None)?;
    let pipeline = CorpusPipeline::new(config)?;
    let scan = scan_corpus(&args)?;

    let files: Vec<&SourceFile> = scan.files.iter().collect();
    let records = pipeline.permute_files(&files, &ByteTokenizer);
    let permuted = records
        .iter()
        .filter(|record| record.layout.is_some())
        .count();
    let path = args.output.join(TOKEN_RECORDS_FILENAME);
    write_jsonl(&path, &records)?;

    println!("=== token permutation ===");
    println!("files   : {}", records.len());
    println!("permuted: {permuted}");
    println!("skipped : {}", scan.skipped.len());
    println!("output  : {}", path.display());
    Ok(())
}

fn load_config(
    common: &CommonArgs,
    scoring: Option<&ScoringArgs>,
) -> Result<PipelineConfig, Box<dyn Error>> {
    let mut config = match &common.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    config.seed = common.seed.unwrap_or(config.seed);
    if let Some(threshold) = scoring.and_then(|scoring| scoring.threshold) {
        config.scoring.acceptance_threshold = threshold;
    }
    Ok(config)
}

fn build_pipeline(
    config: PipelineConfig,
    common: &CommonArgs,
    scoring: &ScoringArgs,
) -> Result<CorpusPipeline, Box<dyn Error>> {
    let pipeline = CorpusPipeline::new(config)?;
    if !scoring.iverilog {
        return Ok(pipeline);
    }
    let validator = IverilogValidator::new(&common.input)
        .with_program(&scoring.iverilog_program)
        .with_include_dirs(scoring.include_dirs.iter().cloned())
        .with_timeout(Duration::from_secs(scoring.timeout_secs));
    if !validator.is_available() {
        return Err(format!(
            "--iverilog was set but '{}' could not be run",
            scoring.iverilog_program.display()
        )
        .into());
    }
    Ok(pipeline.with_validator(Arc::new(validator)))
}

fn scan_corpus(common: &CommonArgs) -> Result<CorpusScan, Box<dyn Error>> {
    let reader = CorpusReader::new(&common.input)
        .with_recursive(!common.no_recursive)
        .with_follow_symlinks(common.follow_symlinks);
    Ok(reader.scan()?)
}

fn parse_positive_u64(raw: &str) -> Result<u64, String> {
    let parsed = raw
        .parse::<u64>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn format_series(series: Option<&SeriesSummary>) -> String {
    match series {
        Some(series) => format!(
            "count={} mean={:.2} min={:.2} max={:.2}",
            series.count, series.mean, series.min, series.max
        ),
        None => "n/a".to_string(),
    }
}

fn print_score_summary(summary: &ScoreSummary) {
    println!("[SCORES]");
    println!("  files  : {}", summary.files);
    println!("  overall: {}", format_series(summary.overall.as_ref()));
    for dimension in Dimension::ALL {
        let series = summary
            .dimensions
            .get(&dimension)
            .and_then(|series| series.as_ref());
        println!("  {:<16}: {}", dimension.to_string(), format_series(series));
    }
    println!();
}

fn print_split(split: &CorpusSplit) {
    println!("[SPLITS]");
    for label in [SplitLabel::Eval, SplitLabel::Train] {
        let files = split.files(label);
        let lowest = files.last().map(|score| score.overall);
        match lowest {
            Some(lowest) => println!(
                "  {label}: files={} lowest_overall={lowest:.2}",
                files.len()
            ),
            None => println!("  {label}: files=0"),
        }
    }
    if split.overflow > 0 {
        println!("  over train limit: {}", split.overflow);
    }
    println!();
}

fn print_run_summary(summary: &RunSummary) {
    println!("[SUMMARY]");
    println!(
        "  files      : read={} skipped_decode={} excluded_line_count={} validator_failures={}",
        summary.files_read,
        summary.skipped_decode,
        summary.excluded_line_count,
        summary.validator_failures
    );
    println!(
        "  scoring    : scored={} accepted={} rejected_threshold={}",
        summary.scored, summary.accepted, summary.rejected_threshold
    );
    println!(
        "  chunking   : files={} short_file_skips={} chunks={}",
        summary.chunked_files, summary.short_file_skips, summary.chunks
    );
    println!(
        "  masking    : candidates={} rejected={} unshaped={} examples={}",
        summary.candidates, summary.rejected_candidates, summary.unshaped_chunks, summary.examples
    );
    println!("  keyword    : spans={}", summary.keyword_spans);
    if let (Some(started), Some(finished)) = (summary.started_at, summary.finished_at) {
        let elapsed = finished - started;
        println!(
            "  elapsed    : {:.2}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }
}

/// Output paths `generate` writes under `out_dir`.
pub fn generate_outputs(out_dir: &Path) -> [PathBuf; 5] {
    [
        CHUNKS_FILENAME,
        EXAMPLES_FILENAME,
        KEYWORD_SPANS_FILENAME,
        SFT_FILENAME,
        SUMMARY_FILENAME,
    ]
    .map(|name| out_dir.join(name))
}
