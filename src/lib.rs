#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners behind the `fimcorpus` binary.
pub mod apps;
/// Line chunking of source files.
pub mod chunking;
/// Comment stripping shared by the scorers.
pub mod comments;
/// Pipeline configuration types.
pub mod config;
/// Centralized constants used across scoring, sampling, and export.
pub mod constants;
/// Source files, scores, chunks, and FIM examples.
pub mod data;
/// JSONL/JSON writers and split materialization.
pub mod export;
mod hash;
/// Keyword-span example strategy.
pub mod keyword_span;
/// Chunk masking and the PSM/SPM validity filter.
pub mod masking;
/// Aggregate score and line statistics.
pub mod metrics;
/// Syntax oracle trait and the iverilog implementation.
pub mod oracle;
/// Token-level FIM permutation.
pub mod permute;
/// Batch driver tying scoring, bucketing, and generation together.
pub mod pipeline;
/// Deterministic per-file random streams.
pub mod rng;
/// Heuristic quality scorers.
pub mod scoring;
/// Eval/train bucketing.
pub mod splits;
/// Input transports (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{
    ChunkingConfig, KeywordSpanConfig, LineRange, MaskingConfig, ModeWeights, PermuteConfig,
    PipelineConfig, ScoringConfig, ScoringWeights, SplitConfig,
};
pub use data::{
    BlockId, Chunk, Dimension, DimensionScore, Discipline, FileScore, FimExample, MaskMode,
    MaskStrategy, SourceFile,
};
pub use errors::CorpusError;
pub use oracle::{IverilogValidator, SyntaxReport, SyntaxValidator};
pub use permute::{ByteTokenizer, FimLayout, FimSequence, FimSpecialTokens, Tokenizer};
pub use pipeline::{CorpusPipeline, PipelineRun, RunSummary};
pub use rng::DeterministicRng;
pub use scoring::{Assessment, QualityScorer};
pub use splits::{CorpusSplit, SplitLabel};
pub use transport::{CorpusReader, CorpusScan};
pub use types::{FileId, FileName, KeywordText, SkipReason, TokenId};
