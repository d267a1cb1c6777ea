use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::chunking::{
    DEFAULT_LINE_RATIOS, DEFAULT_MAX_CHUNK_LINES, DEFAULT_MIN_FILE_LINES,
};
use crate::constants::export::DEFAULT_EVAL_SIZE;
use crate::constants::keyword_span::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_LINES};
use crate::constants::masking::{DEFAULT_ACCEPTANCE_PSM_RATE, DEFAULT_CONSTRUCTION_PSM_RATE};
use crate::constants::permute::{DEFAULT_FIM_RATE, DEFAULT_FIM_SPM_RATE};
use crate::constants::scoring::{
    DEFAULT_ERROR_RATIO_CAP, DEFAULT_KEYWORDS, DEFAULT_LINE_COUNT_RANGE,
    DEFAULT_MAX_COMPARED_PAIRS, DEFAULT_SAMPLE_RATE,
};
use crate::data::{Dimension, MaskMode};
use crate::errors::CorpusError;
use crate::types::KeywordText;

/// Per-dimension weights for the overall score.
///
/// Weights need not sum to 1; the overall score is normalized by the sum of
/// weights of the dimensions that are defined for a file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of `repetition`.
    pub repetition: f64,
    /// Weight of `keyword_density`.
    pub keyword: f64,
    /// Weight of `comment_ratio`.
    pub comment_ratio: f64,
    /// Weight of `length_diversity`.
    pub length_diversity: f64,
    /// Weight of `entropy`.
    pub entropy: f64,
    /// Weight of `compiles`.
    pub compiles: f64,
    /// Weight of `line_count`.
    pub line_count: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            repetition: 1.0,
            keyword: 1.0,
            comment_ratio: 1.0,
            length_diversity: 1.0,
            entropy: 1.0,
            compiles: 1.0,
            line_count: 1.0,
        }
    }
}

impl ScoringWeights {
    /// Weight for `dimension`.
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::KeywordDensity => self.keyword,
            Dimension::CommentRatio => self.comment_ratio,
            Dimension::LengthDiversity => self.length_diversity,
            Dimension::Entropy => self.entropy,
            Dimension::Repetition => self.repetition,
            Dimension::Compiles => self.compiles,
            Dimension::LineCount => self.line_count,
        }
    }
}

/// Quality scorer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Reserved words of the target language (matched lower-case).
    pub keyword_set: Vec<KeywordText>,
    /// Per-dimension weights of the overall score.
    pub weights: ScoringWeights,
    /// Files whose overall score is below this floor are dropped.
    pub acceptance_threshold: f64,
    /// Inclusive `(min, max)` line count; files outside are excluded.
    pub line_count_range: (usize, usize),
    /// Fraction of code lines sampled for the repetition scorer.
    pub sample_rate: f64,
    /// Upper bound on line pairs compared by the repetition scorer.
    pub max_compared_pairs: usize,
    /// Error ratio at which the `compiles` dimension reaches 0.
    pub error_ratio_cap: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_set: DEFAULT_KEYWORDS.iter().map(|kw| kw.to_string()).collect(),
            weights: ScoringWeights::default(),
            acceptance_threshold: 0.0,
            line_count_range: DEFAULT_LINE_COUNT_RANGE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_compared_pairs: DEFAULT_MAX_COMPARED_PAIRS,
            error_ratio_cap: DEFAULT_ERROR_RATIO_CAP,
        }
    }
}

/// Weighted line-count range used when drawing chunk sizes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineRange {
    /// Relative draw weight.
    pub weight: f64,
    /// Smallest chunk size in the range.
    pub min_lines: usize,
    /// Largest chunk size in the range.
    pub max_lines: usize,
}

impl LineRange {
    /// Range from its weight and bounds.
    pub const fn new(weight: f64, min_lines: usize, max_lines: usize) -> Self {
        Self {
            weight,
            min_lines,
            max_lines,
        }
    }
}

/// Controls how files are cut into chunks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Weighted chunk-size ranges.
    pub line_ratios: Vec<LineRange>,
    /// Files with this many lines or fewer yield no chunks.
    pub min_file_lines: usize,
    /// Hard cap on lines per chunk.
    pub max_chunk_lines: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            line_ratios: DEFAULT_LINE_RATIOS
                .iter()
                .map(|(weight, (min, max))| LineRange::new(*weight, *min, *max))
                .collect(),
            min_file_lines: DEFAULT_MIN_FILE_LINES,
            max_chunk_lines: DEFAULT_MAX_CHUNK_LINES,
        }
    }
}

/// Relative frequency of the five masking modes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeWeights {
    /// Weight of single-word masking.
    pub single_word: f64,
    /// Weight of word-span masking.
    pub word_span: f64,
    /// Weight of single-line masking.
    pub single_line: f64,
    /// Weight of line-span masking.
    pub line_span: f64,
    /// Weight of block masking.
    pub block: f64,
}

impl Default for ModeWeights {
    fn default() -> Self {
        Self {
            single_word: 1.0,
            word_span: 1.0,
            single_line: 1.0,
            line_span: 1.0,
            block: 1.0,
        }
    }
}

impl ModeWeights {
    /// Weight for `mode`.
    pub fn weight(&self, mode: MaskMode) -> f64 {
        match mode {
            MaskMode::SingleWord => self.single_word,
            MaskMode::WordSpan => self.word_span,
            MaskMode::SingleLine => self.single_line,
            MaskMode::LineSpan => self.line_span,
            MaskMode::Block => self.block,
        }
    }
}

/// Masking policy: mode distribution plus construction/acceptance disciplines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Draw weights of the five masking modes.
    pub mode_weights: ModeWeights,
    /// Probability that line-span modes build a PSM-shaped split.
    pub construction_psm_rate: f64,
    /// Probability that the validity filter applies the PSM contract.
    ///
    /// Drawn independently of the construction discipline.
    pub acceptance_psm_rate: f64,
    /// When set, the SPM acceptance contract also requires an empty prefix.
    pub spm_requires_empty_prefix: bool,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            mode_weights: ModeWeights::default(),
            construction_psm_rate: DEFAULT_CONSTRUCTION_PSM_RATE,
            acceptance_psm_rate: DEFAULT_ACCEPTANCE_PSM_RATE,
            spm_requires_empty_prefix: false,
        }
    }
}

/// Keyword-span stream settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSpanConfig {
    /// Emit keyword-span examples.
    pub enabled: bool,
    /// Raw lines per span window.
    pub window_lines: usize,
    /// Word draws tried per window before giving up.
    pub max_attempts: usize,
}

impl Default for KeywordSpanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_lines: DEFAULT_WINDOW_LINES,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Token-id permutation rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermuteConfig {
    /// Probability a file is permuted at all.
    pub fim_rate: f64,
    /// Probability a permuted file uses SPM instead of PSM.
    pub fim_spm_rate: f64,
}

impl Default for PermuteConfig {
    fn default() -> Self {
        Self {
            fim_rate: DEFAULT_FIM_RATE,
            fim_spm_rate: DEFAULT_FIM_SPM_RATE,
        }
    }
}

/// Eval/train bucketing of ranked files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Number of top-ranked files placed in the eval split.
    pub eval_size: usize,
    /// Optional cap on the train split.
    pub train_limit: Option<usize>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            eval_size: DEFAULT_EVAL_SIZE,
            train_limit: None,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run seed; every file derives its own RNG from it.
    pub seed: u64,
    /// Scoring and acceptance settings.
    pub scoring: ScoringConfig,
    /// Chunk sizing settings.
    pub chunking: ChunkingConfig,
    /// Masking and acceptance-filter settings.
    pub masking: MaskingConfig,
    /// Keyword-span settings.
    pub keyword_span: KeywordSpanConfig,
    /// Token permutation settings.
    pub permute: PermuteConfig,
    /// Eval/train bucketing settings.
    pub split: SplitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            scoring: ScoringConfig::default(),
            chunking: ChunkingConfig::default(),
            masking: MaskingConfig::default(),
            keyword_span: KeywordSpanConfig::default(),
            permute: PermuteConfig::default(),
            split: SplitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a (possibly partial) JSON document; missing keys keep defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, CorpusError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, CorpusError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject settings the samplers cannot honor.
    pub fn validate(&self) -> Result<(), CorpusError> {
        let scoring = &self.scoring;
        let weights = &scoring.weights;
        for dimension in Dimension::ALL {
            check_weight(
                &format!("scoring.weights.{dimension}"),
                weights.weight(dimension),
            )?;
        }
        let (min_lines, max_lines) = scoring.line_count_range;
        if min_lines > max_lines {
            return Err(config_error(format!(
                "scoring.line_count_range min {min_lines} exceeds max {max_lines}"
            )));
        }
        check_rate("scoring.sample_rate", scoring.sample_rate)?;
        if scoring.error_ratio_cap.is_nan() || scoring.error_ratio_cap <= 0.0 {
            return Err(config_error("scoring.error_ratio_cap must be positive"));
        }
        if scoring.max_compared_pairs == 0 {
            return Err(config_error("scoring.max_compared_pairs must be positive"));
        }
        if scoring.acceptance_threshold.is_nan() {
            return Err(config_error("scoring.acceptance_threshold must be a number"));
        }

        let chunking = &self.chunking;
        if chunking.line_ratios.is_empty() {
            return Err(config_error("chunking.line_ratios must not be empty"));
        }
        for (idx, range) in chunking.line_ratios.iter().enumerate() {
            check_weight(&format!("chunking.line_ratios[{idx}].weight"), range.weight)?;
            if range.min_lines > range.max_lines {
                return Err(config_error(format!(
                    "chunking.line_ratios[{idx}] min {} exceeds max {}",
                    range.min_lines, range.max_lines
                )));
            }
        }
        if chunking.line_ratios.iter().all(|range| range.weight == 0.0) {
            return Err(config_error("chunking.line_ratios weights are all zero"));
        }
        if chunking.max_chunk_lines == 0 {
            return Err(config_error("chunking.max_chunk_lines must be positive"));
        }

        let masking = &self.masking;
        for mode in MaskMode::ALL {
            check_weight(
                &format!("masking.mode_weights.{mode:?}"),
                masking.mode_weights.weight(mode),
            )?;
        }
        if MaskMode::ALL
            .iter()
            .all(|mode| masking.mode_weights.weight(*mode) == 0.0)
        {
            return Err(config_error("masking.mode_weights are all zero"));
        }
        check_rate("masking.construction_psm_rate", masking.construction_psm_rate)?;
        check_rate("masking.acceptance_psm_rate", masking.acceptance_psm_rate)?;

        if self.keyword_span.window_lines == 0 {
            return Err(config_error("keyword_span.window_lines must be positive"));
        }
        check_rate("permute.fim_rate", self.permute.fim_rate)?;
        check_rate("permute.fim_spm_rate", self.permute.fim_spm_rate)?;
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> CorpusError {
    CorpusError::Configuration(message.into())
}

fn check_weight(name: &str, value: f64) -> Result<(), CorpusError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(config_error(format!(
            "{name} must be a finite non-negative number, got {value}"
        )))
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), CorpusError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_error(format!("{name} must be within [0, 1], got {value}")))
    }
}
