//! Multi-signal quality scorer.
//!
//! Seven dimensions are computed per file and combined into one weighted
//! overall score. Dimension scorers never fail: degenerate input yields 0 and
//! oracle problems leave `compiles` undefined.

/// Keyword set and keyword-density scorer.
pub mod keyword;
pub mod lines;
/// Near-duplicate line scorer.
pub mod repetition;

use indexmap::IndexMap;
use rand::Rng;
use std::cmp::Ordering;

use crate::config::{ScoringConfig, ScoringWeights};
use crate::constants::scoring::{LINE_COUNT_SCORE_CEIL, LINE_COUNT_SCORE_FLOOR};
use crate::data::{Dimension, DimensionScore, FileScore, SourceFile};
use crate::errors::CorpusError;
use crate::oracle::{SyntaxReport, SyntaxValidator};
use crate::types::FileId;

pub use keyword::{KeywordSet, KeywordStats, keyword_density, keyword_stats};
pub use lines::{comment_ratio, entropy, length_diversity};
pub use repetition::{normalize_line, repetition, similarity_ratio};

/// Line-count score: undefined outside `[min, max]`, otherwise a linear map
/// onto `[20, 100]`.
pub fn line_count_score(total_lines: usize, range: (usize, usize)) -> Option<f64> {
    let (min_lines, max_lines) = range;
    if total_lines < min_lines || total_lines > max_lines {
        return None;
    }
    if min_lines == max_lines {
        return Some(LINE_COUNT_SCORE_CEIL);
    }
    let position = (total_lines - min_lines) as f64 / (max_lines - min_lines) as f64;
    Some(LINE_COUNT_SCORE_FLOOR + position * (LINE_COUNT_SCORE_CEIL - LINE_COUNT_SCORE_FLOOR))
}

/// `max(0, 100 - 100 * error_ratio / cap)`.
pub fn compiles_score(report: &SyntaxReport, error_ratio_cap: f64) -> f64 {
    (100.0 - 100.0 * report.error_ratio() / error_ratio_cap).clamp(0.0, 100.0)
}

/// Weighted average over defined dimensions; 0 when no defined dimension has
/// positive weight.
pub fn combine(dimensions: &IndexMap<Dimension, DimensionScore>, weights: &ScoringWeights) -> f64 {
    let (weighted, total_weight) = dimensions
        .iter()
        .filter_map(|(dimension, score)| Some((weights.weight(*dimension), score.value()?)))
        .fold((0.0, 0.0), |(sum, total), (weight, value)| {
            (sum + weight * value, total + weight)
        });
    if total_weight <= 0.0 {
        return 0.0;
    }
    (weighted / total_weight).clamp(0.0, 100.0)
}

/// Result of scoring one file.
#[derive(Debug)]
pub enum Assessment {
    /// Line count inside the configured range; all dimensions computed.
    Scored {
        /// Per-dimension and overall scores.
        score: FileScore,
        /// Set when the oracle could not judge the file.
        validator_error: Option<CorpusError>,
    },
    /// Excluded before any other scorer ran.
    OutOfRange {
        /// Excluded file.
        file_id: FileId,
        /// Its line count.
        total_lines: usize,
    },
}

impl Assessment {
    /// The score, unless the file was out of range.
    pub fn score(&self) -> Option<&FileScore> {
        match self {
            Assessment::Scored { score, .. } => Some(score),
            Assessment::OutOfRange { .. } => None,
        }
    }

    /// Consume into the score, unless the file was out of range.
    pub fn into_score(self) -> Option<FileScore> {
        match self {
            Assessment::Scored { score, .. } => Some(score),
            Assessment::OutOfRange { .. } => None,
        }
    }
}

/// Parametrized scorer shared by every worker.
#[derive(Clone, Debug)]
pub struct QualityScorer {
    config: ScoringConfig,
    keywords: KeywordSet,
}

impl QualityScorer {
    /// Scorer for `config`.
    pub fn new(config: ScoringConfig) -> Self {
        let keywords = KeywordSet::new(&config.keyword_set);
        Self { config, keywords }
    }

    /// Active configuration.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Keyword set built from the configuration.
    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Score one file. Without a validator `compiles` is undefined.
    pub fn score_file<R: Rng + ?Sized>(
        &self,
        file: &SourceFile,
        validator: Option<&dyn SyntaxValidator>,
        rng: &mut R,
    ) -> Assessment {
        let total_lines = file.line_count();
        let Some(line_count) = line_count_score(total_lines, self.config.line_count_range) else {
            return Assessment::OutOfRange {
                file_id: file.id().to_string(),
                total_lines,
            };
        };

        let lines = file.lines();
        let (syntax, validator_error) = match validator.map(|oracle| oracle.check(file)) {
            Some(Ok(report)) => (Some(report), None),
            Some(Err(err)) => (None, Some(err)),
            None => (None, None),
        };
        let compiles = syntax
            .as_ref()
            .map(|report| compiles_score(report, self.config.error_ratio_cap));

        let mut dimensions = IndexMap::with_capacity(Dimension::ALL.len());
        for dimension in Dimension::ALL {
            let value = match dimension {
                Dimension::KeywordDensity => Some(keyword_density(lines, &self.keywords)),
                Dimension::CommentRatio => Some(comment_ratio(lines)),
                Dimension::LengthDiversity => Some(length_diversity(lines)),
                Dimension::Entropy => Some(entropy(lines)),
                Dimension::Repetition => Some(repetition(
                    lines,
                    self.config.sample_rate,
                    self.config.max_compared_pairs,
                    rng,
                )),
                Dimension::Compiles => compiles,
                Dimension::LineCount => Some(line_count),
            };
            dimensions.insert(dimension, DimensionScore::from_option(value));
        }
        let overall = combine(&dimensions, &self.config.weights);

        Assessment::Scored {
            score: FileScore {
                file_id: file.id().to_string(),
                total_lines,
                dimensions,
                overall,
                syntax,
            },
            validator_error,
        }
    }

    /// Overall score at or above the acceptance threshold.
    pub fn accepts(&self, score: &FileScore) -> bool {
        score.overall >= self.config.acceptance_threshold
    }
}

/// Sort by overall score descending, ties broken by file id.
pub fn rank(scores: &mut [FileScore]) {
    scores.sort_by(|a, b| {
        b.overall
            .partial_cmp(&a.overall)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.file_id.cmp(&b.file_id))
    });
}
