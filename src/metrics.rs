use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::comments::code_lines;
use crate::data::{Dimension, FileScore, SourceFile};
use crate::scoring::KeywordSet;
use crate::types::FileId;

/// Count, mean, min and max of one series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl SeriesSummary {
    /// Summarize `values`; `None` when empty.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            count,
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

/// Aggregate view over a batch of file scores.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Number of scored files.
    pub files: usize,
    /// Overall scores; `None` for an empty batch.
    pub overall: Option<SeriesSummary>,
    /// Defined values only; a dimension undefined everywhere maps to `None`.
    pub dimensions: IndexMap<Dimension, Option<SeriesSummary>>,
}

/// Summarize overall and per-dimension scores.
pub fn score_summary(scores: &[FileScore]) -> ScoreSummary {
    let dimensions = Dimension::ALL
        .into_iter()
        .map(|dimension| {
            let values = scores
                .iter()
                .filter_map(|score| score.get(dimension).value());
            (dimension, SeriesSummary::from_values(values))
        })
        .collect();
    ScoreSummary {
        files: scores.len(),
        overall: SeriesSummary::from_values(scores.iter().map(|score| score.overall)),
        dimensions,
    }
}

/// Per-file line statistics over comment-free code lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineStats {
    /// File the statistics describe.
    pub file_id: FileId,
    /// Non-blank lines left after removing comments.
    pub code_lines: usize,
    /// Trimmed line length in characters.
    pub min_length: usize,
    /// Longest code line.
    pub max_length: usize,
    /// Mean code line length.
    pub mean_length: f64,
    /// Median code line length.
    pub median_length: f64,
    /// Mean per-line share of whitespace words that are keywords.
    pub mean_keyword_ratio: f64,
    /// Mean per-line share of words that are identifiers but not keywords.
    pub mean_identifier_ratio: f64,
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

fn median(sorted: &[usize]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

impl LineStats {
    /// `None` when the file has no code lines.
    pub fn from_file(file: &SourceFile, keywords: &KeywordSet) -> Option<Self> {
        let lines = code_lines(file.lines());
        if lines.is_empty() {
            return None;
        }
        let mut lengths: Vec<usize> = lines.iter().map(|line| line.chars().count()).collect();
        lengths.sort_unstable();

        let (keyword_sum, identifier_sum) =
            lines.iter().fold((0.0, 0.0), |(keyword_sum, identifier_sum), line| {
                let words: Vec<&str> = line.split_whitespace().collect();
                let total = words.len() as f64;
                let keyword_hits = words.iter().filter(|w| keywords.contains(w)).count();
                let identifiers = words
                    .iter()
                    .filter(|w| is_identifier(w) && !keywords.contains(w))
                    .count();
                (
                    keyword_sum + keyword_hits as f64 / total,
                    identifier_sum + identifiers as f64 / total,
                )
            });
        let n = lines.len() as f64;
        Some(Self {
            file_id: file.id().to_string(),
            code_lines: lines.len(),
            min_length: lengths[0],
            max_length: lengths[lengths.len() - 1],
            mean_length: lengths.iter().sum::<usize>() as f64 / n,
            median_length: median(&lengths),
            mean_keyword_ratio: keyword_sum / n,
            mean_identifier_ratio: identifier_sum / n,
        })
    }
}
