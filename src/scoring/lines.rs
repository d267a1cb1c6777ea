//! Line-shape scorers: code/comment ratio, statement-length diversity and
//! per-line information entropy.

use std::collections::HashMap;
use std::hash::Hash;

use crate::comments::{code_lines, count_code_and_comment_lines};

/// `100 * code / (code + comment)` over non-blank lines; 0 for no lines.
pub fn comment_ratio<S: AsRef<str>>(lines: &[S]) -> f64 {
    let (code, comment) = count_code_and_comment_lines(lines);
    let total = code + comment;
    if total == 0 {
        return 0.0;
    }
    100.0 * code as f64 / total as f64
}

/// Spread statistics over per-line token counts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LengthSpread {
    /// Sample standard deviation (0 with fewer than two lines).
    pub stddev: f64,
    /// `max - min`.
    pub spread: f64,
    /// Mean absolute deviation from the mean.
    pub mean_abs_deviation: f64,
}

/// Spread of `lengths`; `None` when empty.
pub fn length_spread(lengths: &[usize]) -> Option<LengthSpread> {
    let (&min, &max) = (lengths.iter().min()?, lengths.iter().max()?);
    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<usize>() as f64 / n;
    let stddev = if lengths.len() >= 2 {
        let variance = lengths
            .iter()
            .map(|len| (*len as f64 - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };
    let mean_abs_deviation = lengths
        .iter()
        .map(|len| (*len as f64 - mean).abs())
        .sum::<f64>()
        / n;
    Some(LengthSpread {
        stddev,
        spread: (max - min) as f64,
        mean_abs_deviation,
    })
}

/// Rewards varied statement shapes over one repeated pattern.
///
/// `min(50, 10*stddev) + min(30, 1.5*spread) + min(20, 2*mad)` over the
/// whitespace token counts of code lines.
pub fn length_diversity<S: AsRef<str>>(lines: &[S]) -> f64 {
    let lengths: Vec<usize> = code_lines(lines)
        .iter()
        .map(|line| line.split_whitespace().count())
        .collect();
    let Some(spread) = length_spread(&lengths) else {
        return 0.0;
    };
    let score = (spread.stddev * 10.0).min(50.0)
        + (spread.spread * 1.5).min(30.0)
        + (spread.mean_abs_deviation * 2.0).min(20.0);
    score.clamp(0.0, 100.0)
}

/// Shannon entropy (bits) of a sequence's value distribution.
pub fn shannon_entropy<T, I>(items: I) -> f64
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut total = 0usize;
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .values()
        .map(|count| {
            let p = *count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Average of per-line character entropy (spaces ignored) and token entropy,
/// scaled by 20 and capped at 100.
pub fn entropy<S: AsRef<str>>(lines: &[S]) -> f64 {
    let code = code_lines(lines);
    if code.is_empty() {
        return 0.0;
    }
    let (char_sum, token_sum) = code.iter().fold((0.0, 0.0), |(chars, tokens), line| {
        (
            chars + shannon_entropy(line.chars().filter(|ch| *ch != ' ')),
            tokens + shannon_entropy(line.split_whitespace()),
        )
    });
    let n = code.len() as f64;
    let score = (char_sum / n + token_sum / n) / 2.0 * 20.0;
    score.clamp(0.0, 100.0)
}
