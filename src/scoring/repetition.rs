use rand::Rng;
use rand::seq::index;
use rayon::prelude::*;
use regex::Regex;
use std::sync::LazyLock;

use crate::comments::code_lines;
use crate::constants::scoring::{DIGIT_PLACEHOLDER, LETTER_PLACEHOLDER};

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit regex"));
static LETTER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("letter regex"));

/// Replace digit runs, then letter runs, with fixed placeholders so that
/// lines differing only in names or literals compare as equal.
pub fn normalize_line(line: &str) -> String {
    let digits = DIGIT_RUN.replace_all(line.trim(), DIGIT_PLACEHOLDER);
    LETTER_RUN
        .replace_all(&digits, LETTER_PLACEHOLDER)
        .into_owned()
}

/// Character similarity in `[0, 1]`: `2 * LCS / (len(a) + len(b))`.
///
/// Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    2.0 * previous[b.len()] as f64 / total as f64
}

/// Map a linear index over the upper triangle of a `k x k` matrix to `(i, j)`
/// with `i < j`.
fn pair_at(mut linear: usize, k: usize) -> (usize, usize) {
    let mut i = 0;
    loop {
        let row = k - 1 - i;
        if linear < row {
            return (i, i + 1 + linear);
        }
        linear -= row;
        i += 1;
    }
}

/// Near-duplicate score: `100 * (1 - mean pairwise similarity)` over a
/// random sample of normalized code lines.
///
/// At most `max_pairs` pairs are compared; pair similarities are computed in
/// parallel. Fewer than two code lines score 0.
pub fn repetition<S, R>(lines: &[S], sample_rate: f64, max_pairs: usize, rng: &mut R) -> f64
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let code = code_lines(lines);
    let n = code.len();
    if n < 2 {
        return 0.0;
    }
    // The floor is 2, not 1: a single sampled line has no pair to compare.
    let sample_size = ((n as f64 * sample_rate).floor() as usize).clamp(2, n);
    let sampled: Vec<String> = index::sample(rng, n, sample_size)
        .into_iter()
        .map(|idx| normalize_line(&code[idx]))
        .collect();

    let k = sampled.len();
    let total_pairs = k * (k - 1) / 2;
    let compared = total_pairs.min(max_pairs);
    if compared == 0 {
        return 0.0;
    }
    let pairs: Vec<(usize, usize)> = index::sample(rng, total_pairs, compared)
        .into_iter()
        .map(|linear| pair_at(linear, k))
        .collect();
    let similarity_sum: f64 = pairs
        .par_iter()
        .map(|(i, j)| similarity_ratio(&sampled[*i], &sampled[*j]))
        .sum();
    let mean = similarity_sum / pairs.len() as f64;
    (100.0 * (1.0 - mean)).clamp(0.0, 100.0)
}
