use std::collections::HashSet;

use crate::comments::code_lines;
use crate::constants::scoring::{KEYWORD_DIVERSITY_WEIGHT, KEYWORD_RATIO_WEIGHT};
use crate::types::KeywordText;

/// Lower-cased reserved words of the target language.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeywordSet {
    words: HashSet<KeywordText>,
}

impl KeywordSet {
    /// Build a set from `words`, ignoring duplicates.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|word| word.as_ref().trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
        }
    }

    /// True when `token` is a keyword.
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    /// Number of distinct keywords.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the set holds no keywords.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Raw counts behind the keyword density score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeywordStats {
    /// Word tokens after comment and punctuation stripping (`W`).
    pub total_tokens: usize,
    /// Tokens that are keywords, with repetition (`K`).
    pub keyword_hits: usize,
    /// Distinct keywords seen (`U`).
    pub distinct_keywords: usize,
}

/// Split comment-free code into lower-case word tokens.
///
/// Letters, digits, `_` and `$` form words (identifier characters); everything
/// else separates them.
pub fn word_tokens(code: &str) -> Vec<String> {
    code.split(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Token and keyword counts over the comment-free code of `lines`.
pub fn keyword_stats<S: AsRef<str>>(lines: &[S], keywords: &KeywordSet) -> KeywordStats {
    let code = code_lines(lines).join(" ");
    let tokens = word_tokens(&code);
    let mut distinct = HashSet::new();
    let mut keyword_hits = 0;
    for token in &tokens {
        if keywords.contains(token) {
            keyword_hits += 1;
            distinct.insert(token.as_str());
        }
    }
    KeywordStats {
        total_tokens: tokens.len(),
        keyword_hits,
        distinct_keywords: distinct.len(),
    }
}

/// Keyword density score.
///
/// `100 * (0.8 * (1 - K/W) + 0.2 * U/K)`; 0 when there are no tokens or no
/// keywords. Dense keyword boilerplate scores low, varied keyword use high.
pub fn keyword_density<S: AsRef<str>>(lines: &[S], keywords: &KeywordSet) -> f64 {
    score_from_stats(keyword_stats(lines, keywords))
}

/// Keyword density from precomputed counts.
pub fn score_from_stats(stats: KeywordStats) -> f64 {
    if stats.total_tokens == 0 || stats.keyword_hits == 0 {
        return 0.0;
    }
    let ratio = stats.keyword_hits as f64 / stats.total_tokens as f64;
    let diversity = stats.distinct_keywords as f64 / stats.keyword_hits as f64;
    let score =
        100.0 * (KEYWORD_RATIO_WEIGHT * (1.0 - ratio) + KEYWORD_DIVERSITY_WEIGHT * diversity);
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verilog() -> KeywordSet {
        KeywordSet::new(["module", "endmodule", "wire", "assign", "reg"])
    }

    #[test]
    fn no_tokens_scores_zero() {
        let lines = ["// only a comment\n", "\n"];
        assert_eq!(keyword_density(&lines, &verilog()), 0.0);
    }

    #[test]
    fn no_keywords_scores_zero() {
        let lines = ["foo bar baz;\n"];
        assert_eq!(keyword_density(&lines, &verilog()), 0.0);
    }

    #[test]
    fn comments_and_punctuation_are_ignored() {
        let lines = [
            "module top(a, b); // module wire reg\n",
            "/* wire wire\n",
            "   wire */ assign b = a;\n",
        ];
        let stats = keyword_stats(&lines, &verilog());
        assert_eq!(
            stats,
            KeywordStats {
                total_tokens: 7,
                keyword_hits: 2,
                distinct_keywords: 2,
            }
        );
        let expected = 100.0 * (0.8 * (1.0 - 2.0 / 7.0) + 0.2 * 1.0);
        assert!((keyword_density(&lines, &verilog()) - expected).abs() < 1e-9);
    }

    #[test]
    fn repeated_single_keyword_has_low_diversity() {
        let lines = vec!["wire a;\n"; 12];
        let stats = keyword_stats(&lines, &verilog());
        assert_eq!(stats.total_tokens, 24);
        assert_eq!(stats.keyword_hits, 12);
        assert_eq!(stats.distinct_keywords, 1);
        let expected = 100.0 * (0.8 * 0.5 + 0.2 / 12.0);
        assert!((keyword_density(&lines, &verilog()) - expected).abs() < 1e-9);
    }

    #[test]
    fn matching_is_case_insensitive_and_whole_token() {
        let lines = ["MODULE wirex end_wire;\n"];
        let stats = keyword_stats(&lines, &verilog());
        assert_eq!(stats.keyword_hits, 1);
        assert_eq!(stats.total_tokens, 3);
    }

    #[test]
    fn score_approaches_max_only_with_sparse_varied_keywords() {
        let sparse = KeywordStats {
            total_tokens: 1_000_000,
            keyword_hits: 5,
            distinct_keywords: 5,
        };
        assert!(score_from_stats(sparse) > 99.99);
        let repeated = KeywordStats {
            total_tokens: 1_000_000,
            keyword_hits: 5,
            distinct_keywords: 1,
        };
        assert!(score_from_stats(repeated) < 85.0);
    }
}
