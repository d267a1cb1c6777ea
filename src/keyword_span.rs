use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::KeywordSpanConfig;
use crate::data::{BlockId, FimExample, MaskStrategy, SourceFile};
use crate::masking::split_whole_word;

/// Pick an alphabetic-leading word from `words` within `max_attempts` draws.
pub fn draw_alphabetic_word<'a, R: Rng + ?Sized>(
    words: &[&'a str],
    max_attempts: usize,
    rng: &mut R,
) -> Option<&'a str> {
    (0..max_attempts)
        .filter_map(|_| words.choose(rng).copied())
        .find(|word| word.chars().next().is_some_and(char::is_alphabetic))
}

/// Single-token completions drawn from fixed windows of raw file lines.
///
/// Each window of `window_lines` lines yields at most one example: the first
/// character of a random alphabetic-leading word as prefix, the rest as
/// middle (empty for one-letter words), empty suffix. Windows without such a
/// word inside the attempt budget are skipped. Block ids count emitted
/// examples from 1.
pub fn keyword_spans<R: Rng + ?Sized>(
    file: &SourceFile,
    file_index: usize,
    config: &KeywordSpanConfig,
    rng: &mut R,
) -> Vec<FimExample> {
    if config.window_lines == 0 {
        return Vec::new();
    }
    let file_name = file.name();
    let mut spans = Vec::new();
    for window in file.lines().chunks(config.window_lines) {
        let words: Vec<&str> = window
            .iter()
            .flat_map(|line| line.split_whitespace())
            .collect();
        let Some(split) = draw_alphabetic_word(&words, config.max_attempts, rng)
            .and_then(split_whole_word)
        else {
            continue;
        };
        spans.push(FimExample {
            prefix: split.prefix,
            middle: split.middle,
            suffix: split.suffix,
            block_id: BlockId::new(file_index, spans.len() + 1),
            file_name: file_name.clone(),
            strategy: MaskStrategy::KeywordSpan,
        });
    }
    spans
}
