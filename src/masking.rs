//! Chunk masking: five randomly drawn modes, the whole-word special case and
//! the PSM/SPM validity filter.
//!
//! The discipline used to *build* a line-span split and the one used to
//! *accept* a candidate are drawn independently, each from its own rate in
//! `MaskingConfig`.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::config::{MaskingConfig, ModeWeights};
use crate::constants::masking::{LINE_SEPARATOR, WORD_SEPARATOR};
use crate::data::{Chunk, Discipline, FimExample, MaskMode, MaskStrategy};

/// Prefix, middle and suffix cut out of one chunk's text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FimSplit {
    /// Text before the hole.
    pub prefix: String,
    /// Text to predict.
    pub middle: String,
    /// Text after the hole.
    pub suffix: String,
}

impl FimSplit {
    fn from_parts(parts: &[&str], start: usize, end: usize, separator: &str) -> Self {
        Self {
            prefix: parts[..start].join(separator),
            middle: parts[start..end].join(separator),
            suffix: parts[end..].join(separator),
        }
    }

    /// Whether the split satisfies the non-empty contract of `discipline`.
    ///
    /// PSM needs all three parts. SPM needs middle and suffix; with
    /// `spm_requires_empty_prefix` it additionally needs an empty prefix.
    pub fn satisfies(&self, discipline: Discipline, spm_requires_empty_prefix: bool) -> bool {
        match discipline {
            Discipline::Psm => {
                !self.prefix.is_empty() && !self.middle.is_empty() && !self.suffix.is_empty()
            }
            Discipline::Spm => {
                !self.middle.is_empty()
                    && !self.suffix.is_empty()
                    && (!spm_requires_empty_prefix || self.prefix.is_empty())
            }
        }
    }
}

/// What masking one chunk produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaskOutcome {
    /// Accepted example.
    Example(FimExample),
    /// A candidate was built but failed the validity filter.
    Rejected {
        /// Mode the candidate was cut with.
        mode: MaskMode,
        /// Discipline it was checked against.
        discipline: Discipline,
    },
    /// The chunk cannot take the drawn mode's shape (e.g. one line for a
    /// line-based mode) or is a single non-alphabetic word.
    Unshaped,
}

/// Draw a masking mode by configured weight.
pub fn draw_mode<R: Rng + ?Sized>(weights: &ModeWeights, rng: &mut R) -> MaskMode {
    MaskMode::ALL
        .choose_weighted(rng, |mode| weights.weight(*mode))
        .copied()
        .unwrap_or(MaskMode::Block)
}

/// Draw a discipline: PSM with probability `psm_rate`.
///
/// # Panics
///
/// When `psm_rate` is outside `[0, 1]`.
pub fn draw_discipline<R: Rng + ?Sized>(psm_rate: f64, rng: &mut R) -> Discipline {
    if rng.random_bool(psm_rate) {
        Discipline::Psm
    } else {
        Discipline::Spm
    }
}

/// mode1: one random word as the middle.
pub fn split_single_word<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<FimSplit> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let index = rng.random_range(0..words.len());
    Some(FimSplit::from_parts(&words, index, index + 1, WORD_SEPARATOR))
}

/// mode2: a random run of words, `start` in `[0, n-2]`, `end` in `[start+1, n]`.
pub fn split_word_span<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<FimSplit> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    let start = rng.random_range(0..=words.len() - 2);
    let end = rng.random_range(start + 1..=words.len());
    Some(FimSplit::from_parts(&words, start, end, WORD_SEPARATOR))
}

/// mode3: one random line as the middle.
pub fn split_single_line<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<FimSplit> {
    let lines: Vec<&str> = text.split(LINE_SEPARATOR).collect();
    if lines.len() < 2 {
        return None;
    }
    let index = rng.random_range(0..lines.len());
    Some(FimSplit::from_parts(&lines, index, index + 1, LINE_SEPARATOR))
}

/// mode4/mode5: a run of lines built under a drawn discipline.
///
/// PSM: `start` in `[1, n-2]`, `end` in `[start+1, n-1]`, so prefix and
/// suffix each keep a line. SPM: `start = 0`, `end` in `[1, n-1]`. Two-line
/// chunks have no room for PSM and are built as SPM.
///
/// # Panics
///
/// When `construction_psm_rate` is outside `[0, 1]`.
pub fn split_line_span<R: Rng + ?Sized>(
    text: &str,
    construction_psm_rate: f64,
    rng: &mut R,
) -> Option<FimSplit> {
    let lines: Vec<&str> = text.split(LINE_SEPARATOR).collect();
    let n = lines.len();
    if n < 2 {
        return None;
    }
    let discipline = draw_discipline(construction_psm_rate, rng);
    let (start, end) = if discipline == Discipline::Psm && n >= 3 {
        let start = rng.random_range(1..=n - 2);
        (start, rng.random_range(start + 1..=n - 1))
    } else {
        (0, rng.random_range(1..=n - 1))
    };
    Some(FimSplit::from_parts(&lines, start, end, LINE_SEPARATOR))
}

/// Whole-word case: first character as prefix, the rest as middle, empty
/// suffix. `None` unless the word starts with an alphabetic character.
pub fn split_whole_word(word: &str) -> Option<FimSplit> {
    let mut chars = word.chars();
    let first = chars.next().filter(|ch| ch.is_alphabetic())?;
    Some(FimSplit {
        prefix: first.to_string(),
        middle: chars.as_str().to_string(),
        suffix: String::new(),
    })
}

/// Cut `text` with the splitter for `mode`; `None` when the text cannot take that shape.
///
/// # Panics
///
/// When a rate is outside `[0, 1]`.
/// [`PipelineConfig::validate`](crate::config::PipelineConfig::validate)
/// rejects such configs.
pub fn apply_mode<R: Rng + ?Sized>(
    mode: MaskMode,
    text: &str,
    config: &MaskingConfig,
    rng: &mut R,
) -> Option<FimSplit> {
    match mode {
        MaskMode::SingleWord => split_single_word(text, rng),
        MaskMode::WordSpan => split_word_span(text, rng),
        MaskMode::SingleLine => split_single_line(text, rng),
        MaskMode::LineSpan | MaskMode::Block => {
            split_line_span(text, config.construction_psm_rate, rng)
        }
    }
}

fn example(chunk: &Chunk, split: FimSplit, strategy: MaskStrategy) -> FimExample {
    FimExample {
        prefix: split.prefix,
        middle: split.middle,
        suffix: split.suffix,
        block_id: chunk.block_id,
        file_name: chunk.file_name.clone(),
        strategy,
    }
}

/// Turn one chunk into at most one example.
///
/// A single-word chunk always takes the whole-word path and skips the
/// validity filter. Everything else draws a mode, builds a candidate, then
/// draws an acceptance discipline and keeps the candidate only if it
/// satisfies it.
///
/// # Panics
///
/// When a rate is outside `[0, 1]`.
/// [`PipelineConfig::validate`](crate::config::PipelineConfig::validate)
/// rejects such configs.
pub fn mask_chunk<R: Rng + ?Sized>(chunk: &Chunk, config: &MaskingConfig, rng: &mut R) -> MaskOutcome {
    let text = chunk.text();
    let mut words = text.split_whitespace();
    if let (Some(word), None) = (words.next(), words.next()) {
        return match split_whole_word(word) {
            Some(split) => MaskOutcome::Example(example(chunk, split, MaskStrategy::WholeWord)),
            None => MaskOutcome::Unshaped,
        };
    }

    let mode = draw_mode(&config.mode_weights, rng);
    let Some(split) = apply_mode(mode, &text, config, rng) else {
        return MaskOutcome::Unshaped;
    };
    let discipline = draw_discipline(config.acceptance_psm_rate, rng);
    if !split.satisfies(discipline, config.spm_requires_empty_prefix) {
        debug!(
            "[fimcorpus:masking] {} {:?} candidate rejected under {:?}",
            chunk.block_id, mode, discipline
        );
        return MaskOutcome::Rejected { mode, discipline };
    }
    MaskOutcome::Example(example(chunk, split, mode.into()))
}
