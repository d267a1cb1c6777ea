//! Token-id fill-in-the-middle permutation.
//!
//! A token sequence is cut at two random boundaries and re-laid out with
//! marker tokens in PSM or SPM order. The masked view keeps everything up to
//! the middle marker and replaces the rest with the mask id, for rendering a
//! prompt-only copy beside the full one.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::PermuteConfig;
use crate::constants::permute::{
    BYTE_TOKENIZER_SPECIAL_BASE, FIM_MASK, FIM_MIDDLE, FIM_PAD, FIM_PREFIX, FIM_SUFFIX,
};
use crate::types::{FileId, TokenId};

/// Reserved marker ids; disjoint from every id `encode` produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FimSpecialTokens {
    /// Marker before the prefix tokens.
    pub prefix: TokenId,
    /// Marker before the middle tokens.
    pub middle: TokenId,
    /// Marker before the suffix tokens.
    pub suffix: TokenId,
    /// Padding id.
    pub pad: TokenId,
    /// Placeholder id standing in for hidden middle tokens.
    pub mask: TokenId,
}

impl FimSpecialTokens {
    /// True when `id` is one of the markers.
    pub fn contains(&self, id: TokenId) -> bool {
        [self.prefix, self.middle, self.suffix, self.pad, self.mask].contains(&id)
    }
}

/// Text tokenizer used by the token-id variant.
pub trait Tokenizer {
    /// Text to token ids; never yields a special id.
    fn encode(&self, text: &str) -> Vec<TokenId>;
    /// Token ids back to text.
    fn decode(&self, tokens: &[TokenId]) -> String;
    /// Marker ids used by the permutation.
    fn special_tokens(&self) -> FimSpecialTokens;
}

/// Marker ordering of a permuted sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FimLayout {
    /// `[P] prefix [S] suffix [M] middle`
    Psm,
    /// `[P][S] suffix [M] prefix middle`
    Spm,
}

/// Output of `permute`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FimSequence {
    /// Rearranged token ids.
    pub tokens: Vec<TokenId>,
    /// `None` when the sample was left unpermuted.
    pub layout: Option<FimLayout>,
    /// Sorted cut points into the original sample.
    pub boundaries: Option<(usize, usize)>,
}

impl FimSequence {
    /// Position of the middle marker, if the sequence was permuted.
    pub fn middle_marker_index(&self, specials: &FimSpecialTokens) -> Option<usize> {
        self.layout?;
        self.tokens.iter().position(|id| *id == specials.middle)
    }

    /// Copy with every token after the middle marker replaced by the mask id.
    ///
    /// Length is preserved; `None` for unpermuted sequences.
    pub fn masked_view(&self, specials: &FimSpecialTokens) -> Option<Vec<TokenId>> {
        let marker = self.middle_marker_index(specials)?;
        let mut masked = self.tokens[..=marker].to_vec();
        masked.resize(self.tokens.len(), specials.mask);
        Some(masked)
    }

    /// Recover the original sample from a permuted sequence.
    pub fn restore(&self, specials: &FimSpecialTokens) -> Vec<TokenId> {
        let (Some(layout), Some((b0, b1))) = (self.layout, self.boundaries) else {
            return self.tokens.clone();
        };
        let mut restored = Vec::with_capacity(self.tokens.len().saturating_sub(3));
        match layout {
            FimLayout::Psm => {
                // [P] prefix [S] suffix [M] middle
                let prefix_len = b0;
                let Some(suffix_marker) = self.tokens.iter().position(|id| *id == specials.suffix)
                else {
                    return restored;
                };
                let Some(middle_marker) = self.middle_marker_index(specials) else {
                    return restored;
                };
                restored.extend_from_slice(&self.tokens[1..1 + prefix_len]);
                restored.extend_from_slice(&self.tokens[middle_marker + 1..]);
                restored.extend_from_slice(&self.tokens[suffix_marker + 1..middle_marker]);
            }
            FimLayout::Spm => {
                // [P][S] suffix [M] prefix middle
                let Some(middle_marker) = self.middle_marker_index(specials) else {
                    return restored;
                };
                let tail = &self.tokens[middle_marker + 1..];
                let (prefix, middle) = tail.split_at(b0.min(tail.len()));
                debug_assert_eq!(middle.len(), b1 - b0);
                restored.extend_from_slice(prefix);
                restored.extend_from_slice(middle);
                restored.extend_from_slice(&self.tokens[2..middle_marker]);
            }
        }
        restored
    }
}

/// Permute `sample` with probability `fim_rate`; SPM with probability
/// `fim_spm_rate`, PSM otherwise.
///
/// Boundaries are two independent draws from `[0, len]`, sorted, so any of
/// the three spans may be empty.
///
/// # Panics
///
/// When `fim_rate` or `fim_spm_rate` is outside `[0, 1]`.
/// [`PipelineConfig::validate`](crate::config::PipelineConfig::validate)
/// rejects such configs.
pub fn permute<R: Rng + ?Sized>(
    sample: &[TokenId],
    specials: &FimSpecialTokens,
    config: &PermuteConfig,
    rng: &mut R,
) -> FimSequence {
    if !rng.random_bool(config.fim_rate) {
        return FimSequence {
            tokens: sample.to_vec(),
            layout: None,
            boundaries: None,
        };
    }
    let mut cuts = [
        rng.random_range(0..=sample.len()),
        rng.random_range(0..=sample.len()),
    ];
    cuts.sort_unstable();
    let [b0, b1] = cuts;
    let (prefix, middle, suffix) = (&sample[..b0], &sample[b0..b1], &sample[b1..]);

    let mut tokens = Vec::with_capacity(sample.len() + 3);
    let layout = if rng.random_bool(config.fim_spm_rate) {
        tokens.extend([specials.prefix, specials.suffix]);
        tokens.extend_from_slice(suffix);
        tokens.push(specials.middle);
        tokens.extend_from_slice(prefix);
        tokens.extend_from_slice(middle);
        FimLayout::Spm
    } else {
        tokens.push(specials.prefix);
        tokens.extend_from_slice(prefix);
        tokens.push(specials.suffix);
        tokens.extend_from_slice(suffix);
        tokens.push(specials.middle);
        tokens.extend_from_slice(middle);
        FimLayout::Psm
    };
    FimSequence {
        tokens,
        layout: Some(layout),
        boundaries: Some((b0, b1)),
    }
}

/// Full and prompt-only renderings of one permuted file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Source file.
    pub file_id: FileId,
    /// Layout drawn for the file; `None` when left unpermuted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<FimLayout>,
    /// Decoded permuted sequence.
    pub full: String,
    /// Decoded sequence with the middle hidden.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked: Option<String>,
}

/// Encode `text`, permute it, and decode both views.
pub fn render_token_record<T, R>(
    file_id: &str,
    text: &str,
    tokenizer: &T,
    config: &PermuteConfig,
    rng: &mut R,
) -> TokenRecord
where
    T: Tokenizer + ?Sized,
    R: Rng + ?Sized,
{
    let specials = tokenizer.special_tokens();
    let sequence = permute(&tokenizer.encode(text), &specials, config, rng);
    TokenRecord {
        file_id: file_id.to_string(),
        layout: sequence.layout,
        full: tokenizer.decode(&sequence.tokens),
        masked: sequence
            .masked_view(&specials)
            .map(|masked| tokenizer.decode(&masked)),
    }
}

/// Byte-level reference tokenizer: ids `0..=255` are raw bytes, the five
/// markers follow at `256..=260`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByteTokenizer;

impl ByteTokenizer {
    const SPECIALS: FimSpecialTokens = FimSpecialTokens {
        prefix: BYTE_TOKENIZER_SPECIAL_BASE,
        middle: BYTE_TOKENIZER_SPECIAL_BASE + 1,
        suffix: BYTE_TOKENIZER_SPECIAL_BASE + 2,
        pad: BYTE_TOKENIZER_SPECIAL_BASE + 3,
        mask: BYTE_TOKENIZER_SPECIAL_BASE + 4,
    };

    fn marker_text(id: TokenId) -> &'static str {
        let specials = Self::SPECIALS;
        match id {
            _ if id == specials.prefix => FIM_PREFIX,
            _ if id == specials.middle => FIM_MIDDLE,
            _ if id == specials.suffix => FIM_SUFFIX,
            _ if id == specials.pad => FIM_PAD,
            _ if id == specials.mask => FIM_MASK,
            _ => "\u{FFFD}",
        }
    }
}

impl Tokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        text.bytes().map(TokenId::from).collect()
    }

    fn decode(&self, tokens: &[TokenId]) -> String {
        let mut out = String::new();
        let mut bytes = Vec::new();
        for id in tokens {
            match u8::try_from(*id) {
                Ok(byte) => bytes.push(byte),
                Err(_) => {
                    out.push_str(&String::from_utf8_lossy(&bytes));
                    bytes.clear();
                    out.push_str(Self::marker_text(*id));
                }
            }
        }
        out.push_str(&String::from_utf8_lossy(&bytes));
        out
    }

    fn special_tokens(&self) -> FimSpecialTokens {
        Self::SPECIALS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    #[test]
    #[should_panic]
    fn out_of_range_fim_rate_panics() {
        let config = PermuteConfig {
            fim_rate: 1.5,
            fim_spm_rate: 0.5,
        };
        let mut rng = DeterministicRng::new(1);
        permute(&[1, 2, 3], &ByteTokenizer.special_tokens(), &config, &mut rng);
    }

    fn always(spm_rate: f64) -> PermuteConfig {
        PermuteConfig {
            fim_rate: 1.0,
            fim_spm_rate: spm_rate,
        }
    }

    #[test]
    fn permutation_preserves_tokens_and_restores() {
        let tokenizer = ByteTokenizer;
        let specials = tokenizer.special_tokens();
        let sample = tokenizer.encode("module top; wire w; assign w = 1'b1; endmodule\n");
        for seed in 0..200 {
            for spm_rate in [0.0, 1.0, 0.5] {
                let mut rng = DeterministicRng::new(seed);
                let sequence = permute(&sample, &specials, &always(spm_rate), &mut rng);
                assert_eq!(sequence.tokens.len(), sample.len() + 3);
                let (b0, b1) = sequence.boundaries.unwrap();
                assert!(b0 <= b1 && b1 <= sample.len());
                assert_eq!(sequence.restore(&specials), sample, "seed {seed}");
            }
        }
    }

    #[test]
    fn psm_layout_decodes_in_marker_order() {
        let tokenizer = ByteTokenizer;
        let specials = tokenizer.special_tokens();
        let sample = tokenizer.encode("abcdef");
        let mut rng = DeterministicRng::new(17);
        let sequence = permute(&sample, &specials, &always(0.0), &mut rng);
        assert_eq!(sequence.layout, Some(FimLayout::Psm));
        let (b0, b1) = sequence.boundaries.unwrap();
        let expected = format!(
            "{FIM_PREFIX}{}{FIM_SUFFIX}{}{FIM_MIDDLE}{}",
            &"abcdef"[..b0],
            &"abcdef"[b1..],
            &"abcdef"[b0..b1]
        );
        assert_eq!(tokenizer.decode(&sequence.tokens), expected);
    }

    #[test]
    fn spm_layout_puts_prefix_and_middle_after_marker() {
        let tokenizer = ByteTokenizer;
        let specials = tokenizer.special_tokens();
        let sample = tokenizer.encode("abcdef");
        let mut rng = DeterministicRng::new(23);
        let sequence = permute(&sample, &specials, &always(1.0), &mut rng);
        assert_eq!(sequence.layout, Some(FimLayout::Spm));
        assert_eq!(&sequence.tokens[..2], &[specials.prefix, specials.suffix]);
        let (b0, b1) = sequence.boundaries.unwrap();
        let expected = format!(
            "{FIM_PREFIX}{FIM_SUFFIX}{}{FIM_MIDDLE}{}{}",
            &"abcdef"[b1..],
            &"abcdef"[..b0],
            &"abcdef"[b0..b1]
        );
        assert_eq!(tokenizer.decode(&sequence.tokens), expected);
    }

    #[test]
    fn masked_view_replaces_everything_after_middle_marker() {
        let tokenizer = ByteTokenizer;
        let specials = tokenizer.special_tokens();
        let sample = tokenizer.encode("always @(posedge clk) q <= d;");
        for seed in 0..50 {
            let mut rng = DeterministicRng::new(seed);
            let sequence = permute(&sample, &specials, &always(0.5), &mut rng);
            let marker = sequence.middle_marker_index(&specials).unwrap();
            let masked = sequence.masked_view(&specials).unwrap();
            assert_eq!(masked.len(), sequence.tokens.len());
            assert_eq!(&masked[..=marker], &sequence.tokens[..=marker]);
            assert!(masked[marker + 1..].iter().all(|id| *id == specials.mask));
        }
    }

    #[test]
    fn zero_fim_rate_leaves_sample_untouched() {
        let tokenizer = ByteTokenizer;
        let specials = tokenizer.special_tokens();
        let sample = tokenizer.encode("wire a;");
        let config = PermuteConfig {
            fim_rate: 0.0,
            fim_spm_rate: 0.5,
        };
        let sequence = permute(&sample, &specials, &config, &mut DeterministicRng::new(1));
        assert_eq!(sequence.tokens, sample);
        assert_eq!(sequence.layout, None);
        assert_eq!(sequence.masked_view(&specials), None);
        assert_eq!(sequence.restore(&specials), sample);
    }

    #[test]
    fn empty_sample_still_gets_markers() {
        let specials = ByteTokenizer.special_tokens();
        let sequence = permute(&[], &specials, &always(0.0), &mut DeterministicRng::new(2));
        assert_eq!(
            sequence.tokens,
            vec![specials.prefix, specials.suffix, specials.middle]
        );
        assert_eq!(sequence.masked_view(&specials).unwrap(), sequence.tokens);
    }

    #[test]
    fn byte_tokenizer_round_trips_utf8_and_markers() {
        let tokenizer = ByteTokenizer;
        let text = "// résumé ✓\nmodule m; endmodule";
        assert_eq!(tokenizer.decode(&tokenizer.encode(text)), text);
        let specials = tokenizer.special_tokens();
        assert!(specials.contains(260));
        assert!(!tokenizer.encode(text).iter().any(|id| specials.contains(*id)));
        let mut tokens = tokenizer.encode("ab");
        tokens.insert(1, specials.mask);
        assert_eq!(tokenizer.decode(&tokens), format!("a{FIM_MASK}b"));
    }

    #[test]
    fn token_record_renders_both_views() {
        let record = render_token_record(
            "x.v",
            "assign y = a & b;",
            &ByteTokenizer,
            &always(0.0),
            &mut DeterministicRng::new(5),
        );
        assert_eq!(record.layout, Some(FimLayout::Psm));
        assert!(record.full.starts_with(FIM_PREFIX));
        let masked = record.masked.unwrap();
        assert!(masked.contains(FIM_MIDDLE));
        let after = masked.split(FIM_MIDDLE).nth(1).unwrap();
        assert!(after.is_empty() || after.split(FIM_MASK).all(str::is_empty));
    }
}
