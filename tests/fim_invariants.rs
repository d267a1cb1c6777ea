use std::collections::HashSet;

use fimcorpus::chunking::chunk_file;
use fimcorpus::config::{ChunkingConfig, KeywordSpanConfig, MaskingConfig, PermuteConfig};
use fimcorpus::data::{Discipline, FimExample, MaskStrategy, SourceFile};
use fimcorpus::keyword_span::keyword_spans;
use fimcorpus::masking::{MaskOutcome, mask_chunk};
use fimcorpus::permute::{ByteTokenizer, FimLayout, Tokenizer, permute};
use fimcorpus::rng::DeterministicRng;

fn alu(lines: usize) -> SourceFile {
    let mut text = String::from("module alu(input [3:0] op, input [31:0] a, b, output reg [31:0] y);\n");
    for idx in 1..lines.saturating_sub(1) {
        text.push_str(&format!("  // op {idx}\n  always @* if (op == {idx}) y = a + (b >> {idx});\n"));
    }
    text.push_str("endmodule\n");
    SourceFile::from_text("rtl/alu.v", &text)
}

fn examples_for(file: &SourceFile, config: &MaskingConfig, seed: u64) -> (Vec<FimExample>, usize) {
    let mut rng = DeterministicRng::new(seed);
    let chunks = chunk_file(file, 1, &ChunkingConfig::default(), &mut rng);
    let mut examples = Vec::new();
    let mut rejected = 0;
    for chunk in &chunks {
        match mask_chunk(chunk, config, &mut rng) {
            MaskOutcome::Example(example) => examples.push(example),
            MaskOutcome::Rejected { .. } => rejected += 1,
            MaskOutcome::Unshaped => {}
        }
    }
    (examples, rejected)
}

#[test]
fn four_line_file_yields_no_chunks() {
    let file = SourceFile::new(
        "small.v",
        vec![
            "module m;\n".to_string(),
            "wire a;\n".to_string(),
            "wire b;\n".to_string(),
            "endmodule\n".to_string(),
        ],
    );
    for seed in 0..8 {
        let mut rng = DeterministicRng::new(seed);
        assert!(chunk_file(&file, 1, &ChunkingConfig::default(), &mut rng).is_empty());
    }
}

#[test]
fn chunks_cover_the_file_in_order() {
    let file = alu(120);
    for seed in 0..24 {
        let mut rng = DeterministicRng::new(seed);
        let config = ChunkingConfig::default();
        let chunks = chunk_file(&file, 3, &config, &mut rng);
        let mut next_line = 0;
        for chunk in &chunks {
            assert_eq!(chunk.start_line, next_line);
            assert!(chunk.line_count() >= 1);
            assert!(chunk.line_count() <= config.max_chunk_lines);
            next_line += chunk.line_count();
        }
        assert_eq!(next_line, file.line_count());
        let ids: HashSet<String> = chunks.iter().map(|c| c.block_id.to_string()).collect();
        assert_eq!(ids.len(), chunks.len());
        assert!(chunks.iter().all(|c| c.block_id.file_index == 3));
    }
}

#[test]
fn accepted_examples_honor_their_layout() {
    let file = alu(90);
    let config = MaskingConfig::default();
    let mut total_rejected = 0;
    let mut total_examples = 0;
    for seed in 0..64 {
        let (examples, rejected) = examples_for(&file, &config, seed);
        total_rejected += rejected;
        total_examples += examples.len();
        for example in examples {
            assert!(!example.middle.is_empty() || example.strategy == MaskStrategy::WholeWord);
            match example.discipline() {
                Some(Discipline::Psm) => {
                    assert!(!example.prefix.is_empty());
                    assert!(!example.suffix.is_empty());
                }
                Some(Discipline::Spm) => {
                    assert!(example.prefix.is_empty());
                    assert!(!example.suffix.is_empty());
                }
                None => assert!(example.suffix.is_empty()),
            }
        }
    }
    assert!(total_examples > 0);
    // The acceptance discipline is drawn independently, so some candidates fail.
    assert!(total_rejected > 0);
}

#[test]
fn strict_spm_acceptance_requires_empty_prefix() {
    let file = alu(90);
    let config = MaskingConfig {
        acceptance_psm_rate: 0.0,
        spm_requires_empty_prefix: true,
        ..MaskingConfig::default()
    };
    for seed in 0..32 {
        let (examples, _) = examples_for(&file, &config, seed);
        for example in examples
            .iter()
            .filter(|example| example.strategy != MaskStrategy::WholeWord)
        {
            assert_eq!(example.prefix, "");
            assert!(!example.middle.is_empty());
            assert!(!example.suffix.is_empty());
        }
    }
}

#[test]
fn keyword_spans_are_single_token_completions() {
    let file = alu(40);
    let config = KeywordSpanConfig::default();
    let mut rng = DeterministicRng::new(5);
    let spans = keyword_spans(&file, 2, &config, &mut rng);
    let windows = file.line_count().div_ceil(config.window_lines);
    assert!(!spans.is_empty());
    assert!(spans.len() <= windows);
    for (idx, span) in spans.iter().enumerate() {
        assert_eq!(span.strategy, MaskStrategy::KeywordSpan);
        assert_eq!(span.prefix.chars().count(), 1);
        assert!(span.prefix.chars().all(char::is_alphabetic));
        assert_eq!(span.suffix, "");
        assert_eq!(span.block_id.chunk_index, idx + 1);
        assert_eq!(span.file_name, "alu.v");
    }
}

#[test]
fn token_permutation_round_trips() {
    let tokenizer = ByteTokenizer;
    let specials = tokenizer.special_tokens();
    let sample = tokenizer.encode("assign y = a ^ b;\nendmodule\n");
    let config = PermuteConfig::default();
    let mut layouts = HashSet::new();
    for seed in 0..64 {
        let mut rng = DeterministicRng::new(seed);
        let sequence = permute(&sample, &specials, &config, &mut rng);
        let layout = sequence.layout.expect("fim_rate defaults to 1.0");
        layouts.insert(format!("{layout:?}"));
        assert_eq!(sequence.tokens.len(), sample.len() + 3);
        assert_eq!(sequence.restore(&specials), sample);
        let masked = sequence.masked_view(&specials).unwrap();
        let marker = sequence.middle_marker_index(&specials).unwrap();
        assert_eq!(masked.len(), sequence.tokens.len());
        assert_eq!(masked[..=marker], sequence.tokens[..=marker]);
        assert!(masked[marker + 1..].iter().all(|id| *id == specials.mask));
        if layout == FimLayout::Spm {
            assert_eq!(sequence.tokens[..2], [specials.prefix, specials.suffix]);
        }
    }
    assert_eq!(layouts.len(), 2);
}

#[test]
fn zero_fim_rate_leaves_tokens_untouched() {
    let tokenizer = ByteTokenizer;
    let specials = tokenizer.special_tokens();
    let sample = tokenizer.encode("wire w;");
    let config = PermuteConfig {
        fim_rate: 0.0,
        ..PermuteConfig::default()
    };
    let mut rng = DeterministicRng::new(11);
    let sequence = permute(&sample, &specials, &config, &mut rng);
    assert_eq!(sequence.tokens, sample);
    assert!(sequence.layout.is_none());
    assert!(sequence.masked_view(&specials).is_none());
}
