use fimcorpus::config::ScoringConfig;
use fimcorpus::data::{Dimension, SourceFile};
use fimcorpus::rng::DeterministicRng;
use fimcorpus::scoring::{
    Assessment, KeywordSet, QualityScorer, comment_ratio, entropy, keyword_density,
    length_diversity, rank, repetition,
};

fn verilog_keywords() -> KeywordSet {
    QualityScorer::new(ScoringConfig::default()).keywords().clone()
}

fn varied_module() -> SourceFile {
    SourceFile::from_text(
        "rtl/counter.v",
        "// 8-bit counter with synchronous reset\n\
         module counter #(parameter WIDTH = 8) (\n\
         \x20 input wire clk,\n\
         \x20 input wire rst,\n\
         \x20 output reg [WIDTH-1:0] count\n\
         );\n\
         \x20 /* increment on every rising edge\n\
         \x20    unless reset is held */\n\
         \x20 always @(posedge clk) begin\n\
         \x20   if (rst) count <= {WIDTH{1'b0}};\n\
         \x20   else count <= count + 1'b1;\n\
         \x20 end\n\
         \x20 assign overflow = &count;\n\
         endmodule\n",
    )
}

fn degenerate_files() -> Vec<SourceFile> {
    vec![
        SourceFile::from_text("empty.v", ""),
        SourceFile::from_text("one_line.v", "module m; endmodule\n"),
        SourceFile::from_text("comments.v", "// a\n// b\n/* c\n d */\n"),
        SourceFile::from_text("blank.v", "\n\n   \n"),
    ]
}

#[test]
fn comment_ratio_matches_mixed_comment_styles() {
    let lines = [
        "// c1\n",
        "code1;\n",
        "/* block\n",
        "still block */\n",
        "code2;\n",
    ];
    assert!((comment_ratio(&lines) - 40.0).abs() < 1e-9);
}

#[test]
fn identical_lines_score_low_on_diversity_and_repetition() {
    let lines = vec!["wire a;\n"; 12];
    assert!(length_diversity(&lines) < 1e-9);
    for seed in 0..16 {
        let mut rng = DeterministicRng::new(seed);
        assert!(repetition(&lines, 0.3, 100, &mut rng) < 1e-9);
    }
    // 24 tokens, 12 keyword hits, one distinct keyword.
    let expected = 100.0 * (0.8 * 0.5 + 0.2 / 12.0);
    assert!((keyword_density(&lines, &verilog_keywords()) - expected).abs() < 1e-9);
}

#[test]
fn degenerate_content_scores_zero_without_failing() {
    let keywords = verilog_keywords();
    for file in degenerate_files() {
        let lines = file.lines();
        let mut rng = DeterministicRng::new(3);
        assert_eq!(length_diversity(lines), 0.0, "{}", file.id());
        assert_eq!(repetition(lines, 0.3, 100, &mut rng), 0.0, "{}", file.id());
        if file.id() != "one_line.v" {
            assert_eq!(keyword_density(lines, &keywords), 0.0, "{}", file.id());
            assert_eq!(entropy(lines), 0.0, "{}", file.id());
        }
    }
}

#[test]
fn every_defined_dimension_stays_in_range() {
    let scorer = QualityScorer::new(ScoringConfig {
        line_count_range: (0, 1000),
        ..ScoringConfig::default()
    });
    let mut files = degenerate_files();
    files.push(varied_module());
    for seed in 0..32 {
        for file in &files {
            let mut rng = DeterministicRng::for_file(seed, file.id(), "scoring");
            let assessment = scorer.score_file(file, None, &mut rng);
            let score = assessment.score().expect("range covers every file");
            for dimension in Dimension::ALL {
                if let Some(value) = score.get(dimension).value() {
                    assert!(
                        (0.0..=100.0).contains(&value),
                        "{dimension} = {value} for {}",
                        file.id()
                    );
                }
            }
            assert!(score.get(Dimension::Compiles).value().is_none());
            assert!((0.0..=100.0).contains(&score.overall));
        }
    }
}

#[test]
fn files_outside_line_range_are_excluded() {
    let scorer = QualityScorer::new(ScoringConfig::default());
    let mut rng = DeterministicRng::new(1);
    let short = SourceFile::from_text("short.v", "module m;\nendmodule\n");
    match scorer.score_file(&short, None, &mut rng) {
        Assessment::OutOfRange {
            file_id,
            total_lines,
        } => {
            assert_eq!(file_id, "short.v");
            assert_eq!(total_lines, 2);
        }
        other => panic!("expected exclusion, got {other:?}"),
    }
}

#[test]
fn varied_code_outranks_boilerplate() {
    let scorer = QualityScorer::new(ScoringConfig::default());
    let boilerplate = SourceFile::from_text("boiler.v", &"wire a;\n".repeat(14));
    let mut scores: Vec<_> = [varied_module(), boilerplate]
        .iter()
        .filter_map(|file| {
            let mut rng = DeterministicRng::for_file(9, file.id(), "scoring");
            scorer.score_file(file, None, &mut rng).into_score()
        })
        .collect();
    rank(&mut scores);
    assert_eq!(scores[0].file_id, "rtl/counter.v");
    assert!(scores[0].overall > scores[1].overall);
}
