/// Constants used by the quality scorer.
pub mod scoring {
    /// Verilog / SystemVerilog reserved words used as the default keyword set.
    pub const DEFAULT_KEYWORDS: &[&str] = &[
        "module",
        "endmodule",
        "input",
        "output",
        "inout",
        "wire",
        "reg",
        "integer",
        "parameter",
        "localparam",
        "function",
        "endfunction",
        "task",
        "endtask",
        "if",
        "else",
        "case",
        "casex",
        "casez",
        "endcase",
        "default",
        "for",
        "while",
        "repeat",
        "forever",
        "always",
        "initial",
        "assign",
        "begin",
        "end",
        "fork",
        "join",
        "posedge",
        "negedge",
        "generate",
        "endgenerate",
        "genvar",
        "bit",
        "logic",
        "byte",
        "shortint",
        "int",
        "longint",
        "shortreal",
        "chandle",
        "string",
        "enum",
        "struct",
        "union",
        "typedef",
        "signed",
        "unsigned",
        "interface",
        "endinterface",
        "modport",
        "class",
        "endclass",
        "extends",
        "implements",
        "virtual",
        "import",
        "export",
        "package",
        "assert",
        "assume",
        "cover",
        "expect",
        "property",
        "sequence",
        "rand",
        "randc",
        "constraint",
        "with",
        "inside",
    ];
    /// Inclusive line-count range outside of which files are excluded.
    pub const DEFAULT_LINE_COUNT_RANGE: (usize, usize) = (10, 400);
    /// Score assigned at the lower end of the accepted line-count range.
    pub const LINE_COUNT_SCORE_FLOOR: f64 = 20.0;
    /// Score assigned at the upper end of the accepted line-count range.
    pub const LINE_COUNT_SCORE_CEIL: f64 = 100.0;
    /// Fraction of code lines sampled by the repetition scorer.
    pub const DEFAULT_SAMPLE_RATE: f64 = 0.3;
    /// Upper bound on line pairs compared by the repetition scorer.
    pub const DEFAULT_MAX_COMPARED_PAIRS: usize = 100;
    /// Syntax error ratio at which the `compiles` dimension floors at zero.
    pub const DEFAULT_ERROR_RATIO_CAP: f64 = 0.2;
    /// Weight of `1 - keyword_ratio` in the keyword density score.
    pub const KEYWORD_RATIO_WEIGHT: f64 = 0.8;
    /// Weight of keyword diversity in the keyword density score.
    pub const KEYWORD_DIVERSITY_WEIGHT: f64 = 0.2;
    /// Placeholder substituted for digit runs before similarity comparison.
    pub const DIGIT_PLACEHOLDER: &str = "#";
    /// Placeholder substituted for letter runs before similarity comparison.
    pub const LETTER_PLACEHOLDER: &str = "@";
}

/// Constants used by line chunking.
pub mod chunking {
    /// Default weighted line-count ranges: `(weight, (min_lines, max_lines))`.
    pub const DEFAULT_LINE_RATIOS: &[(f64, (usize, usize))] = &[
        (0.05, (1, 1)),
        (0.05, (1, 10)),
        (0.1, (11, 20)),
        (0.1, (21, 30)),
        (0.2, (31, 40)),
        (0.1, (41, 50)),
        (0.2, (51, 60)),
        (0.1, (61, 80)),
        (0.1, (81, 100)),
    ];
    /// Files with this many lines or fewer produce no chunks.
    pub const DEFAULT_MIN_FILE_LINES: usize = 5;
    /// Hard cap on lines per chunk regardless of the drawn range.
    pub const DEFAULT_MAX_CHUNK_LINES: usize = 100;
    /// Prefix used when rendering block ids.
    pub const BLOCK_ID_PREFIX: &str = "block_id";
}

/// Constants used by the masker.
pub mod masking {
    /// Probability that line-span modes build a PSM-shaped split.
    pub const DEFAULT_CONSTRUCTION_PSM_RATE: f64 = 0.5;
    /// Probability that the validity filter applies the PSM contract.
    pub const DEFAULT_ACCEPTANCE_PSM_RATE: f64 = 0.5;
    /// Separator used to re-join words.
    pub const WORD_SEPARATOR: &str = " ";
    /// Separator used to re-join lines.
    pub const LINE_SEPARATOR: &str = "\n";
}

/// Constants used by the keyword-span strategy.
pub mod keyword_span {
    /// Lines per window.
    pub const DEFAULT_WINDOW_LINES: usize = 5;
    /// Random draws attempted per window before it is skipped.
    pub const DEFAULT_MAX_ATTEMPTS: usize = 100;
}

/// Constants used by token-id permutation.
pub mod permute {
    /// Probability that a sequence is permuted at all.
    pub const DEFAULT_FIM_RATE: f64 = 1.0;
    /// Probability that a permuted sequence uses the SPM layout.
    pub const DEFAULT_FIM_SPM_RATE: f64 = 0.5;
    /// Text rendering of the prefix marker.
    pub const FIM_PREFIX: &str = "<fim-prefix>";
    /// Text rendering of the middle marker.
    pub const FIM_MIDDLE: &str = "<fim-middle>";
    /// Text rendering of the suffix marker.
    pub const FIM_SUFFIX: &str = "<fim-suffix>";
    /// Text rendering of the pad marker.
    pub const FIM_PAD: &str = "<fim-pad>";
    /// Text rendering of the mask marker.
    pub const FIM_MASK: &str = "<fim-mask>";
    /// First reserved id of `ByteTokenizer` (ids below are raw bytes).
    pub const BYTE_TOKENIZER_SPECIAL_BASE: u32 = 256;
}

/// Constants used by export writers.
pub mod export {
    /// Language tag written on chunk and example records.
    pub const LANGUAGE_TAG: &str = "verilog";
    /// Prefix marker used in SFT prompt rendering.
    pub const SFT_PREFIX_MARKER: &str = "<|fim_prefix|>";
    /// Suffix marker used in SFT prompt rendering.
    pub const SFT_SUFFIX_MARKER: &str = "<|fim_suffix|>";
    /// Middle marker used in SFT prompt rendering.
    pub const SFT_MIDDLE_MARKER: &str = "<|fim_middle|>";
    /// Default number of top-ranked files placed in the eval split.
    pub const DEFAULT_EVAL_SIZE: usize = 300;
    /// Output file name for score rows.
    pub const SCORES_FILENAME: &str = "scores.jsonl";
    /// Output file name for per-file line statistics.
    pub const LINE_STATS_FILENAME: &str = "line_stats.jsonl";
    /// Output file name for the chunk stream.
    pub const CHUNKS_FILENAME: &str = "chunks.jsonl";
    /// Output file name for the chunk-based example stream.
    pub const EXAMPLES_FILENAME: &str = "examples.jsonl";
    /// Output file name for the keyword-span stream.
    pub const KEYWORD_SPANS_FILENAME: &str = "keyword_spans.jsonl";
    /// Output file name for SFT records.
    pub const SFT_FILENAME: &str = "sft.json";
    /// Output file name for token-id permutation records.
    pub const TOKEN_RECORDS_FILENAME: &str = "token_fim.jsonl";
    /// Output file name for the run summary.
    pub const SUMMARY_FILENAME: &str = "summary.json";
    /// Directory name for the materialized eval split.
    pub const EVAL_DIRNAME: &str = "eval";
    /// Directory name for the materialized train split.
    pub const TRAIN_DIRNAME: &str = "train";
}

/// Constants used by the filesystem corpus reader.
pub mod corpus {
    /// Extensions treated as HDL source files.
    pub const HDL_EXTENSIONS: &[&str] = &["v", "sv", "vh", "svh", "vp", "vlog"];
    /// Log message used when unreadable files are skipped.
    pub const SKIP_UNREADABLE_MSG: &str = "skipping unreadable source file";
}

/// Constants used by the external syntax oracle.
pub mod oracle {
    /// Program invoked by `IverilogValidator`.
    pub const IVERILOG_PROGRAM: &str = "iverilog";
    /// Default per-file timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Poll interval while waiting for the child process.
    pub const POLL_INTERVAL_MILLIS: u64 = 10;
}
