//! Batch driver: scoring pass, bucketing, generation pass, run summary.
//!
//! Files are processed in parallel; each worker owns a `DeterministicRng`
//! derived from the run seed and the file id, and returns its own results.
//! Results are merged in input order, so output does not depend on
//! scheduling.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::chunking::{chunk_file, is_too_short};
use crate::config::PipelineConfig;
use crate::data::{Chunk, FileScore, FimExample, SourceFile};
use crate::errors::CorpusError;
use crate::keyword_span::keyword_spans;
use crate::masking::{MaskOutcome, mask_chunk};
use crate::metrics::LineStats;
use crate::oracle::SyntaxValidator;
use crate::permute::{TokenRecord, Tokenizer, render_token_record};
use crate::rng::DeterministicRng;
use crate::scoring::{Assessment, QualityScorer, rank};
use crate::splits::{CorpusSplit, SplitLabel};
use crate::transport::CorpusScan;
use crate::types::{FileId, SkipReason};

const SCORING_STREAM: &str = "scoring";
const MASKING_STREAM: &str = "masking";
const KEYWORD_SPAN_STREAM: &str = "keyword_span";
const PERMUTE_STREAM: &str = "permute";

/// Batch-level counts; the only user-visible failure reporting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Wall-clock start of the run.
    pub started_at: Option<DateTime<Utc>>,
    /// Wall-clock end of the run.
    pub finished_at: Option<DateTime<Utc>>,
    /// Files decoded from the corpus.
    pub files_read: usize,
    /// Files skipped by the decoder.
    pub skipped_decode: usize,
    /// Files outside the line-count range.
    pub excluded_line_count: usize,
    /// Files the oracle could not judge.
    pub validator_failures: usize,
    /// Files that received a score.
    pub scored: usize,
    /// Scored files below the threshold.
    pub rejected_threshold: usize,
    /// Scored files at or above the threshold.
    pub accepted: usize,
    /// Files in the eval bucket.
    pub eval_files: usize,
    /// Files in the train bucket.
    pub train_files: usize,
    /// Files cut into chunks.
    pub chunked_files: usize,
    /// Files too short to chunk.
    pub short_file_skips: usize,
    /// Chunks emitted.
    pub chunks: usize,
    /// Masked candidates drawn.
    pub candidates: usize,
    /// Candidates dropped by the acceptance filter.
    pub rejected_candidates: usize,
    /// Chunks that could not take the drawn shape.
    pub unshaped_chunks: usize,
    /// Examples kept.
    pub examples: usize,
    /// Keyword-span examples emitted.
    pub keyword_spans: usize,
}

impl RunSummary {
    fn absorb_scoring(&mut self, run: &ScoringRun) {
        self.excluded_line_count += run.excluded.len();
        self.validator_failures += run.validator_failures.len();
        self.scored += run.accepted.len() + run.rejected.len();
        self.rejected_threshold += run.rejected.len();
        self.accepted += run.accepted.len();
    }

    fn absorb_generation(&mut self, run: &GenerationRun) {
        self.chunked_files += run.chunked_files;
        self.short_file_skips += run.short_file_skips;
        self.chunks += run.chunks.len();
        self.candidates += run.candidates;
        self.rejected_candidates += run.rejected_candidates;
        self.unshaped_chunks += run.unshaped_chunks;
        self.examples += run.examples.len();
        self.keyword_spans += run.keyword_spans.len();
    }
}

/// Output of the scoring pass.
#[derive(Debug, Default)]
pub struct ScoringRun {
    /// At or above the threshold, ranked.
    pub accepted: Vec<FileScore>,
    /// Below the threshold, ranked.
    pub rejected: Vec<FileScore>,
    /// `(file_id, total_lines)` of files outside the line-count range.
    pub excluded: Vec<(FileId, usize)>,
    /// Files the oracle could not judge; they are still scored.
    pub validator_failures: Vec<(FileId, SkipReason)>,
}

/// Output of the generation pass, merged in input order.
#[derive(Debug, Default)]
pub struct GenerationRun {
    /// Chunks in input order.
    pub chunks: Vec<Chunk>,
    /// Kept chunk examples.
    pub examples: Vec<FimExample>,
    /// Keyword-span examples.
    pub keyword_spans: Vec<FimExample>,
    /// Files cut into chunks.
    pub chunked_files: usize,
    /// Files too short to chunk.
    pub short_file_skips: usize,
    /// Masked candidates drawn.
    pub candidates: usize,
    /// Candidates dropped by the acceptance filter.
    pub rejected_candidates: usize,
    /// Chunks that could not take the drawn shape.
    pub unshaped_chunks: usize,
}

impl GenerationRun {
    fn merge(&mut self, other: GenerationRun) {
        self.chunks.extend(other.chunks);
        self.examples.extend(other.examples);
        self.keyword_spans.extend(other.keyword_spans);
        self.chunked_files += other.chunked_files;
        self.short_file_skips += other.short_file_skips;
        self.candidates += other.candidates;
        self.rejected_candidates += other.rejected_candidates;
        self.unshaped_chunks += other.unshaped_chunks;
    }
}

/// Everything one end-to-end run produced.
#[derive(Debug)]
pub struct PipelineRun {
    /// Scoring pass output.
    pub scoring: ScoringRun,
    /// Eval/train buckets.
    pub split: CorpusSplit,
    /// Generation pass output.
    pub generation: GenerationRun,
    /// Batch counts.
    pub summary: RunSummary,
}

/// Scores, buckets and samples a decoded corpus.
pub struct CorpusPipeline {
    config: PipelineConfig,
    scorer: QualityScorer,
    validator: Option<Arc<dyn SyntaxValidator>>,
}

impl CorpusPipeline {
    /// Build a pipeline after validating `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, CorpusError> {
        config.validate()?;
        let scorer = QualityScorer::new(config.scoring.clone());
        Ok(Self {
            config,
            scorer,
            validator: None,
        })
    }

    /// Attach a syntax oracle; without one `compiles` stays undefined.
    pub fn with_validator(mut self, validator: Arc<dyn SyntaxValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Scorer built from the configuration.
    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    /// Line statistics of every file with code lines, in input order.
    pub fn line_stats(&self, files: &[SourceFile]) -> Vec<LineStats> {
        let keywords = self.scorer.keywords();
        files
            .par_iter()
            .filter_map(|file| LineStats::from_file(file, keywords))
            .collect()
    }

    /// Score every file and split the results at the acceptance threshold.
    pub fn score_files(&self, files: &[SourceFile]) -> ScoringRun {
        let seed = self.config.seed;
        let validator = self.validator.as_deref();
        let assessments: Vec<Assessment> = files
            .par_iter()
            .map(|file| {
                let mut rng = DeterministicRng::for_file(seed, file.id(), SCORING_STREAM);
                self.scorer.score_file(file, validator, &mut rng)
            })
            .collect();

        let mut run = ScoringRun::default();
        for assessment in assessments {
            match assessment {
                Assessment::OutOfRange {
                    file_id,
                    total_lines,
                } => run.excluded.push((file_id, total_lines)),
                Assessment::Scored {
                    score,
                    validator_error,
                } => {
                    if let Some(err) = validator_error {
                        warn!("[fimcorpus:oracle] {err}");
                        run.validator_failures
                            .push((score.file_id.clone(), err.to_string()));
                    }
                    if self.scorer.accepts(&score) {
                        run.accepted.push(score);
                    } else {
                        run.rejected.push(score);
                    }
                }
            }
        }
        rank(&mut run.accepted);
        rank(&mut run.rejected);
        info!(
            "[fimcorpus:pipeline] scored {} files: accepted={} rejected={} excluded={} validator_failures={}",
            files.len(),
            run.accepted.len(),
            run.rejected.len(),
            run.excluded.len(),
            run.validator_failures.len()
        );
        run
    }

    /// Bucket accepted scores into eval/train.
    pub fn bucket(&self, accepted: Vec<FileScore>) -> CorpusSplit {
        CorpusSplit::bucket(accepted, &self.config.split)
    }

    fn generate_file(&self, file: &SourceFile, file_index: usize) -> GenerationRun {
        let seed = self.config.seed;
        let mut run = GenerationRun::default();
        if self.config.keyword_span.enabled {
            let mut rng = DeterministicRng::for_file(seed, file.id(), KEYWORD_SPAN_STREAM);
            run.keyword_spans =
                keyword_spans(file, file_index, &self.config.keyword_span, &mut rng);
        }
        if is_too_short(file, &self.config.chunking) {
            run.short_file_skips = 1;
            return run;
        }
        let mut rng = DeterministicRng::for_file(seed, file.id(), MASKING_STREAM);
        let chunks = chunk_file(file, file_index, &self.config.chunking, &mut rng);
        run.chunked_files = 1;
        for chunk in &chunks {
            match mask_chunk(chunk, &self.config.masking, &mut rng) {
                MaskOutcome::Example(example) => {
                    run.candidates += 1;
                    run.examples.push(example);
                }
                MaskOutcome::Rejected { .. } => {
                    run.candidates += 1;
                    run.rejected_candidates += 1;
                }
                MaskOutcome::Unshaped => run.unshaped_chunks += 1,
            }
        }
        run.chunks = chunks;
        run
    }

    /// Chunk and mask `files`; the file index used in block ids is the
    /// 1-based position in `files`.
    pub fn generate(&self, files: &[&SourceFile]) -> GenerationRun {
        let per_file: Vec<GenerationRun> = files
            .par_iter()
            .enumerate()
            .map(|(idx, file)| self.generate_file(file, idx + 1))
            .collect();
        let mut run = GenerationRun::default();
        for file_run in per_file {
            run.merge(file_run);
        }
        info!(
            "[fimcorpus:pipeline] generated from {} files: chunks={} examples={} rejected={} keyword_spans={}",
            files.len(),
            run.chunks.len(),
            run.examples.len(),
            run.rejected_candidates,
            run.keyword_spans.len()
        );
        run
    }

    /// Token-id FIM records, one per file.
    pub fn permute_files<T>(&self, files: &[&SourceFile], tokenizer: &T) -> Vec<TokenRecord>
    where
        T: Tokenizer + Sync + ?Sized,
    {
        let seed = self.config.seed;
        files
            .par_iter()
            .map(|file| {
                let mut rng = DeterministicRng::for_file(seed, file.id(), PERMUTE_STREAM);
                render_token_record(
                    file.id(),
                    &file.text(),
                    tokenizer,
                    &self.config.permute,
                    &mut rng,
                )
            })
            .collect()
    }

    /// Score, bucket, then generate from accepted files in input order.
    pub fn run(&self, scan: CorpusScan) -> PipelineRun {
        self.run_split(scan, None)
    }

    /// Like [`run`](Self::run), but when `selection` is set only files
    /// bucketed into that split feed the generation pass.
    pub fn run_split(&self, scan: CorpusScan, selection: Option<SplitLabel>) -> PipelineRun {
        let started = Instant::now();
        let mut summary = RunSummary {
            started_at: Some(Utc::now()),
            files_read: scan.files.len() + scan.skipped.len(),
            skipped_decode: scan.skipped.len(),
            ..RunSummary::default()
        };

        let scoring = self.score_files(&scan.files);
        summary.absorb_scoring(&scoring);

        let split = self.bucket(scoring.accepted.clone());
        summary.eval_files = split.eval.len();
        summary.train_files = split.train.len();

        let selected = match selection {
            Some(label) => split.files(label),
            None => scoring.accepted.as_slice(),
        };
        let selected_ids: HashSet<&str> =
            selected.iter().map(|score| score.file_id.as_str()).collect();
        let selected_files: Vec<&SourceFile> = scan
            .files
            .iter()
            .filter(|file| selected_ids.contains(file.id()))
            .collect();
        let generation = self.generate(&selected_files);
        summary.absorb_generation(&generation);
        summary.finished_at = Some(Utc::now());

        info!(
            "[fimcorpus:pipeline] run finished in {:.2}s (read={}, skipped={}, accepted={}, examples={})",
            started.elapsed().as_secs_f64(),
            summary.files_read,
            summary.skipped_decode,
            summary.accepted,
            summary.examples
        );
        PipelineRun {
            scoring,
            split,
            generation,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::oracle::SyntaxReport;
    use crate::permute::ByteTokenizer;

    struct FailingValidator;

    impl SyntaxValidator for FailingValidator {
        fn check(&self, file: &SourceFile) -> Result<SyntaxReport, CorpusError> {
            Err(CorpusError::ValidatorTimeout {
                file_id: file.id().to_string(),
                timeout: std::time::Duration::from_millis(1),
            })
        }
    }

    fn module(name: &str, body_lines: usize) -> SourceFile {
        let mut text = format!("module {name}(input clk, input [7:0] d, output reg [7:0] q);\n");
        for idx in 0..body_lines {
            text.push_str(&format!(
                "  // stage {idx}\n  always @(posedge clk) q[{}] <= d[{}] ^ {idx};\n",
                idx % 8,
                (idx + 3) % 8
            ));
        }
        text.push_str("endmodule\n");
        SourceFile::from_text(format!("rtl/{name}.v"), &text)
    }

    fn corpus() -> Vec<SourceFile> {
        vec![
            module("alpha", 30),
            module("beta", 12),
            SourceFile::from_text("rtl/tiny.v", "module tiny;\nendmodule\n"),
            module("gamma", 60),
        ]
    }

    #[test]
    fn runs_are_reproducible() {
        let pipeline = CorpusPipeline::new(PipelineConfig::default()).unwrap();
        let files = corpus();
        let refs: Vec<&SourceFile> = files.iter().collect();
        let first = pipeline.generate(&refs);
        let second = pipeline.generate(&refs);
        assert_eq!(first.chunks, second.chunks);
        assert_eq!(first.examples, second.examples);
        assert_eq!(first.keyword_spans, second.keyword_spans);

        let a = pipeline.score_files(&files);
        let b = pipeline.score_files(&files);
        let overall = |run: &ScoringRun| -> Vec<f64> {
            run.accepted.iter().map(|score| score.overall).collect()
        };
        assert_eq!(overall(&a), overall(&b));
    }

    #[test]
    fn block_ids_follow_input_position() {
        let pipeline = CorpusPipeline::new(PipelineConfig::default()).unwrap();
        let files = corpus();
        let refs: Vec<&SourceFile> = files.iter().collect();
        let run = pipeline.generate(&refs);
        assert_eq!(run.short_file_skips, 1);
        assert_eq!(run.chunked_files, 3);
        for chunk in &run.chunks {
            let expected_name = refs[chunk.block_id.file_index - 1].name();
            assert_eq!(chunk.file_name, expected_name);
        }
        let unique: HashSet<String> = run.chunks.iter().map(|c| c.block_id.to_string()).collect();
        assert_eq!(unique.len(), run.chunks.len());
        assert_eq!(run.candidates, run.examples.len() + run.rejected_candidates);
    }

    #[test]
    fn validator_failures_are_isolated() {
        let pipeline = CorpusPipeline::new(PipelineConfig::default())
            .unwrap()
            .with_validator(Arc::new(FailingValidator));
        let run = pipeline.score_files(&corpus());
        assert_eq!(run.excluded.len(), 1);
        assert_eq!(run.validator_failures.len(), 3);
        assert_eq!(run.accepted.len(), 3);
    }

    #[test]
    fn threshold_rejections_do_not_reach_generation() {
        let config = PipelineConfig {
            scoring: ScoringConfig {
                acceptance_threshold: 101.0,
                ..ScoringConfig::default()
            },
            ..PipelineConfig::default()
        };
        let pipeline = CorpusPipeline::new(config).unwrap();
        let run = pipeline.run(CorpusScan {
            files: corpus(),
            skipped: Vec::new(),
        });
        assert_eq!(run.summary.files_read, 4);
        assert_eq!(run.summary.rejected_threshold, 3);
        assert_eq!(run.summary.accepted, 0);
        assert_eq!(run.summary.examples, 0);
        assert!(run.split.is_empty());
    }

    #[test]
    fn permute_emits_one_record_per_file() {
        let pipeline = CorpusPipeline::new(PipelineConfig::default()).unwrap();
        let files = corpus();
        let refs: Vec<&SourceFile> = files.iter().collect();
        let records = pipeline.permute_files(&refs, &ByteTokenizer);
        assert_eq!(records.len(), files.len());
        assert!(records.iter().all(|record| record.masked.is_some()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.permute.fim_rate = 1.5;
        assert!(matches!(
            CorpusPipeline::new(config),
            Err(CorpusError::Configuration(_))
        ));
    }

    #[test]
    fn split_selection_limits_generation() {
        let config = PipelineConfig {
            split: crate::config::SplitConfig {
                eval_size: 1,
                train_limit: None,
            },
            ..PipelineConfig::default()
        };
        let pipeline = CorpusPipeline::new(config).unwrap();
        let scan = || CorpusScan {
            files: corpus(),
            skipped: Vec::new(),
        };
        let eval = pipeline.run_split(scan(), Some(SplitLabel::Eval));
        assert_eq!(eval.summary.eval_files, 1);
        assert_eq!(eval.summary.train_files, 2);
        assert_eq!(eval.generation.chunked_files, 1);
        let eval_name = eval.split.eval[0].file_id.rsplit('/').next().unwrap().to_string();
        assert!(eval.generation.chunks.iter().all(|chunk| chunk.file_name == eval_name));

        let all = pipeline.run(scan());
        assert_eq!(all.generation.chunked_files, 3);
    }
}
