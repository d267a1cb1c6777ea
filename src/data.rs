use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::chunking::BLOCK_ID_PREFIX;
use crate::oracle::SyntaxReport;

pub use crate::types::{FileId, FileName};

/// A decoded source file.
///
/// Lines keep their original trailing content (including `\n`) so that
/// concatenating them reproduces the file byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    id: FileId,
    lines: Vec<String>,
}

impl SourceFile {
    /// Build a file from already-split lines.
    pub fn new(id: impl Into<FileId>, lines: Vec<String>) -> Self {
        Self {
            id: id.into(),
            lines,
        }
    }

    /// Build a file by splitting `text` after every `\n`.
    pub fn from_text(id: impl Into<FileId>, text: &str) -> Self {
        let lines = text.split_inclusive('\n').map(str::to_string).collect();
        Self::new(id, lines)
    }

    /// Stable file id (path relative to the corpus root).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lines with their terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Base name of the id, falling back to the whole id.
    pub fn name(&self) -> FileName {
        Path::new(&self.id)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.clone())
    }

    /// Full text (lines concatenated as stored).
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

/// Named scoring dimension.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Keyword usage density.
    KeywordDensity,
    /// Share of code lines among non-blank lines.
    CommentRatio,
    /// Spread of per-line token counts.
    LengthDiversity,
    /// Mean per-line token entropy.
    Entropy,
    /// Inverse near-duplicate similarity.
    Repetition,
    /// Syntax oracle verdict.
    Compiles,
    /// Position of the line count inside the accepted range.
    LineCount,
}

impl Dimension {
    /// Every dimension in report order.
    pub const ALL: [Dimension; 7] = [
        Dimension::KeywordDensity,
        Dimension::CommentRatio,
        Dimension::LengthDiversity,
        Dimension::Entropy,
        Dimension::Repetition,
        Dimension::Compiles,
        Dimension::LineCount,
    ];

    /// Snake-case name used in reports and config.
    pub const fn as_str(self) -> &'static str {
        match self {
            Dimension::KeywordDensity => "keyword_density",
            Dimension::CommentRatio => "comment_ratio",
            Dimension::LengthDiversity => "length_diversity",
            Dimension::Entropy => "entropy",
            Dimension::Repetition => "repetition",
            Dimension::Compiles => "compiles",
            Dimension::LineCount => "line_count",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dimension's value: a score in `[0, 100]`, or not applicable.
///
/// The constructor clamps and maps NaN to 0, so a defined value is always
/// inside the range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionScore(Option<f64>);

impl DimensionScore {
    /// Not applicable (oracle unavailable, out-of-range line count).
    pub const UNDEFINED: DimensionScore = DimensionScore(None);

    /// Defined score, clamped into `[0, 100]`.
    pub fn defined(value: f64) -> Self {
        if value.is_nan() {
            return Self(Some(0.0));
        }
        Self(Some(value.clamp(0.0, 100.0)))
    }

    /// Clamp a defined value into range, or undefined.
    pub fn from_option(value: Option<f64>) -> Self {
        value.map(Self::defined).unwrap_or(Self::UNDEFINED)
    }

    /// The value, when defined.
    pub fn value(self) -> Option<f64> {
        self.0
    }

    /// True when defined.
    pub fn is_defined(self) -> bool {
        self.0.is_some()
    }
}

/// Scores for one file, created once after every dimension scorer ran.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileScore {
    /// Scored file.
    pub file_id: FileId,
    /// Line count of the file.
    pub total_lines: usize,
    /// One entry per dimension, in `Dimension::ALL` order.
    pub dimensions: IndexMap<Dimension, DimensionScore>,
    /// Weighted average over defined dimensions.
    pub overall: f64,
    /// Raw oracle outcome, when the oracle answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<SyntaxReport>,
}

impl FileScore {
    /// Score of `dimension`; undefined when absent.
    pub fn get(&self, dimension: Dimension) -> DimensionScore {
        self.dimensions
            .get(&dimension)
            .copied()
            .unwrap_or(DimensionScore::UNDEFINED)
    }
}

/// Stable identifier tying a chunk or example back to its file and position.
///
/// Both indices are 1-based. Rendered as `block_id_{file}_{chunk}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BlockId {
    /// 1-based position of the file in the run.
    pub file_index: usize,
    /// 1-based position of the chunk within its file.
    pub chunk_index: usize,
}

impl BlockId {
    /// Id from its two indices.
    pub const fn new(file_index: usize, chunk_index: usize) -> Self {
        Self {
            file_index,
            chunk_index,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            BLOCK_ID_PREFIX, self.file_index, self.chunk_index
        )
    }
}

impl From<BlockId> for String {
    fn from(value: BlockId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for BlockId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let rest = value
            .strip_prefix(BLOCK_ID_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| format!("block id '{value}' lacks the '{BLOCK_ID_PREFIX}_' prefix"))?;
        let (file, chunk) = rest
            .split_once('_')
            .ok_or_else(|| format!("block id '{value}' is missing a chunk index"))?;
        let file_index = file
            .parse::<usize>()
            .map_err(|_| format!("invalid file index in block id '{value}'"))?;
        let chunk_index = chunk
            .parse::<usize>()
            .map_err(|_| format!("invalid chunk index in block id '{value}'"))?;
        Ok(Self::new(file_index, chunk_index))
    }
}

/// Contiguous run of a file's lines; the unit the masker consumes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk id.
    pub block_id: BlockId,
    /// Id of the file the chunk came from.
    pub file_name: FileName,
    /// 0-based index of the first line inside the source file.
    pub start_line: usize,
    /// Chunk lines with their terminators.
    pub lines: Vec<String>,
}

impl Chunk {
    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Joined and trimmed chunk text.
    pub fn text(&self) -> String {
        self.lines.concat().trim().to_string()
    }
}

/// Ordering discipline of a FIM example.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// Prefix, suffix and middle all non-empty.
    Psm,
    /// Empty prefix; suffix and middle non-empty.
    Spm,
}

/// One of the five randomly drawn masking modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    /// mode1: one word.
    SingleWord,
    /// mode2: a run of words.
    WordSpan,
    /// mode3: one line.
    SingleLine,
    /// mode4: a run of lines.
    LineSpan,
    /// mode5: a block of lines (same mechanics as `LineSpan`).
    Block,
}

impl MaskMode {
    /// Every mode in draw order.
    pub const ALL: [MaskMode; 5] = [
        MaskMode::SingleWord,
        MaskMode::WordSpan,
        MaskMode::SingleLine,
        MaskMode::LineSpan,
        MaskMode::Block,
    ];
}

/// How an example's middle was selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskStrategy {
    /// See [`MaskMode::SingleWord`].
    SingleWord,
    /// See [`MaskMode::WordSpan`].
    WordSpan,
    /// See [`MaskMode::SingleLine`].
    SingleLine,
    /// See [`MaskMode::LineSpan`].
    LineSpan,
    /// See [`MaskMode::Block`].
    Block,
    /// Chunk was one word: first character given, rest predicted.
    WholeWord,
    /// Word drawn from a fixed line window of the raw file.
    KeywordSpan,
}

impl From<MaskMode> for MaskStrategy {
    fn from(value: MaskMode) -> Self {
        match value {
            MaskMode::SingleWord => MaskStrategy::SingleWord,
            MaskMode::WordSpan => MaskStrategy::WordSpan,
            MaskMode::SingleLine => MaskStrategy::SingleLine,
            MaskMode::LineSpan => MaskStrategy::LineSpan,
            MaskMode::Block => MaskStrategy::Block,
        }
    }
}

/// Prefix/middle/suffix training example.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FimExample {
    /// Text before the hole.
    pub prefix: String,
    /// Text to predict.
    pub middle: String,
    /// Text after the hole.
    pub suffix: String,
    /// Source chunk id.
    pub block_id: BlockId,
    /// Id of the file the chunk came from.
    pub file_name: FileName,
    /// How the middle was selected.
    pub strategy: MaskStrategy,
}

impl FimExample {
    /// Layout discipline implied by the content, if any.
    ///
    /// Single-token examples (empty suffix) have none.
    pub fn discipline(&self) -> Option<Discipline> {
        if self.middle.is_empty() || self.suffix.is_empty() {
            return None;
        }
        if self.prefix.is_empty() {
            Some(Discipline::Spm)
        } else {
            Some(Discipline::Psm)
        }
    }
}
