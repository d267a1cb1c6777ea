//! Output writers: JSONL streams, the SFT array and split materialization.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::constants::export::{
    LANGUAGE_TAG, SFT_MIDDLE_MARKER, SFT_PREFIX_MARKER, SFT_SUFFIX_MARKER,
};
use crate::data::{BlockId, Chunk, FimExample, MaskStrategy};
use crate::errors::CorpusError;
use crate::splits::{CorpusSplit, SplitLabel};
use crate::types::FileName;

/// Chunk stream row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Language tag, always `verilog`.
    pub language: String,
    /// Chunk text.
    pub code: String,
    /// Source chunk id.
    pub block_id: BlockId,
    /// Id of the file the chunk came from.
    pub file_name: FileName,
}

impl From<&Chunk> for ChunkRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            language: LANGUAGE_TAG.to_string(),
            code: chunk.text(),
            block_id: chunk.block_id,
            file_name: chunk.file_name.clone(),
        }
    }
}

/// Example stream row (chunk-based and keyword-span streams).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleRecord {
    /// Language tag, always `verilog`.
    pub language: String,
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

impl From<&FimExample> for ExampleRecord {
    fn from(example: &FimExample) -> Self {
        Self {
            language: LANGUAGE_TAG.to_string(),
            prefix: example.prefix.clone(),
            middle: example.middle.clone(),
            suffix: example.suffix.clone(),
            block_id: example.block_id,
            file_name: example.file_name.clone(),
            strategy: example.strategy,
        }
    }
}

/// Instruction-tuning row: the prompt carries prefix and suffix, the
/// expected output is the middle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SftRecord {
    /// Always empty.
    pub instruction: String,
    /// Marker-delimited prompt.
    pub input: String,
    /// Expected completion (the middle).
    pub output: String,
}

impl From<&FimExample> for SftRecord {
    fn from(example: &FimExample) -> Self {
        Self {
            instruction: String::new(),
            input: format!(
                "{SFT_PREFIX_MARKER}{}{SFT_SUFFIX_MARKER}{}{SFT_MIDDLE_MARKER}",
                example.prefix, example.suffix
            ),
            output: example.middle.clone(),
        }
    }
}

fn create_parent(path: &Path) -> Result<(), CorpusError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write one JSON object per line; returns the row count.
pub fn write_jsonl<T, I>(path: &Path, rows: I) -> Result<usize, CorpusError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    create_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for row in rows {
        serde_json::to_writer(&mut writer, &row)?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Write a pretty-printed JSON value (arrays, summaries).
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CorpusError> {
    create_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write `chunks` as chunk records, one JSON object per line.
pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<usize, CorpusError> {
    write_jsonl(path, chunks.iter().map(ChunkRecord::from))
}

/// Write `examples` as example records, one JSON object per line.
pub fn write_examples(path: &Path, examples: &[FimExample]) -> Result<usize, CorpusError> {
    write_jsonl(path, examples.iter().map(ExampleRecord::from))
}

/// Write examples as one SFT JSON array.
pub fn write_sft(path: &Path, examples: &[FimExample]) -> Result<usize, CorpusError> {
    let records: Vec<SftRecord> = examples.iter().map(SftRecord::from).collect();
    write_json(path, &records)?;
    Ok(records.len())
}

/// Copy split files from `corpus_root` into `out_dir/eval` and
/// `out_dir/train`, keeping each file's relative path. Existing split
/// directories are replaced.
pub fn materialize_split(
    split: &CorpusSplit,
    corpus_root: &Path,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, CorpusError> {
    let mut written = Vec::with_capacity(split.len());
    for label in [SplitLabel::Eval, SplitLabel::Train] {
        let dir = out_dir.join(label.dir_name());
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        for score in split.files(label) {
            let target = dir.join(&score.file_id);
            create_parent(&target)?;
            fs::copy(corpus_root.join(&score.file_id), &target)?;
            written.push(target);
        }
    }
    Ok(written)
}
