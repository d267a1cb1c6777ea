/// Filesystem corpus reader.
pub mod fs;

pub use fs::{CorpusReader, CorpusScan, SkippedFile};
