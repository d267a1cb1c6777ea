use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::constants::corpus::{HDL_EXTENSIONS, SKIP_UNREADABLE_MSG};
use crate::data::SourceFile;
use crate::errors::CorpusError;
use crate::types::{FileId, SkipReason};

/// A file the reader found but could not turn into a `SourceFile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Result of one corpus scan.
#[derive(Debug, Default)]
pub struct CorpusScan {
    /// Decoded files, sorted by id.
    pub files: Vec<SourceFile>,
    /// Files that could not be decoded.
    pub skipped: Vec<SkippedFile>,
}

/// Filesystem corpus reader for HDL sources under a root directory.
pub struct CorpusReader {
    root: PathBuf,
    recursive: bool,
    follow_links: bool,
    extensions: Vec<String>,
}

impl CorpusReader {
    /// Recursive reader rooted at `root` accepting the default HDL extensions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: true,
            follow_links: false,
            extensions: HDL_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// Descend into subdirectories (default on).
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Follow symlinked files and directories (default off).
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Replace the accepted extensions (compared case-insensitively, no dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Corpus root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Candidate paths in sorted order.
    pub fn candidates(&self) -> Result<Vec<PathBuf>, CorpusError> {
        if !self.root.is_dir() {
            return Err(CorpusError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("corpus root {} is not a directory", self.root.display()),
            )));
        }
        let mut walker = WalkDir::new(&self.root).follow_links(self.follow_links);
        if !self.recursive {
            walker = walker.max_depth(1);
        }
        let mut paths: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && self.accepts(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// File id for `path`: the path relative to the root, `/`-separated.
    pub fn file_id(&self, path: &Path) -> FileId {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read and decode every candidate file. Per-file failures are collected
    /// as skips; only a missing root fails the scan.
    pub fn scan(&self) -> Result<CorpusScan, CorpusError> {
        let mut scan = CorpusScan::default();
        for path in self.candidates()? {
            match read_source(&path) {
                Ok(text) => scan
                    .files
                    .push(SourceFile::from_text(self.file_id(&path), &text)),
                Err(err) => {
                    warn!("[fimcorpus:reader] {SKIP_UNREADABLE_MSG}: {err}");
                    scan.skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }
        debug!(
            "[fimcorpus:reader] {} files decoded, {} skipped under {}",
            scan.files.len(),
            scan.skipped.len(),
            self.root.display()
        );
        Ok(scan)
    }
}

/// Read one file and decode it.
pub fn read_source(path: &Path) -> Result<String, CorpusError> {
    let bytes = fs::read(path)?;
    decode_source(&bytes).map_err(|reason| CorpusError::Decode {
        path: path.to_path_buf(),
        reason,
    })
}

/// UTF-8 first (BOM stripped), Latin-1 as fallback. Bytes containing NUL are
/// treated as binary and rejected.
pub fn decode_source(bytes: &[u8]) -> Result<String, SkipReason> {
    if bytes.contains(&0) {
        return Err("contains NUL bytes".to_string());
    }
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => Ok(bytes.iter().copied().map(char::from).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn decodes_utf8_then_latin1() {
        assert_eq!(decode_source("wire é;".as_bytes()).unwrap(), "wire é;");
        assert_eq!(decode_source(b"\xEF\xBB\xBFmodule").unwrap(), "module");
        assert_eq!(decode_source(b"// caf\xE9\n").unwrap(), "// café\n");
        assert!(decode_source(b"bin\0ary").is_err());
    }

    #[test]
    fn scan_filters_extensions_and_reports_skips() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("rtl/sub")).unwrap();
        fs::write(root.join("rtl/b.v"), "module b;\nendmodule\n").unwrap();
        fs::write(root.join("rtl/sub/a.SV"), "module a;\nendmodule\n").unwrap();
        fs::write(root.join("top.vh"), "`define W 8\n").unwrap();
        fs::write(root.join("notes.txt"), "not hdl\n").unwrap();
        fs::write(root.join("blob.v"), b"\x00\x01\x02").unwrap();

        let scan = CorpusReader::new(root).scan().unwrap();
        let ids: Vec<&str> = scan.files.iter().map(SourceFile::id).collect();
        assert_eq!(ids, vec!["rtl/b.v", "rtl/sub/a.SV", "top.vh"]);
        assert_eq!(scan.files[0].lines(), &["module b;\n", "endmodule\n"]);
        assert_eq!(scan.skipped.len(), 1);
        assert!(scan.skipped[0].path.ends_with("blob.v"));
        assert!(scan.skipped[0].reason.contains("NUL"));

        let shallow = CorpusReader::new(root).with_recursive(false).scan().unwrap();
        let ids: Vec<&str> = shallow.files.iter().map(SourceFile::id).collect();
        assert_eq!(ids, vec!["top.vh"]);

        let only_v = CorpusReader::new(root).with_extensions(["v"]).scan().unwrap();
        assert_eq!(only_v.files.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_need_opt_in() {
        let temp = tempdir().unwrap();
        let shared = temp.path().join("shared");
        let root = temp.path().join("corpus");
        fs::create_dir_all(&shared).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(shared.join("lib.v"), "module lib;\nendmodule\n").unwrap();
        fs::write(root.join("top.v"), "module top;\nendmodule\n").unwrap();
        std::os::unix::fs::symlink(&shared, root.join("shared")).unwrap();

        let plain = CorpusReader::new(&root).scan().unwrap();
        let ids: Vec<&str> = plain.files.iter().map(SourceFile::id).collect();
        assert_eq!(ids, vec!["top.v"]);

        let followed = CorpusReader::new(&root)
            .with_follow_symlinks(true)
            .scan()
            .unwrap();
        let ids: Vec<&str> = followed.files.iter().map(SourceFile::id).collect();
        assert_eq!(ids, vec!["shared/lib.v", "top.v"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().unwrap();
        let reader = CorpusReader::new(temp.path().join("nope"));
        assert!(matches!(reader.scan(), Err(CorpusError::Io(_))));
    }
}
