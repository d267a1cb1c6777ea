//! External syntax oracle.
//!
//! The scorer only needs `{success, total_lines, error_line_count}` per file;
//! `IverilogValidator` produces it by running Icarus Verilog in null-target
//! mode and counting the distinct source lines it reports errors on.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::constants::oracle::{DEFAULT_TIMEOUT_SECS, IVERILOG_PROGRAM, POLL_INTERVAL_MILLIS};
use crate::data::SourceFile;
use crate::errors::CorpusError;

static ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+): error:").expect("error line regex"));

/// Outcome of one syntax check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxReport {
    /// True when the validator reported no errors.
    pub success: bool,
    /// Line count of the checked file.
    pub total_lines: usize,
    /// Distinct source lines with at least one reported error.
    pub error_line_count: usize,
}

impl SyntaxReport {
    /// A passing report.
    pub fn clean(total_lines: usize) -> Self {
        Self {
            success: true,
            total_lines,
            error_line_count: 0,
        }
    }

    /// `error_line_count / total_lines`, 0 for an empty file.
    pub fn error_ratio(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.error_line_count as f64 / self.total_lines as f64
    }
}

/// Black-box syntax checker invoked once per file.
///
/// An `Err` means the oracle could not judge the file (missing tool, missing
/// include, timeout); the scorer then leaves `compiles` undefined.
pub trait SyntaxValidator: Send + Sync {
    /// Check one file. An error means the file could not be judged.
    fn check(&self, file: &SourceFile) -> Result<SyntaxReport, CorpusError>;
}

/// Distinct line numbers from `N: error:` diagnostics.
pub fn parse_error_lines(stderr: &str) -> BTreeSet<usize> {
    stderr
        .lines()
        .filter_map(|line| ERROR_LINE.captures(line))
        .filter_map(|captures| captures.get(1)?.as_str().parse().ok())
        .collect()
}

/// Runs `iverilog -t null [-I dir]... <file>` against files on disk.
///
/// File ids are resolved against `root`.
#[derive(Clone, Debug)]
pub struct IverilogValidator {
    program: PathBuf,
    root: PathBuf,
    include_dirs: Vec<PathBuf>,
    timeout: Duration,
}

impl IverilogValidator {
    /// Validator resolving file ids against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from(IVERILOG_PROGRAM),
            root: root.into(),
            include_dirs: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Use a different compiler binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Add `-I` include directories.
    pub fn with_include_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_dirs.extend(dirs);
        self
    }

    /// Per-file wall-clock limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured per-file limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True when the compiler binary can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn resolve(&self, file: &SourceFile) -> PathBuf {
        let id = Path::new(file.id());
        if id.is_absolute() {
            id.to_path_buf()
        } else {
            self.root.join(id)
        }
    }

    fn run(&self, file: &SourceFile, path: &Path) -> Result<(bool, String), CorpusError> {
        let mut command = Command::new(&self.program);
        command.args(["-t", "null"]);
        for dir in &self.include_dirs {
            command.arg("-I").arg(dir);
        }
        command
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| unavailable(file, &err))?;
        let mut stderr_pipe = child.stderr.take();
        let reader = thread::spawn(move || -> io::Result<String> {
            let mut buffer = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                pipe.read_to_end(&mut buffer)?;
            }
            // Diagnostics may quote non-UTF-8 source bytes.
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CorpusError::ValidatorTimeout {
                        file_id: file.id().to_string(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(Duration::from_millis(POLL_INTERVAL_MILLIS)),
                Err(err) => return Err(unavailable(file, &err)),
            }
        };
        let stderr = match reader.join() {
            Ok(read) => read.map_err(|err| unavailable(file, &err))?,
            Err(_) => {
                warn!("[fimcorpus:oracle] stderr reader for {} panicked", file.id());
                return Err(unavailable(
                    file,
                    &io::Error::other("stderr reader panicked"),
                ));
            }
        };
        Ok((status.success(), stderr))
    }
}

fn unavailable(file: &SourceFile, err: &io::Error) -> CorpusError {
    CorpusError::ValidatorUnavailable {
        file_id: file.id().to_string(),
        reason: err.to_string(),
    }
}

impl SyntaxValidator for IverilogValidator {
    fn check(&self, file: &SourceFile) -> Result<SyntaxReport, CorpusError> {
        let path = self.resolve(file);
        if !path.is_file() {
            return Err(CorpusError::ValidatorUnavailable {
                file_id: file.id().to_string(),
                reason: format!("{} is not a file on disk", path.display()),
            });
        }
        let total_lines = file.line_count();
        let (success, stderr) = self.run(file, &path)?;
        if success {
            return Ok(SyntaxReport::clean(total_lines));
        }
        let error_lines = parse_error_lines(&stderr);
        if error_lines.is_empty() {
            // Failed without line diagnostics: tool-level problem, not syntax.
            debug!(
                "[fimcorpus:oracle] {} failed without error lines: {}",
                file.id(),
                stderr.trim()
            );
            return Err(CorpusError::ValidatorUnavailable {
                file_id: file.id().to_string(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(SyntaxReport {
            success: false,
            total_lines,
            error_line_count: error_lines.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_lines_are_distinct() {
        let stderr = "\
top.v:3: syntax error
top.v:3: error: Invalid module item.
top.v:3: error: another complaint.
top.v:17: error: Unknown module type: foo
I give up.
";
        let lines = parse_error_lines(stderr);
        assert_eq!(lines.into_iter().collect::<Vec<_>>(), vec![3, 17]);
    }

    #[test]
    fn error_ratio_handles_empty_files() {
        let report = SyntaxReport {
            success: false,
            total_lines: 0,
            error_line_count: 0,
        };
        assert_eq!(report.error_ratio(), 0.0);
        let report = SyntaxReport {
            success: false,
            total_lines: 40,
            error_line_count: 4,
        };
        assert!((report.error_ratio() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn missing_program_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.v"), "module a; endmodule\n").unwrap();
        let validator =
            IverilogValidator::new(dir.path()).with_program("definitely-not-a-real-compiler-xyz");
        assert!(!validator.is_available());
        let file = SourceFile::from_text("a.v", "module a; endmodule\n");
        let err = validator.check(&file).unwrap_err();
        assert!(matches!(err, CorpusError::ValidatorUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_diagnostics_still_count_error_lines() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.v"), "module a;\n  wire;\nendmodule\n").unwrap();
        let script = dir.path().join("fake-iverilog");
        std::fs::write(
            &script,
            "#!/bin/sh\nprintf 'a.v:2: error: stray \\377 byte\\n' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let validator = IverilogValidator::new(dir.path()).with_program(&script);
        let file = SourceFile::from_text("a.v", "module a;\n  wire;\nendmodule\n");
        let report = validator.check(&file).unwrap();
        assert!(!report.success);
        assert_eq!(report.total_lines, 3);
        assert_eq!(report.error_line_count, 1);
    }

    #[test]
    fn in_memory_files_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let validator = IverilogValidator::new(dir.path());
        let file = SourceFile::from_text("missing.v", "module a; endmodule\n");
        assert!(matches!(
            validator.check(&file),
            Err(CorpusError::ValidatorUnavailable { .. })
        ));
    }
}
