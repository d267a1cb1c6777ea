//! Line-level comment scanning for C-style (`//`, `/* */`) source languages.
//!
//! The scanner carries block-comment state across lines, so it must see the
//! lines of a file in order.

/// Classification of one source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Only whitespace.
    Blank,
    /// Code and no comment.
    Code,
    /// Comment text only (or inside a block comment).
    Comment,
    /// Code and a comment on the same line.
    Mixed,
}

impl LineKind {
    /// True for code and mixed lines.
    pub fn has_code(self) -> bool {
        matches!(self, LineKind::Code | LineKind::Mixed)
    }

    /// True for comment and mixed lines.
    pub fn has_comment(self) -> bool {
        matches!(self, LineKind::Comment | LineKind::Mixed)
    }
}

/// A scanned line: its kind plus the code text with comments removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedLine {
    /// Line classification.
    pub kind: LineKind,
    /// Code outside comments, trimmed. Empty for blank and comment lines.
    pub code: String,
}

/// Stateful scanner; feed it lines in file order.
#[derive(Debug, Default)]
pub struct CommentScanner {
    in_block: bool,
}

impl CommentScanner {
    /// Scanner positioned outside any comment.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while inside an unterminated `/* ... */`.
    pub fn in_block(&self) -> bool {
        self.in_block
    }

    /// Classify `line` and advance the block-comment state.
    pub fn scan(&mut self, line: &str) -> ScannedLine {
        if line.trim().is_empty() {
            return ScannedLine {
                kind: LineKind::Blank,
                code: String::new(),
            };
        }
        let chars: Vec<char> = line.chars().collect();
        let mut code = String::new();
        let mut has_comment = false;
        let mut idx = 0;
        while idx < chars.len() {
            if self.in_block {
                has_comment = true;
                if chars[idx] == '*' && chars.get(idx + 1) == Some(&'/') {
                    self.in_block = false;
                    // Keep tokens on either side of the comment apart.
                    code.push(' ');
                    idx += 2;
                } else {
                    idx += 1;
                }
                continue;
            }
            match (chars[idx], chars.get(idx + 1)) {
                ('/', Some('/')) => {
                    has_comment = true;
                    break;
                }
                ('/', Some('*')) => {
                    has_comment = true;
                    self.in_block = true;
                    idx += 2;
                }
                ('"', _) => {
                    idx = copy_string_literal(&chars, idx, &mut code);
                }
                (ch, _) => {
                    code.push(ch);
                    idx += 1;
                }
            }
        }
        let code = code.trim().to_string();
        let kind = match (code.is_empty(), has_comment) {
            (false, true) => LineKind::Mixed,
            (false, false) => LineKind::Code,
            (true, _) => LineKind::Comment,
        };
        ScannedLine { kind, code }
    }
}

/// Copy a double-quoted literal starting at `start`; returns the index after it.
fn copy_string_literal(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push(chars[start]);
    let mut idx = start + 1;
    while idx < chars.len() {
        let ch = chars[idx];
        out.push(ch);
        idx += 1;
        match ch {
            '\\' if idx < chars.len() => {
                out.push(chars[idx]);
                idx += 1;
            }
            '"' => break,
            _ => {}
        }
    }
    idx
}

/// Scan every line of a file in order.
pub fn scan_lines<S: AsRef<str>>(lines: &[S]) -> Vec<ScannedLine> {
    let mut scanner = CommentScanner::new();
    lines
        .iter()
        .map(|line| scanner.scan(line.as_ref()))
        .collect()
}

/// Code text of every line that carries code, comments removed.
pub fn code_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    scan_lines(lines)
        .into_iter()
        .filter(|scanned| scanned.kind.has_code())
        .map(|scanned| scanned.code)
        .collect()
}

/// Count `(code_lines, comment_lines)` over non-blank lines. A mixed line
/// is a code line.
pub fn count_code_and_comment_lines<S: AsRef<str>>(lines: &[S]) -> (usize, usize) {
    scan_lines(lines)
        .iter()
        .fold((0, 0), |(code, comment), scanned| match scanned.kind {
            LineKind::Code | LineKind::Mixed => (code + 1, comment),
            LineKind::Comment => (code, comment + 1),
            LineKind::Blank => (code, comment),
        })
}
