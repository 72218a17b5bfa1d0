//! Line-oriented comment counting for C-family source files.
//!
//! This is a two-state scanner over trimmed lines, not a lexer. Comment
//! markers inside string literals are not recognised as such: a line like
//! `String s = "/*";` opens a block comment. Counts are kept compatible with
//! that behaviour on purpose.

use std::path::Path;

use tracing::debug;

/// The markers recognised by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line: &'static str,
    pub block_open: &'static str,
    pub block_close: &'static str,
}

impl CommentSyntax {
    /// `//`, `/*` and `*/` as used by Java and the rest of the C family.
    pub const C_FAMILY: CommentSyntax = CommentSyntax {
        line: "//",
        block_open: "/*",
        block_close: "*/",
    };
}

impl Default for CommentSyntax {
    fn default() -> Self {
        Self::C_FAMILY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InBlock,
}

/// Counts comment lines in source text or files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentCounter {
    syntax: CommentSyntax,
}

impl CommentCounter {
    pub fn new(syntax: CommentSyntax) -> Self {
        Self { syntax }
    }

    /// Count comment lines in the file at `path`.
    ///
    /// Unreadable files (missing, permission denied, not UTF-8) count as `0`.
    pub fn count_in_file(&self, path: &Path) -> u64 {
        match std::fs::read_to_string(path) {
            Ok(source) => self.count_in_source(&source),
            Err(e) => {
                debug!("Skipping comment count for {}: {}", path.display(), e);
                0
            }
        }
    }

    /// Count comment lines in `source`. Each physical line counts at most once.
    pub fn count_in_source(&self, source: &str) -> u64 {
        let mut state = ScanState::Normal;
        let mut count = 0u64;

        for raw in physical_lines(source) {
            let line = raw.trim();
            match state {
                ScanState::InBlock => {
                    count += 1;
                    if line.contains(self.syntax.block_close) {
                        state = ScanState::Normal;
                    }
                }
                ScanState::Normal => {
                    if line.starts_with(self.syntax.line) {
                        count += 1;
                    } else if line.contains(self.syntax.block_open) {
                        count += 1;
                        // A close marker anywhere on the opening line ends the block.
                        if !line.contains(self.syntax.block_close) {
                            state = ScanState::InBlock;
                        }
                    }
                }
            }
        }

        count
    }
}

/// Split `source` on `\n`, `\r\n` and lone `\r`, without a trailing empty line.
fn physical_lines(source: &str) -> impl Iterator<Item = &str> {
    let body = source
        .strip_suffix("\r\n")
        .or_else(|| source.strip_suffix('\n'))
        .or_else(|| source.strip_suffix('\r'))
        .unwrap_or(source);

    body.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
}

/// Count comment lines in `path` with the default C-family markers.
pub fn count_comment_lines(path: &Path) -> u64 {
    CommentCounter::default().count_in_file(path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
