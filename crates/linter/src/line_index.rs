use crate::diagnostics::{SourcePosition, SourceRange};
use lualint_syntax::{Position, RawLocation};

/// Byte offsets of the start of every line in a source file.
///
/// Built once per file by a single scan for `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    #[must_use]
    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of a 0-indexed position, clamped to the end of the text
    #[must_use]
    pub fn offset(&self, position: Position) -> usize {
        self.line_starts
            .get(position.line)
            .map_or(self.len, |start| (start + position.column).min(self.len))
    }

    /// The 0-indexed line and column of a byte offset
    #[must_use]
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position::new(line, offset - self.line_starts[line])
    }

    /// Resolve a parser location into a range with offsets
    #[must_use]
    pub fn resolve(&self, loc: &RawLocation) -> SourceRange {
        let start = loc.start();
        let end = loc.end();
        SourceRange::new(
            SourcePosition::new(start.line, start.column, self.offset(start)),
            SourcePosition::new(end.line, end.column, self.offset(end)),
        )
    }
}
