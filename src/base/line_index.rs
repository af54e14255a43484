//! Line/column conversion between byte offsets and editor positions.

use std::sync::Arc;

use text_size::{TextRange, TextSize};

use super::position::{Position, Span};

/// A byte-based line/column pair (0-indexed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// The same location in 1-based coordinates, as used for messages.
    pub fn one_based(self) -> (u32, u32) {
        (self.line + 1, self.col + 1)
    }
}

/// Maps offsets in one source text to lines and columns.
///
/// Holds the text itself so that UTF-16 editor columns can be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    text: Arc<str>,
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let mut line_starts = vec![TextSize::new(0)];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(TextSize::new(i as u32 + 1));
            }
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn len(&self) -> TextSize {
        TextSize::of(&*self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Byte-based line/column of an offset. Offsets past the end clamp to it.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let col = offset - self.line_starts[line];
        LineCol::new(line as u32, col.into())
    }

    /// Offset of a byte-based line/column, if the line exists.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let start = self.line_start(line_col.line)?;
        let offset = start + TextSize::new(line_col.col);
        (offset <= self.len()).then_some(offset)
    }

    /// Editor position (UTF-16 column) of an offset.
    pub fn position(&self, offset: TextSize) -> Position {
        let line_col = self.line_col(offset);
        let start = usize::from(self.line_starts[line_col.line as usize]);
        let mut end = start + line_col.col as usize;
        while !self.text.is_char_boundary(end) {
            end -= 1;
        }
        let character = self.text[start..end].encode_utf16().count() as u32;
        Position::new(line_col.line, character)
    }

    pub fn span(&self, range: TextRange) -> Span {
        Span::new(self.position(range.start()), self.position(range.end()))
    }

    /// Offset of an editor position. Columns past the end of the line clamp
    /// to the line end; lines past the end of the text yield `None`.
    pub fn offset_at(&self, position: Position) -> Option<TextSize> {
        let start = self.line_start(position.line)?;
        let rest = &self.text[usize::from(start)..];
        let mut utf16 = 0u32;
        let mut bytes = 0usize;
        for c in rest.chars() {
            if c == '\n' || utf16 >= position.character {
                break;
            }
            utf16 += c.len_utf16() as u32;
            bytes += c.len_utf8();
        }
        Some(start + TextSize::new(bytes as u32))
    }

    /// Text of one line without its line terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let start = usize::from(self.line_start(line)?);
        let end = self
            .line_start(line + 1)
            .map(usize::from)
            .unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches(['\n', '\r']))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_roundtrip_on_line_boundaries() {
        let index = LineIndex::new("package a\n\ntype T int\n");
        assert_eq!(index.line_col(TextSize::new(0)), LineCol::new(0, 0));
        assert_eq!(index.line_col(TextSize::new(10)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::new(16)), LineCol::new(2, 5));
        assert_eq!(index.offset(LineCol::new(2, 5)), Some(TextSize::new(16)));
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_position_counts_utf16_units() {
        let index = LineIndex::new("// héllo 𝄞 x\n");
        let x = index.text().find('x').unwrap() as u32;
        let position = index.position(TextSize::new(x));
        // 'é' is one UTF-16 unit, the clef is two.
        assert_eq!(position, Position::new(0, 12));
        assert_eq!(index.offset_at(position), Some(TextSize::new(x)));
    }

    #[test]
    fn test_offset_at_clamps_column_and_rejects_missing_line() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.offset_at(Position::new(0, 99)), Some(TextSize::new(2)));
        assert_eq!(index.offset_at(Position::new(5, 0)), None);
        assert_eq!(index.line_text(1), Some("cd"));
    }
}
