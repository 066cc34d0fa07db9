//! Line index over raw source text
//!
//! Built in one linear scan, then answers offset <-> (line, column)
//! queries with binary search. All offsets are byte offsets into the
//! original UTF-8 text; lines and columns are 1-based.

/// Indexes a source text into lines.
///
/// Each entry of the line table is the byte offset at which a logical
/// line begins. The width of a line terminator (`\n`, `\r` or `\r\n`)
/// counts toward the next line's start offset, never toward the current
/// line's content. An empty document has exactly one empty line.
pub struct TextIndex<'a> {
    text: &'a str,
    line_offsets: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    /// Build the line index in a single pass over `text`.
    pub fn new(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let mut line_offsets = vec![0];

        let mut i = 0;
        while i < bytes.len() {
            let term = match bytes[i] {
                b'\n' => 1,
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        2
                    } else {
                        1
                    }
                }
                _ => {
                    i += 1;
                    continue;
                }
            };
            i += term;
            // a trailing terminator does not open a new line
            if i < bytes.len() {
                line_offsets.push(i);
            }
        }

        TextIndex { text, line_offsets }
    }

    /// The indexed text.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Number of logical lines (at least 1, even for an empty text).
    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Returns the 1-based line whose start offset is the greatest
    /// value less than or equal to `offset`.
    pub fn line_number_from_offset(&self, offset: usize) -> u32 {
        match self.line_offsets.binary_search(&offset) {
            Ok(idx) => (idx + 1) as u32,
            Err(insertion) => insertion as u32,
        }
    }

    /// 1-based column of `offset` on the given 1-based line.
    ///
    /// Returns 0 if `line` is out of range. Never panics.
    pub fn column_from_offset(&self, line: u32, offset: usize) -> u32 {
        let line_idx = line as usize;
        if line_idx == 0 || line_idx > self.line_offsets.len() {
            return 0;
        }
        (offset - self.line_offsets[line_idx - 1] + 1) as u32
    }

    /// Inverse of the two functions above.
    ///
    /// Returns `None` when `line` or `column` do not designate an
    /// offset inside the text.
    pub fn offset_from_line_column(&self, line: u32, column: u32) -> Option<usize> {
        let line_idx = line as usize;
        if line_idx == 0 || line_idx > self.line_offsets.len() || column == 0 {
            return None;
        }
        let start = self.line_offsets[line_idx - 1];
        let offset = start + column as usize - 1;
        let line_end = self
            .line_offsets
            .get(line_idx)
            .copied()
            .unwrap_or(self.text.len());
        if offset < line_end || (offset == line_end && line_idx == self.line_offsets.len()) {
            Some(offset)
        } else {
            None
        }
    }

    /// Content of the given 1-based line, without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&'a str> {
        let line_idx = line as usize;
        if line_idx == 0 || line_idx > self.line_offsets.len() {
            return None;
        }
        let start = self.line_offsets[line_idx - 1];
        let end = self
            .line_offsets
            .get(line_idx)
            .copied()
            .unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches(|c| c == '\n' || c == '\r'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_lines() {
        let idx = TextIndex::new("line1\nline2\nline3");
        assert_eq!(idx.line_count(), 3);
        assert_eq!(idx.line_number_from_offset(6), 2);
        assert_eq!(idx.column_from_offset(2, 6), 1);
        assert_eq!(idx.line_number_from_offset(0), 1);
        assert_eq!(idx.line_number_from_offset(16), 3);
    }

    #[test]
    fn test_empty_document() {
        let idx = TextIndex::new("");
        assert_eq!(idx.line_count(), 1);
        assert_eq!(idx.line_number_from_offset(0), 1);
        assert_eq!(idx.line_text(1), Some(""));
    }

    #[test]
    fn test_crlf_terminators() {
        let idx = TextIndex::new("a\r\nb\rc\nd");
        assert_eq!(idx.line_count(), 4);
        assert_eq!(idx.line_text(1), Some("a"));
        assert_eq!(idx.line_text(2), Some("b"));
        assert_eq!(idx.line_text(3), Some("c"));
        assert_eq!(idx.line_text(4), Some("d"));
        // "b" starts after the two-byte \r\n
        assert_eq!(idx.line_number_from_offset(3), 2);
    }

    #[test]
    fn test_trailing_newline_opens_no_line() {
        let idx = TextIndex::new("a\n");
        assert_eq!(idx.line_count(), 1);
        assert_eq!(idx.line_text(1), Some("a"));
    }

    #[test]
    fn test_round_trip() {
        let text = "alpha\nbeta\r\ngamma";
        let idx = TextIndex::new(text);
        for offset in 0..text.len() {
            let line = idx.line_number_from_offset(offset);
            let column = idx.column_from_offset(line, offset);
            assert_eq!(
                idx.offset_from_line_column(line, column),
                Some(offset),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn test_out_of_range() {
        let idx = TextIndex::new("one line");
        assert_eq!(idx.column_from_offset(5, 3), 0);
        assert_eq!(idx.offset_from_line_column(2, 1), None);
        assert_eq!(idx.offset_from_line_column(1, 0), None);
        assert_eq!(idx.offset_from_line_column(0, 1), None);
    }
}
