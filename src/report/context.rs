//! Source context rendering
//!
//! Renders the lines around an error position with right-aligned line
//! numbers and a caret line pointing at the offending column. The
//! caret renderer is shared with the path-expression parse errors.

/// Build a line of `column` spaces, then `max(range_len, 1)` carets,
/// then the message:
///
/// ```text
///     ^^^^ message
/// ```
pub fn caret_line(message: &str, column: usize, range_len: usize) -> String {
    let mut line = " ".repeat(column);
    line.push_str(&"^".repeat(range_len.max(1)));
    line.push(' ');
    line.push_str(message);
    line
}

/// A window of source lines around an error line.
///
/// Produced by [`crate::locate::PositionScanner::context_lines`];
/// rendered under a diagnostic header.
#[derive(Debug, Clone)]
pub struct ContextLines {
    /// The lines of the window, without terminators
    lines: Vec<String>,
    /// 0-based index in the document of `lines[0]`
    first: usize,
    /// Index into `lines` of the error line
    error_idx: usize,
}

impl ContextLines {
    pub(crate) fn new(lines: Vec<String>, first: usize, error_idx: usize) -> Self {
        debug_assert!(error_idx < lines.len());
        ContextLines {
            lines,
            first,
            error_idx,
        }
    }

    /// Render the window with the message carried on a caret line
    /// under `column` (1-based) of the error line, the caret run
    /// covering `max(length, 1)` characters:
    ///
    /// ```text
    ///  1| <root>
    ///  2|   <child san="deer"/>
    ///            ^^^^^ unknown attribute
    ///
    ///  3| </root>
    /// ```
    pub fn render(&self, message: &str, column: u32, length: usize) -> String {
        // line numbers are right-aligned to the widest one shown
        let pad = (self.first + self.lines.len()).to_string().len();

        let mut out: Vec<String> = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| self.numbered(i, pad, line))
            .collect();

        let prefix_width =
            out[self.error_idx].len() - self.lines[self.error_idx].len();
        let caret = caret_line(
            message.trim(),
            column as usize + prefix_width - 1,
            length,
        );

        out.insert(self.error_idx + 1, caret);
        out.insert(self.error_idx + 2, String::new());

        out.join("\n")
    }

    fn numbered(&self, idx: usize, pad: usize, line: &str) -> String {
        format!(" {:>pad$}| {}", 1 + idx + self.first, line)
    }
}
