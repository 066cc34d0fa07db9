//! Diagnostics glue
//!
//! Combines a recovered [`Position`] with a message into a
//! human-readable, source-annotated diagnostic. Thin by design: the
//! position scanner does the hard work, this module only formats.

pub mod context;

pub use context::{caret_line, ContextLines};

use std::fmt;

use crate::text::Position;

/// Severity of a diagnostic.
///
/// `Fatal` is data, not control flow: an operation that produces a
/// fatal diagnostic returns it as a value and the call site performs
/// the abort (typically by propagating an error) explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// An unrecoverable condition.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal error",
        };
        f.write_str(s)
    }
}

/// What produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Reported while parsing the document.
    Parsing,
    /// Reported by a validator inspecting the parsed tree.
    Validation,
    /// Reported by later processing of the document.
    Processing,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::Parsing => "XML parsing",
            MessageKind::Validation => "XML validation",
            MessageKind::Processing => "XML processing",
        };
        f.write_str(s)
    }
}

/// A message attached to a source position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: MessageKind,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        kind: MessageKind,
        position: Position,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity,
            kind,
            position,
            message: message.into(),
        }
    }

    /// The header line: `<severity> (<kind>) in <system id>`, the
    /// system id part only when one is known.
    pub fn header(&self) -> String {
        let mut header = format!("{} ({})", self.severity, self.kind);
        if let Some(id) = self.position.system_id() {
            header.push_str(" in ");
            header.push_str(id);
        }
        header
    }

    /// Render this diagnostic: the header, then either the source
    /// context carrying the message on its caret line, or - when the
    /// position is unknown and no context exists - the bare message.
    pub fn render(&self, context: Option<&ContextLines>) -> String {
        match context {
            Some(ctx) if !self.position.is_undefined() => {
                let body = ctx.render(
                    &self.message,
                    self.position.column() as u32,
                    self.position.length(),
                );
                format!("{}\n{}", self.header(), body)
            }
            _ => format!("{}\n{}", self.header(), self.message),
        }
    }
}
