//! The diagnostic value itself.

use std::fmt;

use lyra_ir::Span;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// One reported problem.
///
/// Diagnostics are independent of each other: a later pass may suppress an
/// obviously redundant downstream diagnostic before emitting it, but an
/// already-appended diagnostic is never withdrawn.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    /// Primary location; `Span::DUMMY` for programs without source mapping.
    pub span: Span,
    /// Pre-formatted message (localization happens elsewhere).
    pub message: String,
    /// Secondary notes attached to the same report.
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            span,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn warning(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Warning,
            span,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Attach a secondary note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} ({})",
            self.severity, self.code, self.message, self.span
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_includes_code_and_span() {
        let d = Diagnostic::error(ErrorCode::E2101, Span::new(1, 4), "type mismatch");
        assert_eq!(d.to_string(), "error[E2101]: type mismatch (1..4)");
    }

    #[test]
    fn notes_accumulate() {
        let d = Diagnostic::warning(ErrorCode::E2401, Span::DUMMY, "unreachable code")
            .with_note("dominated by a `return` above");
        assert_eq!(d.notes.len(), 1);
    }
}
