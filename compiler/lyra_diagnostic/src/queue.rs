//! Diagnostic accumulation.

use crate::{Diagnostic, Severity};

/// Append-only diagnostic accumulator.
///
/// This is the single reporting boundary of the analysis core. The core
/// only ever appends and counts; rendering and ordering are the driver's
/// concern.
#[derive(Default, Debug)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Note => {}
        }
        self.diagnostics.push(diagnostic);
    }

    /// Number of error-severity diagnostics appended so far.
    #[inline]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of warning-severity diagnostics appended so far.
    #[inline]
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Borrow everything reported so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain accumulated diagnostics, leaving the sink empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        self.warning_count = 0;
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use lyra_ir::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_by_severity() {
        let mut sink = DiagnosticSink::new();
        sink.emit(Diagnostic::error(ErrorCode::E2101, Span::DUMMY, "a"));
        sink.emit(Diagnostic::warning(ErrorCode::E2401, Span::DUMMY, "b"));
        sink.emit(Diagnostic::error(ErrorCode::E2301, Span::DUMMY, "c"));

        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.warning_count(), 1);
        assert!(sink.has_errors());
    }

    #[test]
    fn take_resets_counts() {
        let mut sink = DiagnosticSink::new();
        sink.emit(Diagnostic::error(ErrorCode::E2101, Span::DUMMY, "a"));
        let taken = sink.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(sink.error_count(), 0);
        assert!(sink.is_empty());
    }
}
