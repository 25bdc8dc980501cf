//! Diagnostic system for the Lyra analyzer.
//!
//! The analysis core reports every problem through a single narrow
//! boundary: build a [`Diagnostic`] and append it to a [`DiagnosticSink`].
//! The core never inspects accumulated diagnostics except to count them
//! (the driver uses the counts to decide whether later stages run), and it
//! never retries on a diagnostic.
//!
//! Message formatting/localization is out of scope; a diagnostic carries a
//! pre-formatted message plus the structured bits (code, severity, span)
//! that downstream tooling needs.

mod diagnostic;
mod error_code;
mod queue;

pub use diagnostic::{Diagnostic, Severity};
pub use error_code::ErrorCode;
pub use queue::DiagnosticSink;
