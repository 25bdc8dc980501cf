//! Effect checking.
//!
//! Every syntactic construct class carries a default allowed effect set
//! (function body, class body, module-level initializer); effect
//! attributes replace or extend it. [`require_effects`] is the single
//! reporting point: one diagnostic per missing tag, with `transacts`
//! consolidated when all of its sub-tags are missing together and
//! `decides` explained in failure-context terms.

use lyra_diagnostic::{Diagnostic, DiagnosticSink, ErrorCode};
use lyra_ir::{Name, Span};
use lyra_types::EffectSet;

use crate::WellKnownNames;

/// Resolve an attribute naming a whole effect class, which replaces the
/// default set.
pub fn effect_class(names: &WellKnownNames, name: Name) -> Option<EffectSet> {
    if name == names.converges {
        Some(EffectSet::CONVERGES)
    } else if name == names.computes {
        Some(EffectSet::COMPUTES)
    } else if name == names.transacts {
        Some(EffectSet::TRANSACTS | EffectSet::DIVERGES)
    } else if name == names.varies {
        Some(EffectSet::READS | EffectSet::DIVERGES)
    } else {
        None
    }
}

/// Resolve an attribute naming one effect tag, which extends the set.
pub fn effect_tag(names: &WellKnownNames, name: Name) -> Option<EffectSet> {
    if name == names.reads {
        Some(EffectSet::READS)
    } else if name == names.writes {
        Some(EffectSet::WRITES)
    } else if name == names.allocates {
        Some(EffectSet::ALLOCATES)
    } else if name == names.no_rollback {
        Some(EffectSet::NO_ROLLBACK)
    } else if name == names.dictates {
        Some(EffectSet::DICTATES)
    } else if name == names.suspends {
        Some(EffectSet::SUSPENDS)
    } else if name == names.decides {
        Some(EffectSet::DECIDES)
    } else if name == names.diverges {
        Some(EffectSet::DIVERGES)
    } else {
        None
    }
}

/// Check that `required` is permitted by `allowed`, reporting what isn't.
///
/// Returns true when no diagnostic was emitted.
pub fn require_effects(
    sink: &mut DiagnosticSink,
    required: EffectSet,
    allowed: EffectSet,
    span: Span,
    description: &str,
) -> bool {
    let mut missing = required.missing_from(allowed);
    if missing.is_empty() {
        return true;
    }

    if missing.contains(EffectSet::TRANSACTS) {
        sink.emit(Diagnostic::error(
            ErrorCode::E2202,
            span,
            format!("{description} requires the `transacts` effect, which is not allowed here"),
        ));
        missing.remove(EffectSet::TRANSACTS);
    }
    if missing.contains(EffectSet::DECIDES) {
        sink.emit(
            Diagnostic::error(
                ErrorCode::E2203,
                span,
                format!("{description} can fail, but this is not a failure context"),
            )
            .with_note(
                "failure-capable expressions may only appear where failure is handled, \
                 such as an `if` condition or the body of a failable function",
            ),
        );
        missing.remove(EffectSet::DECIDES);
    }
    for tag in missing.tag_names() {
        sink.emit(Diagnostic::error(
            ErrorCode::E2201,
            span,
            format!("{description} requires the `{tag}` effect, which is not allowed here"),
        ));
    }
    false
}
