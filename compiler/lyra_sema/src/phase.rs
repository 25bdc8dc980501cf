//! The fixed phase sequence of deferred analysis.
//!
//! Phases exist to break circular dependencies between declarations: a
//! fact established by phase N is guaranteed visible to every task queued
//! at phase N or later. The order is a total order and tasks may only
//! enqueue into their own or a later phase, so the phase graph is acyclic
//! by construction.

use std::fmt;

/// One step of the deferred analysis pipeline, in execution order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(u8)]
pub enum Phase {
    /// Gather top-level module declarations.
    Modules = 0,
    /// Resolve imports and module aliases.
    Imports = 1,
    /// Analyze type signatures (supers, parameter/return types).
    Types = 2,
    /// Validate that inheritance has no cycles.
    ValidateCycles = 3,
    /// Analyze function bodies with explicit return types.
    ClosedFunctionBodies = 4,
    /// Process attributes that are themselves attribute classes.
    AttributeClassAttributes = 5,
    /// Process all other attributes (access, effects, override).
    Attributes = 6,
    /// Propagate inherited attributes (deprecated, experimental).
    PropagateAttributes = 7,
    /// Validate attribute placement and combinations.
    ValidateAttributes = 8,
    /// Analyze non-function value expressions (field/parameter defaults).
    NonFunctionExpressions = 9,
    /// Analyze function bodies with inferred return types.
    OpenFunctionBodies = 10,
    /// Final validation; errors only, safe to run last.
    FinalValidation = 11,
}

impl Phase {
    pub const COUNT: usize = 12;

    /// All phases in execution order.
    pub const ALL: [Phase; Phase::COUNT] = [
        Phase::Modules,
        Phase::Imports,
        Phase::Types,
        Phase::ValidateCycles,
        Phase::ClosedFunctionBodies,
        Phase::AttributeClassAttributes,
        Phase::Attributes,
        Phase::PropagateAttributes,
        Phase::ValidateAttributes,
        Phase::NonFunctionExpressions,
        Phase::OpenFunctionBodies,
        Phase::FinalValidation,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Modules => "modules",
            Phase::Imports => "imports",
            Phase::Types => "types",
            Phase::ValidateCycles => "validate-cycles",
            Phase::ClosedFunctionBodies => "closed-function-bodies",
            Phase::AttributeClassAttributes => "attribute-class-attributes",
            Phase::Attributes => "attributes",
            Phase::PropagateAttributes => "propagate-attributes",
            Phase::ValidateAttributes => "validate-attributes",
            Phase::NonFunctionExpressions => "non-function-expressions",
            Phase::OpenFunctionBodies => "open-function-bodies",
            Phase::FinalValidation => "final-validation",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn phases_are_totally_ordered() {
        for pair in Phase::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(Phase::ALL.len(), Phase::COUNT);
        assert_eq!(Phase::Modules.index(), 0);
        assert_eq!(Phase::FinalValidation.index(), Phase::COUNT - 1);
    }
}
