//! Overload selection.
//!
//! Name lookup yields candidate sets; this module narrows them. Two
//! separate questions are answered here: which kind of symbol a name
//! stands for in a given syntactic position, and which function overload
//! a call's argument types select. Argument-driven selection never uses
//! an argument whose type is still unknown; an upstream diagnostic
//! already covers that expression, so the call stays silent.

use lyra_types::{Idx, Pool, Tag};
use smallvec::SmallVec;

use crate::{DefId, Program};

/// The syntactic position a name appears in.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NamePosition {
    /// Inside a type expression.
    Type,
    /// Callee of a call.
    Call,
    /// Any other value use.
    Value,
}

/// How a candidate set narrows for one position.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SymbolChoice {
    /// A single definition wins outright.
    One(DefId),
    /// A function overload set, to be narrowed by argument types.
    Functions(SmallVec<[DefId; 4]>),
    /// Type position where only functions carry the name.
    FunctionsInTypePosition(SmallVec<[DefId; 4]>),
    /// Incompatible kinds collide; nothing can be chosen.
    Collision(SmallVec<[DefId; 4]>),
    /// Empty candidate set.
    Nothing,
}

/// Narrow a candidate set by syntactic position.
///
/// Types take priority in type position and functions in call position;
/// in plain value position a mix of kinds is a collision rather than a
/// silent pick.
pub fn choose_symbol(
    program: &Program,
    candidates: &[DefId],
    position: NamePosition,
) -> SymbolChoice {
    if candidates.is_empty() {
        return SymbolChoice::Nothing;
    }
    if let [single] = candidates {
        return SymbolChoice::One(*single);
    }

    let mut types: SmallVec<[DefId; 4]> = SmallVec::new();
    let mut functions: SmallVec<[DefId; 4]> = SmallVec::new();
    let mut others: SmallVec<[DefId; 4]> = SmallVec::new();
    for &def in candidates {
        let kind = program.def(def).kind;
        if kind.is_type() {
            types.push(def);
        } else if kind == crate::DefKind::Function {
            functions.push(def);
        } else {
            others.push(def);
        }
    }

    match position {
        NamePosition::Type => match (types.as_slice(), functions.is_empty()) {
            ([one], _) => SymbolChoice::One(*one),
            ([], false) if others.is_empty() => SymbolChoice::FunctionsInTypePosition(functions),
            _ => SymbolChoice::Collision(SmallVec::from_slice(candidates)),
        },
        NamePosition::Call => {
            if !functions.is_empty() && types.is_empty() && others.is_empty() {
                SymbolChoice::Functions(functions)
            } else if functions.is_empty() && others.is_empty() && types.len() == 1 {
                // Constructor call.
                SymbolChoice::One(types[0])
            } else {
                SymbolChoice::Collision(SmallVec::from_slice(candidates))
            }
        }
        NamePosition::Value => {
            if !functions.is_empty() && types.is_empty() && others.is_empty() {
                SymbolChoice::Functions(functions)
            } else {
                SymbolChoice::Collision(SmallVec::from_slice(candidates))
            }
        }
    }
}

/// Result of narrowing a function overload set by argument types.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum OverloadOutcome {
    /// Exactly one overload accepts the arguments. `ty` is the selected
    /// function type with fresh flows substituted for its type variables,
    /// ready to constrain the arguments against.
    Resolved { def: DefId, ty: Idx },
    /// No overload accepts the arguments.
    NoMatch,
    /// More than one overload accepts the arguments.
    Ambiguous(SmallVec<[DefId; 4]>),
    /// An argument type is unknown; selection is suppressed.
    Undetermined,
}

/// Narrow `candidates` by the call's argument types.
///
/// Candidates whose type is not yet a function type (still being
/// analyzed, or a non-function that slipped into the set) never match.
/// Generalized candidates are instantiated with fresh flows before
/// matching, so one call site's constraints cannot leak into another's.
pub fn resolve_call(
    pool: &mut Pool,
    program: &Program,
    candidates: &[DefId],
    args: &[Idx],
) -> OverloadOutcome {
    if args.contains(&Idx::UNKNOWN) {
        return OverloadOutcome::Undetermined;
    }
    let arg_tuple = pool.tuple(args);

    let mut matching: SmallVec<[(DefId, Idx); 4]> = SmallVec::new();
    for &def in candidates {
        let d = program.def(def);
        if pool.tag(d.ty) != Tag::Function {
            continue;
        }
        if pool.function_param_count(d.ty) != args.len() {
            continue;
        }
        let ty = if d.type_vars.is_empty() {
            d.ty
        } else {
            pool.instantiate(d.ty, &d.type_vars)
        };
        let params = pool.function_params(ty);
        let domain = pool.tuple(&params);
        if pool.matches(arg_tuple, domain) {
            matching.push((def, ty));
        }
    }

    match matching.as_slice() {
        [] => OverloadOutcome::NoMatch,
        [(def, ty)] => OverloadOutcome::Resolved { def: *def, ty: *ty },
        many => OverloadOutcome::Ambiguous(many.iter().map(|(def, _)| *def).collect()),
    }
}
