//! Semantic analysis for Lyra.
//!
//! Input is a desugared tree per compilation unit ([`lyra_ir`]); output
//! is a [`Program`] graph of scopes and definitions, per-node result
//! types written back into the tree, and a diagnostic queue. Nothing
//! here fails structurally: malformed input is reported and analysis
//! continues on the rest.
//!
//! The driver is deliberately single-pass-with-deferral rather than
//! fixpoint: an immediate declaration walk registers every definition,
//! and everything that needs other declarations is queued at one of the
//! fixed [`Phase`]s, each drained to exhaustion in order. Function types
//! without declared returns are inferred on first reference through a
//! strongly-connected-component walk of the call graph, then generalized
//! into fresh type variables per subsequent reference.

mod analyzer;
mod def;
mod effects;
mod generalize;
mod names;
mod overload;
mod package;
mod phase;
mod reach;
mod sched;
mod scope;
mod session;

pub use analyzer::Analyzer;
pub use def::{AccessLevel, DefId, DefKind, Definition};
pub use effects::{effect_class, effect_tag, require_effects};
pub use generalize::{BodyState, CallGraph, VertexId};
pub use names::WellKnownNames;
pub use overload::{choose_symbol, resolve_call, NamePosition, OverloadOutcome, SymbolChoice};
pub use package::{PackageGraph, PackageId, PackageRole};
pub use phase::Phase;
pub use reach::ReachValidator;
pub use sched::{Context, Scheduler};
pub use scope::{Program, Scope, ScopeId, ScopeKind};
pub use session::AnalysisSession;
