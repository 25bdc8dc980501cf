//! Polarized type lattice and constraint solver for Lyra.
//!
//! Types live in one hash-consing [`Pool`] per analysis session: two
//! structurally equal types are the same [`Idx`], so equality is an O(1)
//! index comparison. Every composite type decomposes structurally with
//! polarity flips on contravariant positions (pointer/reference negative
//! slot, function parameters, a type's own negative bound).
//!
//! Three kinds of entries break pure hash-consing on purpose:
//! - **nominal** entries (classes, interfaces, modules, enumerations, type
//!   variables) are identity-interned and compare via declared inheritance
//!   edges;
//! - **flow** entries are mutable placeholders with directed edges, used to
//!   constrain a type incrementally before it is fully known;
//! - function types carry an [`EffectSet`] that participates in subtyping.
//!
//! The lattice operations are [`Pool::constrain`] (directional, mutating),
//! [`Pool::is_subtype`] / [`Pool::is_equivalent`] (checks),
//! [`Pool::matches`] (structural domain comparison for overloads), and
//! [`Pool::join`] / [`Pool::meet`].

mod construct;
mod effects;
mod format;
mod idx;
mod instantiate;
mod lattice;
mod pool;
mod tag;

pub use effects::EffectSet;
pub use format::TypeDisplay;
pub use idx::Idx;
pub use pool::{FlowId, NominalId, NominalInfo, NominalKind, Polarity, Pool};
pub use tag::Tag;

#[cfg(test)]
mod prop_tests;

// Size assertions to prevent accidental regressions.
// Idx is stored in every node result slot and definition.
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{EffectSet, Idx};
    const _: () = assert!(std::mem::size_of::<Idx>() == 4);
    const _: () = assert!(std::mem::size_of::<EffectSet>() == 2);
}
