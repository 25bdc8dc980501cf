//! Desugared syntax tree and interning for Lyra.
//!
//! This crate owns the analyzer's input representation:
//! - `Span`: compact 8-byte source locations for diagnostics
//! - `Name`/`StringInterner`: sharded 32-bit interned identifiers
//! - `NodeArena`/`NodeKind`: the already-desugared tree, arena-addressed,
//!   with a mutable result-type slot the analyzer fills in
//!
//! The analyzer never re-invokes the parser; everything it needs from
//! concrete syntax is a span.

mod interner;
mod name;
mod node;
mod span;

pub use interner::{InternError, StringInterner, MAX_IDENT_LEN};
pub use name::Name;
pub use node::{Attribute, Node, NodeArena, NodeId, NodeKind, TypeSlot};
pub use span::Span;

// Size assertions to prevent accidental regressions.
// NodeId and Name are stored pervasively in side tables.
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{Name, NodeId, Span, TypeSlot};
    const _: () = assert!(std::mem::size_of::<Name>() == 4);
    const _: () = assert!(std::mem::size_of::<NodeId>() == 4);
    const _: () = assert!(std::mem::size_of::<TypeSlot>() == 4);
    const _: () = assert!(std::mem::size_of::<Span>() == 8);
}
