//! The side-effect lattice.
//!
//! An effect is one tag from a small closed set; an effect set is a bitset
//! over those tags. Function types carry their effect set, and subtyping
//! requires the supertype to allow every effect the subtype exercises.
//!
//! The named composites mirror the language's effect classes: `transacts`
//! groups the rollback-sensitive tags, `computes` is pure-but-may-diverge,
//! `converges` is pure and total.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// A set of permitted or exercised side-effect tags.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct EffectSet: u16 {
        /// May read mutable state.
        const READS = 1 << 0;
        /// May write mutable state.
        const WRITES = 1 << 1;
        /// May allocate.
        const ALLOCATES = 1 << 2;
        /// Performs work that cannot be rolled back.
        const NO_ROLLBACK = 1 << 3;
        /// May direct entities outside the program.
        const DICTATES = 1 << 4;
        /// May block or yield.
        const SUSPENDS = 1 << 5;
        /// May fail (decidable expression).
        const DECIDES = 1 << 6;
        /// May not terminate.
        const DIVERGES = 1 << 7;
    }
}

impl EffectSet {
    /// The `transacts` effect class: everything rollback-sensitive.
    pub const TRANSACTS: EffectSet = EffectSet::READS
        .union(EffectSet::WRITES)
        .union(EffectSet::ALLOCATES)
        .union(EffectSet::NO_ROLLBACK);

    /// The `computes` effect class: pure, but may diverge.
    pub const COMPUTES: EffectSet = EffectSet::DIVERGES;

    /// The `converges` effect class: pure and total.
    pub const CONVERGES: EffectSet = EffectSet::empty();

    /// Default allowed set for a function body with no effect attribute.
    pub const FUNCTION_DEFAULT: EffectSet = EffectSet::TRANSACTS
        .union(EffectSet::DIVERGES)
        .union(EffectSet::DICTATES);

    /// Default allowed set for a class body (field initializers).
    pub const CLASS_DEFAULT: EffectSet = EffectSet::TRANSACTS.union(EffectSet::DIVERGES);

    /// Default allowed set for a module-level initializer.
    pub const MODULE_DEFAULT: EffectSet = EffectSet::CONVERGES;

    /// Tags in `self` that `allowed` does not permit.
    #[inline]
    pub fn missing_from(self, allowed: EffectSet) -> EffectSet {
        self.difference(allowed)
    }

    /// Iterate the individual set tags with their display names.
    pub fn tag_names(self) -> impl Iterator<Item = &'static str> {
        [
            (EffectSet::READS, "reads"),
            (EffectSet::WRITES, "writes"),
            (EffectSet::ALLOCATES, "allocates"),
            (EffectSet::NO_ROLLBACK, "no_rollback"),
            (EffectSet::DICTATES, "dictates"),
            (EffectSet::SUSPENDS, "suspends"),
            (EffectSet::DECIDES, "decides"),
            (EffectSet::DIVERGES, "diverges"),
        ]
        .into_iter()
        .filter_map(move |(tag, name)| self.contains(tag).then_some(name))
    }
}

impl fmt::Debug for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("converges");
        }
        let mut first = true;
        for name in self.tag_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transacts_groups_rollback_tags() {
        assert!(EffectSet::TRANSACTS.contains(EffectSet::READS));
        assert!(EffectSet::TRANSACTS.contains(EffectSet::NO_ROLLBACK));
        assert!(!EffectSet::TRANSACTS.contains(EffectSet::SUSPENDS));
        assert!(!EffectSet::TRANSACTS.contains(EffectSet::DECIDES));
    }

    #[test]
    fn missing_from_is_set_difference() {
        let required = EffectSet::DECIDES | EffectSet::READS;
        let allowed = EffectSet::FUNCTION_DEFAULT;
        assert_eq!(required.missing_from(allowed), EffectSet::DECIDES);
    }

    #[test]
    fn display_names() {
        let set = EffectSet::DECIDES | EffectSet::SUSPENDS;
        assert_eq!(set.to_string(), "suspends|decides");
        assert_eq!(EffectSet::CONVERGES.to_string(), "converges");
    }
}
