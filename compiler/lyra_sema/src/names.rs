//! Pre-interned names the analyzer recognizes.

use lyra_ir::{Name, StringInterner};

/// Attribute and keyword names, interned once per session.
#[derive(Clone, Debug)]
pub struct WellKnownNames {
    // Access levels.
    pub public: Name,
    pub protected: Name,
    pub internal: Name,
    pub private: Name,
    pub scoped: Name,

    // Markers.
    pub override_: Name,
    pub deprecated: Name,
    pub experimental: Name,
    pub ignore_unreachable: Name,
    pub attribute: Name,

    // Effect classes.
    pub converges: Name,
    pub computes: Name,
    pub transacts: Name,
    pub varies: Name,

    // Individual effect tags.
    pub reads: Name,
    pub writes: Name,
    pub allocates: Name,
    pub no_rollback: Name,
    pub dictates: Name,
    pub suspends: Name,
    pub decides: Name,
    pub diverges: Name,
}

impl WellKnownNames {
    pub fn new(interner: &StringInterner) -> Self {
        WellKnownNames {
            public: interner.intern("public"),
            protected: interner.intern("protected"),
            internal: interner.intern("internal"),
            private: interner.intern("private"),
            scoped: interner.intern("scoped"),
            override_: interner.intern("override"),
            deprecated: interner.intern("deprecated"),
            experimental: interner.intern("experimental"),
            ignore_unreachable: interner.intern("ignore_unreachable"),
            attribute: interner.intern("attribute"),
            converges: interner.intern("converges"),
            computes: interner.intern("computes"),
            transacts: interner.intern("transacts"),
            varies: interner.intern("varies"),
            reads: interner.intern("reads"),
            writes: interner.intern("writes"),
            allocates: interner.intern("allocates"),
            no_rollback: interner.intern("no_rollback"),
            dictates: interner.intern("dictates"),
            suspends: interner.intern("suspends"),
            decides: interner.intern("decides"),
            diverges: interner.intern("diverges"),
        }
    }
}
