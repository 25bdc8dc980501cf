//! Unified type index handle.
//!
//! `Idx` is THE canonical type representation. All types are stored in a
//! unified pool and referenced by their 32-bit index.
//!
//! - 32-bit indices allow 4+ billion unique types
//! - Primitive types have fixed indices (0-11) for O(1) lookup
//! - Type equality is O(1) index comparison
//! - Copy, lightweight passing

use std::fmt;

/// A 32-bit index into the type pool.
///
/// Types are compared by index equality (O(1)); structural equivalence for
/// the few cases that need it goes through the lattice operations.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    // === Primitive Types (indices 0-11) ===
    // Pre-interned at pool creation for O(1) access.

    /// The error sentinel; transparently compatible with everything to
    /// avoid diagnostic cascades.
    pub const UNKNOWN: Self = Self(0);
    /// The bottom type `false` (no values).
    pub const FALSE: Self = Self(1);
    /// The `true` type (the single trivially-true value).
    pub const TRUE: Self = Self(2);
    /// The `void` type (result of statements).
    pub const VOID: Self = Self(3);
    /// The top type `any`.
    pub const ANY: Self = Self(4);
    /// The `comparable` type (everything with a defined equality).
    pub const COMPARABLE: Self = Self(5);
    /// The `logic` type.
    pub const LOGIC: Self = Self(6);
    /// The `int` type (arbitrary-precision integer).
    pub const INT: Self = Self(7);
    /// The `rational` type (supertype of `int`).
    pub const RATIONAL: Self = Self(8);
    /// The `float` type (64-bit floating point).
    pub const FLOAT: Self = Self(9);
    /// The `char` type (Unicode scalar value).
    pub const CHAR: Self = Self(10);
    /// The `string` type.
    pub const STRING: Self = Self(11);

    /// Number of pre-interned primitive types; dynamic types start here.
    pub const PRIMITIVE_COUNT: u32 = 12;

    /// Sentinel value indicating no type / invalid index.
    pub const NONE: Self = Self(u32::MAX);

    /// Create an index from a raw u32 value.
    ///
    /// The caller must ensure the index is valid in the pool.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is a primitive type (pre-interned).
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Check if this is the UNKNOWN (error) type.
    #[inline]
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    /// Get the human-readable name for primitive types.
    ///
    /// Returns `None` for dynamic types, which need a pool to render.
    #[inline]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("<unknown>"),
            1 => Some("false"),
            2 => Some("true"),
            3 => Some("void"),
            4 => Some("any"),
            5 => Some("comparable"),
            6 => Some("logic"),
            7 => Some("int"),
            8 => Some("rational"),
            9 => Some("float"),
            10 => Some("char"),
            11 => Some("string"),
            _ => None,
        }
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "Idx::NONE");
        }
        match self.name() {
            Some(name) => write!(f, "Idx({name})"),
            None => write!(f, "Idx({})", self.0),
        }
    }
}

impl fmt::Display for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "<none>");
        }
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "type#{}", self.0),
        }
    }
}
