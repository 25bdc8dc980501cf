//! Type kind tag for tag-driven dispatch.
//!
//! Each type in the pool has a `Tag` that identifies its kind. The tag
//! determines how to interpret the associated `data` field.
//!
//! Tags are organized into semantic ranges:
//! - 0-15: Primitives (data unused)
//! - 16-31: One-child containers (data = child Idx)
//! - 32-47: Fixed two-slot types (data = extra index)
//! - 48-79: Variable-length types (data = extra index with counts)
//! - 80-95: Nominal entries (data = nominal id)
//! - 96-111: Flow placeholders (data = flow id)

use std::fmt;

/// Type kind discriminant.
///
/// Determines how to interpret the `data` field of a pool item.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Tag {
    // === Primitives (0-15) ===
    // data: unused (0)
    /// Error sentinel; compatible with everything.
    Unknown = 0,
    /// Bottom type (no values).
    False = 1,
    /// The trivially-true value's type.
    True = 2,
    /// Statement result type.
    Void = 3,
    /// Top type.
    Any = 4,
    /// Everything with defined equality.
    Comparable = 5,
    /// Boolean logic values.
    Logic = 6,
    /// Arbitrary-precision integer.
    Int = 7,
    /// Supertype of `int`.
    Rational = 8,
    /// 64-bit floating point.
    Float = 9,
    /// Unicode scalar value.
    Char = 10,
    /// Character sequence.
    String = 11,

    // === One-Child Containers (16-31) ===
    // data: child Idx.raw()
    /// Array type `[]t`.
    Array = 16,
    /// Option type `?t`.
    Option = 17,

    // === Fixed Two-Slot Types (32-47) ===
    // data: index into extra[] with two consecutive Idx values
    /// Map type `map(k, v)`. Extra layout: `[key, value]`.
    Map = 32,
    /// Mutable pointer cell. Extra layout: `[negative, positive]`.
    Pointer = 33,
    /// Reference to a mutable cell. Extra layout: `[negative, positive]`.
    Reference = 34,
    /// Type-of-a-type value. Extra layout: `[negative, positive]`.
    TypeOf = 35,

    // === Variable-Length Types (48-79) ===
    // data: index into extra[] with a count prefix
    /// Tuple type. Extra layout: `[elem_count, elem0, elem1, ...]`.
    Tuple = 48,
    /// Function type. Extra layout:
    /// `[effect_bits, param_count, param0, ..., return_type]`.
    Function = 49,

    // === Nominal Entries (80-95) ===
    // data: NominalId (identity-interned, never deduplicated)
    /// Class, interface, module, enumeration, or type variable.
    Nominal = 80,

    // === Flow Placeholders (96-111) ===
    // data: FlowId (mutable, never deduplicated)
    /// Polarized placeholder with directed flow edges.
    Flow = 96,
}

impl Tag {
    /// Whether the data field is a child `Idx` directly.
    #[inline]
    pub const fn is_one_child(self) -> bool {
        matches!(self, Tag::Array | Tag::Option)
    }

    /// Whether this is a pre-interned primitive tag.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        (self as u8) < 16
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::Unknown => "Unknown",
            Tag::False => "False",
            Tag::True => "True",
            Tag::Void => "Void",
            Tag::Any => "Any",
            Tag::Comparable => "Comparable",
            Tag::Logic => "Logic",
            Tag::Int => "Int",
            Tag::Rational => "Rational",
            Tag::Float => "Float",
            Tag::Char => "Char",
            Tag::String => "String",
            Tag::Array => "Array",
            Tag::Option => "Option",
            Tag::Map => "Map",
            Tag::Pointer => "Pointer",
            Tag::Reference => "Reference",
            Tag::TypeOf => "TypeOf",
            Tag::Tuple => "Tuple",
            Tag::Function => "Function",
            Tag::Nominal => "Nominal",
            Tag::Flow => "Flow",
        };
        f.write_str(name)
    }
}
