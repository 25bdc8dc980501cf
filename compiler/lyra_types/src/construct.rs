//! Type construction helpers for the Pool.
//!
//! Provides ergonomic methods for creating compound types.

use crate::{EffectSet, Idx, Pool, Tag};

impl Pool {
    // === One-Child Container Constructors ===

    /// Create an array type `[]elem`.
    pub fn array(&mut self, elem: Idx) -> Idx {
        self.intern(Tag::Array, elem.raw())
    }

    /// Create an option type `?inner`.
    pub fn option(&mut self, inner: Idx) -> Idx {
        self.intern(Tag::Option, inner.raw())
    }

    // === Fixed Two-Slot Constructors ===

    /// Create a map type `map(key, value)`.
    pub fn map(&mut self, key: Idx, value: Idx) -> Idx {
        self.intern_complex(Tag::Map, &[key.raw(), value.raw()])
    }

    /// Create a mutable pointer cell type with independent bounds.
    pub fn pointer(&mut self, negative: Idx, positive: Idx) -> Idx {
        self.intern_complex(Tag::Pointer, &[negative.raw(), positive.raw()])
    }

    /// Create a reference type with independent bounds.
    pub fn reference(&mut self, negative: Idx, positive: Idx) -> Idx {
        self.intern_complex(Tag::Reference, &[negative.raw(), positive.raw()])
    }

    /// Create a type-of-a-type value with independent bounds.
    pub fn type_of(&mut self, negative: Idx, positive: Idx) -> Idx {
        self.intern_complex(Tag::TypeOf, &[negative.raw(), positive.raw()])
    }

    /// Create a covariant pointer (same bound on both sides).
    pub fn pointer_to(&mut self, value: Idx) -> Idx {
        self.pointer(value, value)
    }

    /// Create the type of a type literal denoting exactly `value`.
    pub fn exact_type_of(&mut self, value: Idx) -> Idx {
        self.type_of(value, value)
    }

    // === Tuple Constructor ===

    /// Create a tuple type `(elems...)`.
    ///
    /// Empty tuples are the `void` type; a singleton tuple is its element.
    #[allow(clippy::cast_possible_truncation)]
    pub fn tuple(&mut self, elems: &[Idx]) -> Idx {
        match elems {
            [] => Idx::VOID,
            [single] => *single,
            _ => {
                // Layout: [elem_count, elem0, elem1, ...]
                let mut payload = Vec::with_capacity(elems.len() + 1);
                payload.push(elems.len() as u32);
                for &e in elems {
                    payload.push(e.raw());
                }
                self.intern_complex(Tag::Tuple, &payload)
            }
        }
    }

    // === Function Constructor ===

    /// Create a function type `(params...) -> ret` with its effect set.
    #[allow(clippy::cast_possible_truncation)]
    pub fn function(&mut self, params: &[Idx], ret: Idx, effects: EffectSet) -> Idx {
        // Layout: [effect_bits, param_count, param0, ..., return_type]
        let mut payload = Vec::with_capacity(params.len() + 3);
        payload.push(u32::from(effects.bits()));
        payload.push(params.len() as u32);
        for &p in params {
            payload.push(p.raw());
        }
        payload.push(ret.raw());
        self.intern_complex(Tag::Function, &payload)
    }
}
