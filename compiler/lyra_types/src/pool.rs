//! The hash-consing type pool.
//!
//! One `Pool` exists per analysis session. Structural types are
//! deduplicated at interning time so `Idx` equality is structural equality;
//! nominal and flow entries are identity-interned (each creation yields a
//! fresh index) because their meaning is their identity, not their shape.

use lyra_ir::Name;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{EffectSet, Idx, Tag};

/// Polarity of a type position.
///
/// Negative is "accepted as input" (lower bound), positive is "produced as
/// output" (upper bound). Purely covariant types look the same from both
/// sides; mutable cells and flow placeholders do not.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Polarity {
    Negative,
    Positive,
}

impl Polarity {
    #[inline]
    pub fn flip(self) -> Polarity {
        match self {
            Polarity::Negative => Polarity::Positive,
            Polarity::Positive => Polarity::Negative,
        }
    }
}

/// Index of a nominal entry in the pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct NominalId(pub u32);

/// Index of a flow placeholder in the pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct FlowId(pub u32);

/// What kind of declaration a nominal entry stands for.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NominalKind {
    Class,
    Interface,
    Module,
    Enumeration,
    TypeVariable,
}

/// Declared facts about a nominal type.
///
/// Created when the declaration is first seen; the inheritance edges are
/// mutated in a later phase than creation, since cycles can only be checked
/// once the whole hierarchy exists.
#[derive(Clone, Debug)]
pub struct NominalInfo {
    pub kind: NominalKind,
    pub name: Name,
    /// Superclass (classes only); must itself be a `Nominal` class type.
    pub superclass: Option<Idx>,
    /// Implemented interfaces (classes) or super-interfaces (interfaces).
    pub interfaces: Vec<Idx>,
    /// Declared lower bound (type variables only).
    pub neg_bound: Idx,
    /// Declared upper bound (type variables only).
    pub pos_bound: Idx,
    /// Set once the variable's owning function is generalized.
    pub generalized: bool,
}

impl NominalInfo {
    pub fn new(kind: NominalKind, name: Name) -> Self {
        NominalInfo {
            kind,
            name,
            superclass: None,
            interfaces: Vec::new(),
            neg_bound: Idx::FALSE,
            pos_bound: Idx::ANY,
            generalized: false,
        }
    }
}

/// Mutable state of a flow placeholder.
///
/// The child accumulates what is known so far (joins in positive
/// placeholders, meets in negative ones); edges connect negative and
/// positive placeholders that must stay admissible. Edges are append-only:
/// adding a constraint may add edges but never removes one.
#[derive(Clone, Debug)]
pub struct FlowState {
    pub polarity: Polarity,
    pub child: Idx,
    pub edges: Vec<FlowId>,
}

#[derive(Copy, Clone, Debug)]
struct Item {
    tag: Tag,
    data: u32,
}

/// The type table: hash-consed items plus identity-interned nominal and
/// flow entries.
pub struct Pool {
    items: Vec<Item>,
    extra: Vec<u32>,
    dedup_simple: FxHashMap<(Tag, u32), Idx>,
    dedup_complex: FxHashMap<(Tag, Box<[u32]>), Idx>,
    flows: Vec<FlowState>,
    /// Item index of each flow, parallel to `flows`.
    flow_items: Vec<Idx>,
    nominals: Vec<NominalInfo>,
}

impl Pool {
    pub fn new() -> Self {
        let mut pool = Pool {
            items: Vec::with_capacity(64),
            extra: Vec::new(),
            dedup_simple: FxHashMap::default(),
            dedup_complex: FxHashMap::default(),
            flows: Vec::new(),
            flow_items: Vec::new(),
            nominals: Vec::new(),
        };
        // Pre-intern primitives at their fixed indices.
        for tag in [
            Tag::Unknown,
            Tag::False,
            Tag::True,
            Tag::Void,
            Tag::Any,
            Tag::Comparable,
            Tag::Logic,
            Tag::Int,
            Tag::Rational,
            Tag::Float,
            Tag::Char,
            Tag::String,
        ] {
            pool.items.push(Item { tag, data: 0 });
        }
        debug_assert_eq!(pool.items.len() as u32, Idx::PRIMITIVE_COUNT);
        pool
    }

    /// Number of interned types.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        false // primitives are always present
    }

    // ========================================
    // Raw access
    // ========================================

    #[inline]
    pub fn tag(&self, idx: Idx) -> Tag {
        self.items[idx.raw() as usize].tag
    }

    #[inline]
    pub fn data(&self, idx: Idx) -> u32 {
        self.items[idx.raw() as usize].data
    }

    #[inline]
    fn extra_at(&self, start: u32, offset: u32) -> u32 {
        self.extra[(start + offset) as usize]
    }

    // ========================================
    // Interning
    // ========================================

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn intern(&mut self, tag: Tag, data: u32) -> Idx {
        debug_assert!(tag.is_primitive() || tag.is_one_child());
        if let Some(&idx) = self.dedup_simple.get(&(tag, data)) {
            return idx;
        }
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(Item { tag, data });
        self.dedup_simple.insert((tag, data), idx);
        idx
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn intern_complex(&mut self, tag: Tag, payload: &[u32]) -> Idx {
        if let Some(&idx) = self.dedup_complex.get(&(tag, Box::from(payload))) {
            return idx;
        }
        let start = self.extra.len() as u32;
        self.extra.extend_from_slice(payload);
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(Item { tag, data: start });
        self.dedup_complex.insert((tag, Box::from(payload)), idx);
        idx
    }

    // ========================================
    // Nominal entries
    // ========================================

    /// Register a new nominal type. Each call yields a fresh identity.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new_nominal(&mut self, info: NominalInfo) -> Idx {
        let id = self.nominals.len() as u32;
        self.nominals.push(info);
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(Item {
            tag: Tag::Nominal,
            data: id,
        });
        idx
    }

    #[inline]
    pub fn nominal_id(&self, idx: Idx) -> NominalId {
        debug_assert_eq!(self.tag(idx), Tag::Nominal);
        NominalId(self.data(idx))
    }

    #[inline]
    pub fn nominal(&self, idx: Idx) -> &NominalInfo {
        &self.nominals[self.data(idx) as usize]
    }

    #[inline]
    pub fn nominal_mut(&mut self, idx: Idx) -> &mut NominalInfo {
        let id = self.data(idx) as usize;
        &mut self.nominals[id]
    }

    /// All transitively implemented interfaces of a class or interface,
    /// including those inherited through superclasses. Cycle-safe.
    pub fn all_interfaces(&self, idx: Idx) -> Vec<Idx> {
        let mut out = Vec::new();
        let mut work: SmallVec<[Idx; 8]> = SmallVec::new();
        work.push(idx);
        let mut seen: SmallVec<[Idx; 8]> = SmallVec::new();
        while let Some(current) = work.pop() {
            if seen.contains(&current) || self.tag(current) != Tag::Nominal {
                continue;
            }
            seen.push(current);
            let info = self.nominal(current);
            if info.kind == NominalKind::Interface && current != idx {
                out.push(current);
            }
            if let Some(superclass) = info.superclass {
                work.push(superclass);
            }
            for &iface in &info.interfaces {
                work.push(iface);
            }
        }
        out
    }

    /// Walk the superclass chain starting at (and including) `idx`.
    /// Cycle-safe: stops on revisit.
    pub fn superclass_chain(&self, idx: Idx) -> Vec<Idx> {
        let mut chain = Vec::new();
        let mut current = Some(idx);
        while let Some(class) = current {
            if chain.contains(&class) || self.tag(class) != Tag::Nominal {
                break;
            }
            chain.push(class);
            current = self.nominal(class).superclass;
        }
        chain
    }

    // ========================================
    // Flow placeholders
    // ========================================

    /// Create a fresh flow placeholder. Never deduplicated.
    ///
    /// A positive placeholder starts at bottom (`false`) and joins upward;
    /// a negative one starts at top (`any`) and meets downward.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new_flow(&mut self, polarity: Polarity) -> Idx {
        let child = match polarity {
            Polarity::Positive => Idx::FALSE,
            Polarity::Negative => Idx::ANY,
        };
        let id = self.flows.len() as u32;
        self.flows.push(FlowState {
            polarity,
            child,
            edges: Vec::new(),
        });
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(Item {
            tag: Tag::Flow,
            data: id,
        });
        self.flow_items.push(idx);
        idx
    }

    /// Create a mutually-edged negative/positive placeholder pair.
    ///
    /// This is the instantiation shape for a not-yet-known type: values
    /// flow in through the negative side and out through the positive one.
    pub fn new_flow_pair(&mut self) -> (Idx, Idx) {
        let neg = self.new_flow(Polarity::Negative);
        let pos = self.new_flow(Polarity::Positive);
        self.add_flow_edge(self.flow_id(neg), self.flow_id(pos));
        self.add_flow_edge(self.flow_id(pos), self.flow_id(neg));
        (neg, pos)
    }

    #[inline]
    pub fn is_flow(&self, idx: Idx) -> bool {
        self.tag(idx) == Tag::Flow
    }

    #[inline]
    pub fn flow_id(&self, idx: Idx) -> FlowId {
        debug_assert_eq!(self.tag(idx), Tag::Flow);
        FlowId(self.data(idx))
    }

    #[inline]
    pub fn flow(&self, id: FlowId) -> &FlowState {
        &self.flows[id.0 as usize]
    }

    #[inline]
    pub fn flow_polarity(&self, id: FlowId) -> Polarity {
        self.flows[id.0 as usize].polarity
    }

    #[inline]
    pub fn flow_child(&self, id: FlowId) -> Idx {
        self.flows[id.0 as usize].child
    }

    pub(crate) fn set_flow_child(&mut self, id: FlowId, child: Idx) {
        self.flows[id.0 as usize].child = child;
    }

    /// Add a directed edge. Append-only; duplicates are ignored.
    pub fn add_flow_edge(&mut self, from: FlowId, to: FlowId) {
        let edges = &mut self.flows[from.0 as usize].edges;
        if !edges.contains(&to) {
            edges.push(to);
        }
    }

    pub fn flow_edges(&self, id: FlowId) -> &[FlowId] {
        &self.flows[id.0 as usize].edges
    }

    /// The `Idx` of a flow placeholder by id.
    #[inline]
    pub fn flow_idx(&self, id: FlowId) -> Idx {
        self.flow_items[id.0 as usize]
    }

    /// Resolve through flow placeholders to the underlying shaped type.
    ///
    /// Guarded against pathological flow cycles; a cycle resolves to
    /// `UNKNOWN` (a true recursive type is rejected elsewhere).
    pub fn normal(&self, idx: Idx) -> Idx {
        let mut current = idx;
        let mut hops = 0usize;
        while self.tag(current) == Tag::Flow {
            if hops > self.flows.len() {
                return Idx::UNKNOWN;
            }
            current = self.flow_child(self.flow_id(current));
            hops += 1;
        }
        current
    }

    // ========================================
    // Composite accessors
    // ========================================

    #[inline]
    pub fn array_elem(&self, idx: Idx) -> Idx {
        debug_assert_eq!(self.tag(idx), Tag::Array);
        Idx::from_raw(self.data(idx))
    }

    #[inline]
    pub fn option_inner(&self, idx: Idx) -> Idx {
        debug_assert_eq!(self.tag(idx), Tag::Option);
        Idx::from_raw(self.data(idx))
    }

    #[inline]
    pub fn map_key(&self, idx: Idx) -> Idx {
        debug_assert_eq!(self.tag(idx), Tag::Map);
        Idx::from_raw(self.extra_at(self.data(idx), 0))
    }

    #[inline]
    pub fn map_value(&self, idx: Idx) -> Idx {
        debug_assert_eq!(self.tag(idx), Tag::Map);
        Idx::from_raw(self.extra_at(self.data(idx), 1))
    }

    /// Negative slot of a pointer, reference, or type-of type.
    #[inline]
    pub fn negative_slot(&self, idx: Idx) -> Idx {
        debug_assert!(matches!(
            self.tag(idx),
            Tag::Pointer | Tag::Reference | Tag::TypeOf
        ));
        Idx::from_raw(self.extra_at(self.data(idx), 0))
    }

    /// Positive slot of a pointer, reference, or type-of type.
    #[inline]
    pub fn positive_slot(&self, idx: Idx) -> Idx {
        debug_assert!(matches!(
            self.tag(idx),
            Tag::Pointer | Tag::Reference | Tag::TypeOf
        ));
        Idx::from_raw(self.extra_at(self.data(idx), 1))
    }

    pub fn tuple_elems(&self, idx: Idx) -> Vec<Idx> {
        debug_assert_eq!(self.tag(idx), Tag::Tuple);
        let start = self.data(idx);
        let count = self.extra_at(start, 0);
        (0..count)
            .map(|i| Idx::from_raw(self.extra_at(start, 1 + i)))
            .collect()
    }

    pub fn tuple_len(&self, idx: Idx) -> usize {
        debug_assert_eq!(self.tag(idx), Tag::Tuple);
        self.extra_at(self.data(idx), 0) as usize
    }

    #[inline]
    pub fn function_effects(&self, idx: Idx) -> EffectSet {
        debug_assert_eq!(self.tag(idx), Tag::Function);
        #[allow(clippy::cast_possible_truncation)]
        EffectSet::from_bits_truncate(self.extra_at(self.data(idx), 0) as u16)
    }

    pub fn function_params(&self, idx: Idx) -> Vec<Idx> {
        debug_assert_eq!(self.tag(idx), Tag::Function);
        let start = self.data(idx);
        let count = self.extra_at(start, 1);
        (0..count)
            .map(|i| Idx::from_raw(self.extra_at(start, 2 + i)))
            .collect()
    }

    pub fn function_param_count(&self, idx: Idx) -> usize {
        debug_assert_eq!(self.tag(idx), Tag::Function);
        self.extra_at(self.data(idx), 1) as usize
    }

    #[inline]
    pub fn function_return(&self, idx: Idx) -> Idx {
        debug_assert_eq!(self.tag(idx), Tag::Function);
        let start = self.data(idx);
        let count = self.extra_at(start, 1);
        Idx::from_raw(self.extra_at(start, 2 + count))
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}
