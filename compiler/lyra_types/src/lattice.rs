//! The lattice operations: constrain, subtype checks, matches, join, meet.
//!
//! All four relation algorithms share one structural comparator
//! ([`Pool::shape`]) parameterized by a mode; they differ only in how flow
//! placeholders are handled:
//!
//! - `constrain` merges constraints into flow children and adds flow edges
//!   (mutating, monotone: edges are never removed);
//! - `is_subtype` runs subsumption (collecting corresponding flow pairs)
//!   followed by an admissibility check over those pairs (read-only);
//! - `matches` compares declared domains structurally for overload
//!   dispatch.
//!
//! Each algorithm carries a visited set of type pairs so self-referential
//! types terminate (coinductive reading).

use smallvec::SmallVec;
use tracing::trace;

use crate::{FlowId, Idx, NominalKind, Polarity, Pool, Tag};

/// Which relation a structural walk is computing.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Mode {
    Constrain,
    Subsume,
    Admissible,
    Matches,
}

/// Per-walk scratch state.
struct Walk {
    mode: Mode,
    visited: SmallVec<[(Idx, Idx); 16]>,
    /// Corresponding negative flow pairs collected during subsumption.
    neg_pairs: Vec<(FlowId, FlowId)>,
    /// Corresponding positive flow pairs collected during subsumption.
    pos_pairs: Vec<(FlowId, FlowId)>,
}

impl Walk {
    fn new(mode: Mode) -> Self {
        Walk {
            mode,
            visited: SmallVec::new(),
            neg_pairs: Vec::new(),
            pos_pairs: Vec::new(),
        }
    }
}

impl Pool {
    // ========================================
    // Public relations
    // ========================================

    /// Require `sub` to be a subtype of `super_`.
    ///
    /// Mutates the lattice: adds the flow edges and child bounds needed to
    /// make the relation hold. Returns false (leaving the diagnostic to
    /// the caller) if no such edges can make it hold. Once true, the
    /// relation stays true: constraints are never retracted.
    pub fn constrain(&mut self, sub: Idx, super_: Idx) -> bool {
        trace!(sub = sub.raw(), super_ = super_.raw(), "constrain");
        let mut walk = Walk::new(Mode::Constrain);
        self.relate(sub, super_, Polarity::Positive, Polarity::Negative, &mut walk)
    }

    /// Read-only check: are all instances of `a` subtypes of `b`?
    pub fn is_subtype(&mut self, a: Idx, b: Idx) -> bool {
        let mut walk = Walk::new(Mode::Subsume);
        if !self.relate(a, b, Polarity::Positive, Polarity::Positive, &mut walk) {
            return false;
        }
        self.admissible_pairs(&walk.neg_pairs, &walk.pos_pairs)
    }

    /// Read-only check: mutual subsumption.
    pub fn is_equivalent(&mut self, a: Idx, b: Idx) -> bool {
        let mut walk = Walk::new(Mode::Subsume);
        if !self.relate(a, b, Polarity::Positive, Polarity::Positive, &mut walk) {
            return false;
        }
        if !self.relate(b, a, Polarity::Positive, Polarity::Positive, &mut walk) {
            return false;
        }
        self.admissible_pairs(&walk.neg_pairs, &walk.pos_pairs)
    }

    /// Structural domain comparison for overload dispatch.
    ///
    /// Dispatch is by declared domain, not runtime value, so this is
    /// neither plain subtyping nor equality: the error sentinel and bottom
    /// accept anything, and contravariant slots flip as usual.
    pub fn matches(&mut self, arg: Idx, domain: Idx) -> bool {
        let mut walk = Walk::new(Mode::Matches);
        self.relate(arg, domain, Polarity::Positive, Polarity::Negative, &mut walk)
    }

    // ========================================
    // Relation dispatch (flow handling per mode)
    // ========================================

    fn relate(&mut self, a: Idx, b: Idx, pa: Polarity, pb: Polarity, walk: &mut Walk) -> bool {
        if walk.visited.contains(&(a, b)) {
            return true;
        }
        walk.visited.push((a, b));

        match walk.mode {
            Mode::Constrain => self.relate_constrain(a, b, pa, pb, walk),
            Mode::Subsume => {
                if self.is_flow(a) && self.is_flow(b) {
                    let fa = self.flow_id(a);
                    let fb = self.flow_id(b);
                    match self.flow_polarity(fa) {
                        Polarity::Negative => walk.neg_pairs.push((fa, fb)),
                        Polarity::Positive => walk.pos_pairs.push((fa, fb)),
                    }
                }
                let (na, nb) = (self.normal(a), self.normal(b));
                self.shape(na, nb, pa, pb, walk)
            }
            Mode::Admissible => {
                if self.connected_flows(a, b) {
                    return true;
                }
                let (na, nb) = (self.normal(a), self.normal(b));
                self.shape(na, nb, pa, pb, walk)
            }
            Mode::Matches => {
                let (na, nb) = (self.normal(a), self.normal(b));
                self.shape(na, nb, pa, pb, walk)
            }
        }
    }

    fn relate_constrain(
        &mut self,
        a: Idx,
        b: Idx,
        pa: Polarity,
        pb: Polarity,
        walk: &mut Walk,
    ) -> bool {
        if self.is_flow(a) {
            let fa = self.flow_id(a);
            if self.is_flow(b) {
                let fb = self.flow_id(b);
                let (ca, cb) = (self.flow_child(fa), self.flow_child(fb));
                if !self.relate(ca, cb, pa, pb, walk) {
                    return false;
                }
                // Propagate: b's bound reaches everything flowing out of a,
                // a's bound reaches everything flowing into b.
                for neg in self.flow_edges(fa).to_vec() {
                    self.merge_flow(neg, fb);
                }
                for pos in self.flow_edges(fb).to_vec() {
                    self.merge_flow(pos, fa);
                }
                return true;
            }
            let ca = self.flow_child(fa);
            if !self.relate(ca, b, pa, pb, walk) {
                return false;
            }
            for neg in self.flow_edges(fa).to_vec() {
                self.merge_child(neg, b);
            }
            return true;
        }
        if self.is_flow(b) {
            let fb = self.flow_id(b);
            let cb = self.flow_child(fb);
            if !self.relate(a, cb, pa, pb, walk) {
                return false;
            }
            for pos in self.flow_edges(fb).to_vec() {
                self.merge_child(pos, a);
            }
            return true;
        }
        self.shape(a, b, pa, pb, walk)
    }

    /// Fold `src` into a flow placeholder's accumulated child.
    fn merge_child(&mut self, dest: FlowId, src: Idx) {
        let child = self.flow_child(dest);
        let merged = match self.flow_polarity(dest) {
            Polarity::Negative => self.meet(child, src),
            Polarity::Positive => self.join(child, src),
        };
        self.set_flow_child(dest, merged);
    }

    /// Fold another flow placeholder into `dest`: child plus edges, both
    /// directions (edges stay symmetric between polarities).
    fn merge_flow(&mut self, dest: FlowId, src: FlowId) {
        let src_child = self.flow_child(src);
        self.merge_child(dest, src_child);
        for edge in self.flow_edges(src).to_vec() {
            self.add_flow_edge(dest, edge);
            self.add_flow_edge(edge, dest);
        }
    }

    fn connected_flows(&self, a: Idx, b: Idx) -> bool {
        if !self.is_flow(a) || !self.is_flow(b) {
            return false;
        }
        let fa = self.flow_id(a);
        let fb = self.flow_id(b);
        if self.flow_edges(fa).len() < self.flow_edges(fb).len() {
            self.flow_edges(fa).contains(&fb)
        } else {
            self.flow_edges(fb).contains(&fa)
        }
    }

    /// Admissibility over the flow correspondences collected by
    /// subsumption: wherever the left scheme asserted an edge between a
    /// negative and a positive placeholder, the corresponding right-hand
    /// placeholders must themselves be admissible.
    fn admissible_pairs(&mut self, neg_pairs: &[(FlowId, FlowId)], pos_pairs: &[(FlowId, FlowId)]) -> bool {
        for &(n1, n2) in neg_pairs {
            for p1 in self.flow_edges(n1).to_vec() {
                if let Some(&(_, p2)) = pos_pairs.iter().find(|(first, _)| *first == p1) {
                    let neg = self.flow_idx(n2);
                    let pos = self.flow_idx(p2);
                    let mut walk = Walk::new(Mode::Admissible);
                    if !self.relate(neg, pos, Polarity::Negative, Polarity::Positive, &mut walk) {
                        return false;
                    }
                }
            }
        }
        true
    }

    // ========================================
    // Structural comparator (shared by all modes)
    // ========================================

    #[allow(clippy::too_many_lines)]
    fn shape(&mut self, a: Idx, b: Idx, pa: Polarity, pb: Polarity, walk: &mut Walk) -> bool {
        if a == b {
            return true;
        }
        let (ta, tb) = (self.tag(a), self.tag(b));

        // The error sentinel is transparently compatible both ways to
        // avoid diagnostic cascades.
        if ta == Tag::Unknown || tb == Tag::Unknown {
            return true;
        }
        if ta == Tag::False {
            return true;
        }
        if tb == Tag::Any {
            return true;
        }
        // `void` in negative position accepts anything (statement slots).
        if pb == Polarity::Negative && tb == Tag::Void {
            return true;
        }
        // `void` in positive position is equivalent to `true`.
        if pa == Polarity::Positive && ta == Tag::Void && tb == Tag::True {
            return true;
        }
        if ta == Tag::True && pb == Polarity::Positive && tb == Tag::Void {
            return true;
        }
        if tb == Tag::Comparable && self.is_comparable(a) {
            return true;
        }
        if tb == Tag::Rational && ta == Tag::Int {
            return true;
        }

        // A tuple is a subtype of an array of a common element supertype.
        if ta == Tag::Tuple && tb == Tag::Array {
            let elems = self.tuple_elems(a);
            let elem_b = self.array_elem(b);
            return elems
                .into_iter()
                .all(|e| self.relate(e, elem_b, pa, pb, walk));
        }
        if ta == Tag::Tuple && tb == Tag::Tuple {
            let ea = self.tuple_elems(a);
            let eb = self.tuple_elems(b);
            if ea.len() != eb.len() {
                return false;
            }
            return ea
                .into_iter()
                .zip(eb)
                .all(|(x, y)| self.relate(x, y, pa, pb, walk));
        }
        if ta == Tag::Tuple || tb == Tag::Tuple {
            return false;
        }

        // Type variables compare via their declared bounds.
        if ta == Tag::Nominal && self.nominal(a).kind == NominalKind::TypeVariable {
            let bound = self.nominal(a).pos_bound;
            return self.relate(bound, b, pa, pb, walk);
        }
        if tb == Tag::Nominal && self.nominal(b).kind == NominalKind::TypeVariable {
            let bound = self.nominal(b).neg_bound;
            return self.relate(a, bound, pa, pb, walk);
        }

        if ta != tb {
            return false;
        }
        match ta {
            Tag::Array => {
                let (ea, eb) = (self.array_elem(a), self.array_elem(b));
                self.relate(ea, eb, pa, pb, walk)
            }
            Tag::Option => {
                let (ia, ib) = (self.option_inner(a), self.option_inner(b));
                self.relate(ia, ib, pa, pb, walk)
            }
            Tag::Map => {
                let (ka, va) = (self.map_key(a), self.map_value(a));
                let (kb, vb) = (self.map_key(b), self.map_value(b));
                self.relate(ka, kb, pa, pb, walk) && self.relate(va, vb, pa, pb, walk)
            }
            // Invariant cells: contravariant in the negative slot,
            // covariant in the positive one.
            Tag::Pointer | Tag::Reference | Tag::TypeOf => {
                let (na, posa) = (self.negative_slot(a), self.positive_slot(a));
                let (nb, posb) = (self.negative_slot(b), self.positive_slot(b));
                self.relate(nb, na, pb.flip(), pa.flip(), walk)
                    && self.relate(posa, posb, pa, pb, walk)
            }
            Tag::Function => {
                // The supertype must allow every effect the subtype has.
                if !self
                    .function_effects(b)
                    .contains(self.function_effects(a))
                {
                    return false;
                }
                let params_a = self.function_params(a);
                let params_b = self.function_params(b);
                if params_a.len() != params_b.len() {
                    return false;
                }
                // Contravariant parameters, covariant return.
                for (x, y) in params_a.into_iter().zip(params_b) {
                    if !self.relate(y, x, pb.flip(), pa.flip(), walk) {
                        return false;
                    }
                }
                let (ra, rb) = (self.function_return(a), self.function_return(b));
                self.relate(ra, rb, pa, pb, walk)
            }
            Tag::Nominal => self.nominal_subtype(a, b),
            // Identical primitives were handled by the `a == b` fast path.
            _ => false,
        }
    }

    /// Nominal subtyping via declared inheritance edges. Identity was
    /// already ruled out by the caller.
    fn nominal_subtype(&self, a: Idx, b: Idx) -> bool {
        let (ka, kb) = (self.nominal(a).kind, self.nominal(b).kind);
        match (ka, kb) {
            (NominalKind::Class, NominalKind::Class) => self.superclass_chain(a).contains(&b),
            (NominalKind::Class | NominalKind::Interface, NominalKind::Interface) => {
                self.all_interfaces(a).contains(&b)
            }
            // Distinct modules, enumerations, and generalized type
            // variables have no values in common.
            _ => false,
        }
    }

    /// Whether values of this type have a defined equality.
    pub fn is_comparable(&self, idx: Idx) -> bool {
        let idx = self.normal(idx);
        match self.tag(idx) {
            Tag::Unknown
            | Tag::False
            | Tag::True
            | Tag::Void
            | Tag::Comparable
            | Tag::Logic
            | Tag::Int
            | Tag::Rational
            | Tag::Float
            | Tag::Char
            | Tag::String => true,
            Tag::Array => self.is_comparable(self.array_elem(idx)),
            Tag::Option => self.is_comparable(self.option_inner(idx)),
            Tag::Tuple => self
                .tuple_elems(idx)
                .into_iter()
                .all(|e| self.is_comparable(e)),
            Tag::Nominal => self.nominal(idx).kind == NominalKind::Enumeration,
            Tag::Map | Tag::Pointer | Tag::Reference | Tag::TypeOf | Tag::Function | Tag::Any
            | Tag::Flow => false,
        }
    }

    // ========================================
    // Join / Meet
    // ========================================

    /// Least upper bound.
    pub fn join(&mut self, a: Idx, b: Idx) -> Idx {
        if a == b {
            return a;
        }
        // A flow operand makes the result a fresh flow merging both sides.
        if self.is_flow(a) || self.is_flow(b) {
            return self.merge_operands(a, b);
        }
        let (ta, tb) = (self.tag(a), self.tag(b));
        match (ta, tb) {
            (Tag::Unknown, _) | (_, Tag::Any) => b,
            (_, Tag::Unknown) | (Tag::Any, _) => a,
            (Tag::False, _) => b,
            (_, Tag::False) => a,
            (Tag::Void, Tag::True) => b,
            (Tag::True, Tag::Void) => a,
            (Tag::Int, Tag::Rational) | (Tag::Rational, Tag::Int) => Idx::RATIONAL,
            _ => self.join_slow(a, b),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn join_slow(&mut self, a: Idx, b: Idx) -> Idx {
        let (ta, tb) = (self.tag(a), self.tag(b));

        if ta == Tag::Nominal && self.nominal(a).kind == NominalKind::TypeVariable {
            return self.join_type_variable(a, b);
        }
        if tb == Tag::Nominal && self.nominal(b).kind == NominalKind::TypeVariable {
            return self.join_type_variable(b, a);
        }

        // Tuple/array mix: the join is an array of joined elements.
        if ta == Tag::Tuple && tb == Tag::Array {
            return self.join_tuple_array(a, b);
        }
        if ta == Tag::Array && tb == Tag::Tuple {
            return self.join_tuple_array(b, a);
        }

        if ta != tb {
            return self.widest_common(a, b);
        }
        match ta {
            Tag::Array => {
                let e = self.join(self.array_elem(a), self.array_elem(b));
                self.array(e)
            }
            Tag::Option => {
                let i = self.join(self.option_inner(a), self.option_inner(b));
                self.option(i)
            }
            Tag::Map => {
                let k = self.join(self.map_key(a), self.map_key(b));
                let v = self.join(self.map_value(a), self.map_value(b));
                self.map(k, v)
            }
            Tag::Tuple => {
                let ea = self.tuple_elems(a);
                let eb = self.tuple_elems(b);
                if ea.len() != eb.len() {
                    return self.widest_common(a, b);
                }
                let joined: Vec<Idx> =
                    ea.into_iter().zip(eb).map(|(x, y)| self.join(x, y)).collect();
                self.tuple(&joined)
            }
            Tag::Pointer | Tag::Reference | Tag::TypeOf => {
                let neg = self.meet(self.negative_slot(a), self.negative_slot(b));
                let pos = self.join(self.positive_slot(a), self.positive_slot(b));
                match ta {
                    Tag::Pointer => self.pointer(neg, pos),
                    Tag::Reference => self.reference(neg, pos),
                    _ => self.type_of(neg, pos),
                }
            }
            Tag::Function => {
                let pa = self.function_params(a);
                let pb = self.function_params(b);
                if pa.len() != pb.len() {
                    return Idx::ANY;
                }
                // Meet of parameters, join of returns, union of effects.
                let params: Vec<Idx> =
                    pa.into_iter().zip(pb).map(|(x, y)| self.meet(x, y)).collect();
                let ret = self.join(self.function_return(a), self.function_return(b));
                let effects = self.function_effects(a) | self.function_effects(b);
                self.function(&params, ret, effects)
            }
            Tag::Nominal => self.join_nominal(a, b),
            _ => self.widest_common(a, b),
        }
    }

    /// `comparable` when both sides have equality, otherwise `any`.
    fn widest_common(&self, a: Idx, b: Idx) -> Idx {
        if self.is_comparable(a) && self.is_comparable(b) {
            Idx::COMPARABLE
        } else {
            Idx::ANY
        }
    }

    fn join_tuple_array(&mut self, tuple: Idx, array: Idx) -> Idx {
        let mut elem = self.array_elem(array);
        for e in self.tuple_elems(tuple) {
            elem = self.join(elem, e);
        }
        self.array(elem)
    }

    fn join_type_variable(&mut self, tv: Idx, other: Idx) -> Idx {
        if self.is_subtype(other, tv) {
            return tv;
        }
        if self.is_subtype(tv, other) {
            return other;
        }
        let bound = self.nominal(tv).pos_bound;
        self.join(bound, other)
    }

    fn join_nominal(&mut self, a: Idx, b: Idx) -> Idx {
        let (ka, kb) = (self.nominal(a).kind, self.nominal(b).kind);
        match (ka, kb) {
            // Modules have no join below `any`.
            (NominalKind::Module, _) | (_, NominalKind::Module) => Idx::ANY,
            (NominalKind::Enumeration, NominalKind::Enumeration) => Idx::COMPARABLE,
            (NominalKind::Class, NominalKind::Class) => {
                // Most derived common superclass, if it also subsumes the
                // common interfaces; failing that, a sole common interface.
                let chain_a = self.superclass_chain(a);
                let chain_b = self.superclass_chain(b);
                let common_class = chain_a.iter().find(|c| chain_b.contains(c)).copied();
                let ifaces_a = self.all_interfaces(a);
                let ifaces_b = self.all_interfaces(b);
                let common_ifaces: Vec<Idx> = ifaces_a
                    .into_iter()
                    .filter(|i| ifaces_b.contains(i))
                    .collect();
                if let Some(class) = common_class {
                    if common_ifaces.iter().all(|&i| self.is_subtype(class, i)) {
                        return class;
                    }
                } else if common_ifaces.len() == 1 {
                    return common_ifaces[0];
                }
                self.widest_common(a, b)
            }
            (NominalKind::Interface, NominalKind::Interface) => {
                let mut sup_a = vec![a];
                sup_a.extend(self.all_interfaces(a));
                let mut sup_b = vec![b];
                sup_b.extend(self.all_interfaces(b));
                let common: Vec<Idx> = sup_a.into_iter().filter(|i| sup_b.contains(i)).collect();
                // Most derived: a common super-interface no other common
                // one is a subtype of.
                for &c in &common {
                    let derived_elsewhere = common
                        .iter()
                        .any(|&d| d != c && self.nominal_subtype(d, c));
                    if !derived_elsewhere && common.iter().all(|&d| d == c || self.nominal_subtype(c, d)) {
                        return c;
                    }
                }
                self.widest_common(a, b)
            }
            (NominalKind::Class, NominalKind::Interface) => self.join_class_interface(a, b),
            (NominalKind::Interface, NominalKind::Class) => self.join_class_interface(b, a),
            _ => self.widest_common(a, b),
        }
    }

    fn join_class_interface(&mut self, class: Idx, iface: Idx) -> Idx {
        if self.nominal_subtype(class, iface) {
            return iface;
        }
        let ifaces = self.all_interfaces(class);
        let mut sup = vec![iface];
        sup.extend(self.all_interfaces(iface));
        let common: Vec<Idx> = ifaces.into_iter().filter(|i| sup.contains(i)).collect();
        if common.len() == 1 {
            return common[0];
        }
        self.widest_common(class, iface)
    }

    /// Greatest lower bound.
    pub fn meet(&mut self, a: Idx, b: Idx) -> Idx {
        if a == b {
            return a;
        }
        if self.is_flow(a) || self.is_flow(b) {
            return self.merge_operands(a, b);
        }
        let (ta, tb) = (self.tag(a), self.tag(b));
        match (ta, tb) {
            (Tag::Unknown, _) | (_, Tag::Any) => b,
            (_, Tag::Unknown) | (Tag::Any, _) => a,
            (Tag::False, _) | (_, Tag::False) => Idx::FALSE,
            (Tag::Void, Tag::True) | (Tag::True, Tag::Void) => Idx::TRUE,
            (Tag::Int, Tag::Rational) | (Tag::Rational, Tag::Int) => Idx::INT,
            (_, Tag::Comparable) if self.is_comparable(a) => a,
            (Tag::Comparable, _) if self.is_comparable(b) => b,
            _ => self.meet_slow(a, b),
        }
    }

    fn meet_slow(&mut self, a: Idx, b: Idx) -> Idx {
        let (ta, tb) = (self.tag(a), self.tag(b));

        if ta == Tag::Nominal && self.nominal(a).kind == NominalKind::TypeVariable {
            return self.meet_type_variable(a, b);
        }
        if tb == Tag::Nominal && self.nominal(b).kind == NominalKind::TypeVariable {
            return self.meet_type_variable(b, a);
        }

        // Tuple/array mix: elementwise meet keeps the tuple shape.
        if ta == Tag::Tuple && tb == Tag::Array {
            return self.meet_tuple_array(a, b);
        }
        if ta == Tag::Array && tb == Tag::Tuple {
            return self.meet_tuple_array(b, a);
        }

        if ta != tb {
            return Idx::FALSE;
        }
        match ta {
            Tag::Array => {
                let e = self.meet(self.array_elem(a), self.array_elem(b));
                self.array(e)
            }
            Tag::Option => {
                let i = self.meet(self.option_inner(a), self.option_inner(b));
                self.option(i)
            }
            Tag::Map => {
                let k = self.meet(self.map_key(a), self.map_key(b));
                let v = self.meet(self.map_value(a), self.map_value(b));
                self.map(k, v)
            }
            Tag::Tuple => {
                let ea = self.tuple_elems(a);
                let eb = self.tuple_elems(b);
                if ea.len() != eb.len() {
                    return Idx::FALSE;
                }
                let met: Vec<Idx> =
                    ea.into_iter().zip(eb).map(|(x, y)| self.meet(x, y)).collect();
                self.tuple(&met)
            }
            Tag::Pointer | Tag::Reference | Tag::TypeOf => {
                let neg = self.join(self.negative_slot(a), self.negative_slot(b));
                let pos = self.meet(self.positive_slot(a), self.positive_slot(b));
                match ta {
                    Tag::Pointer => self.pointer(neg, pos),
                    Tag::Reference => self.reference(neg, pos),
                    _ => self.type_of(neg, pos),
                }
            }
            Tag::Function => {
                let pa = self.function_params(a);
                let pb = self.function_params(b);
                if pa.len() != pb.len() {
                    return Idx::FALSE;
                }
                // Join of parameters, meet of returns, intersection of
                // effects.
                let params: Vec<Idx> =
                    pa.into_iter().zip(pb).map(|(x, y)| self.join(x, y)).collect();
                let ret = self.meet(self.function_return(a), self.function_return(b));
                let effects = self.function_effects(a) & self.function_effects(b);
                self.function(&params, ret, effects)
            }
            Tag::Nominal => self.meet_nominal(a, b),
            _ => Idx::FALSE,
        }
    }

    fn meet_tuple_array(&mut self, tuple: Idx, array: Idx) -> Idx {
        let elem = self.array_elem(array);
        let met: Vec<Idx> = self
            .tuple_elems(tuple)
            .into_iter()
            .map(|e| self.meet(e, elem))
            .collect();
        self.tuple(&met)
    }

    fn meet_type_variable(&mut self, tv: Idx, other: Idx) -> Idx {
        if self.is_subtype(tv, other) {
            return tv;
        }
        if self.is_subtype(other, tv) {
            return other;
        }
        let bound = self.nominal(tv).neg_bound;
        self.meet(bound, other)
    }

    fn meet_nominal(&mut self, a: Idx, b: Idx) -> Idx {
        let (ka, kb) = (self.nominal(a).kind, self.nominal(b).kind);
        match (ka, kb) {
            (NominalKind::Class, NominalKind::Class) => {
                if self.nominal_subtype(a, b) {
                    a
                } else if self.nominal_subtype(b, a) {
                    b
                } else {
                    Idx::FALSE
                }
            }
            (NominalKind::Class, NominalKind::Interface) => {
                if self.nominal_subtype(a, b) {
                    a
                } else {
                    Idx::FALSE
                }
            }
            (NominalKind::Interface, NominalKind::Class) => {
                if self.nominal_subtype(b, a) {
                    b
                } else {
                    Idx::FALSE
                }
            }
            (NominalKind::Interface, NominalKind::Interface) => {
                if self.nominal_subtype(a, b) {
                    a
                } else if self.nominal_subtype(b, a) {
                    b
                } else {
                    Idx::FALSE
                }
            }
            // Distinct modules/enumerations share no values.
            _ => Idx::FALSE,
        }
    }

    /// Join/meet with a flow operand: a fresh placeholder absorbing both.
    fn merge_operands(&mut self, a: Idx, b: Idx) -> Idx {
        let polarity = if self.is_flow(a) {
            self.flow_polarity(self.flow_id(a))
        } else {
            self.flow_polarity(self.flow_id(b))
        };
        let result = self.new_flow(polarity);
        let rid = self.flow_id(result);
        for operand in [a, b] {
            if self.is_flow(operand) {
                let src = self.flow_id(operand);
                self.merge_flow(rid, src);
            } else {
                self.merge_child(rid, operand);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EffectSet, NominalInfo};
    use lyra_ir::Name;
    use pretty_assertions::assert_eq;

    fn class(pool: &mut Pool) -> Idx {
        pool.new_nominal(NominalInfo::new(NominalKind::Class, Name::EMPTY))
    }

    fn interface(pool: &mut Pool) -> Idx {
        pool.new_nominal(NominalInfo::new(NominalKind::Interface, Name::EMPTY))
    }

    #[test]
    fn subtype_reflexive_on_primitives() {
        let mut pool = Pool::new();
        for idx in [Idx::INT, Idx::FLOAT, Idx::ANY, Idx::FALSE, Idx::VOID] {
            assert!(pool.is_subtype(idx, idx));
        }
    }

    #[test]
    fn false_is_bottom_any_is_top() {
        let mut pool = Pool::new();
        assert!(pool.is_subtype(Idx::FALSE, Idx::INT));
        assert!(pool.is_subtype(Idx::INT, Idx::ANY));
        assert!(!pool.is_subtype(Idx::ANY, Idx::INT));
    }

    #[test]
    fn int_is_rational_is_comparable() {
        let mut pool = Pool::new();
        assert!(pool.is_subtype(Idx::INT, Idx::RATIONAL));
        assert!(pool.is_subtype(Idx::RATIONAL, Idx::COMPARABLE));
        assert!(pool.is_subtype(Idx::INT, Idx::COMPARABLE));
        assert!(!pool.is_subtype(Idx::RATIONAL, Idx::INT));
    }

    #[test]
    fn unknown_is_compatible_both_ways() {
        let mut pool = Pool::new();
        assert!(pool.is_subtype(Idx::UNKNOWN, Idx::INT));
        assert!(pool.is_subtype(Idx::INT, Idx::UNKNOWN));
    }

    #[test]
    fn arrays_are_covariant() {
        let mut pool = Pool::new();
        let a_int = pool.array(Idx::INT);
        let a_rat = pool.array(Idx::RATIONAL);
        assert!(pool.is_subtype(a_int, a_rat));
        assert!(!pool.is_subtype(a_rat, a_int));
    }

    #[test]
    fn tuple_subtypes_array() {
        let mut pool = Pool::new();
        let t = pool.tuple(&[Idx::INT, Idx::INT]);
        let arr = pool.array(Idx::RATIONAL);
        assert!(pool.is_subtype(t, arr));
    }

    #[test]
    fn function_params_are_contravariant() {
        let mut pool = Pool::new();
        let f_rat = pool.function(&[Idx::RATIONAL], Idx::INT, EffectSet::COMPUTES);
        let f_int = pool.function(&[Idx::INT], Idx::RATIONAL, EffectSet::COMPUTES);
        // (rational -> int) <: (int -> rational)
        assert!(pool.is_subtype(f_rat, f_int));
        assert!(!pool.is_subtype(f_int, f_rat));
    }

    #[test]
    fn function_effects_must_be_allowed_by_supertype() {
        let mut pool = Pool::new();
        let pure = pool.function(&[Idx::INT], Idx::INT, EffectSet::CONVERGES);
        let eff = pool.function(&[Idx::INT], Idx::INT, EffectSet::TRANSACTS);
        assert!(pool.is_subtype(pure, eff));
        assert!(!pool.is_subtype(eff, pure));
    }

    #[test]
    fn pointer_is_invariant_reference_polarized() {
        let mut pool = Pool::new();
        let p_int = pool.pointer(Idx::INT, Idx::INT);
        let p_rat = pool.pointer(Idx::RATIONAL, Idx::RATIONAL);
        // Covariance fails on the negative slot, contravariance on the
        // positive one.
        assert!(!pool.is_subtype(p_int, p_rat));
        assert!(!pool.is_subtype(p_rat, p_int));
        // Reading-end widening works.
        let p_wide = pool.pointer(Idx::INT, Idx::RATIONAL);
        assert!(pool.is_subtype(p_int, p_wide));
    }

    #[test]
    fn class_inherits_superclass_and_interfaces() {
        let mut pool = Pool::new();
        let base = class(&mut pool);
        let iface = interface(&mut pool);
        let derived = class(&mut pool);
        pool.nominal_mut(derived).superclass = Some(base);
        pool.nominal_mut(base).interfaces.push(iface);

        assert!(pool.is_subtype(derived, base));
        assert!(pool.is_subtype(derived, iface));
        assert!(pool.is_subtype(base, iface));
        assert!(!pool.is_subtype(base, derived));
    }

    #[test]
    fn inheritance_cycle_does_not_hang_subtyping() {
        let mut pool = Pool::new();
        let a = class(&mut pool);
        let b = class(&mut pool);
        pool.nominal_mut(a).superclass = Some(b);
        pool.nominal_mut(b).superclass = Some(a);
        // Both directions hold through the (invalid, separately reported)
        // cycle; the point is termination.
        assert!(pool.is_subtype(a, b));
        assert!(pool.is_subtype(b, a));
    }

    #[test]
    fn constrain_against_flow_adds_knowledge() {
        let mut pool = Pool::new();
        let (neg, pos) = pool.new_flow_pair();
        assert!(pool.constrain(Idx::INT, neg));
        // What flowed in is now visible on the positive side.
        assert_eq!(pool.normal(pos), Idx::INT);

        assert!(pool.constrain(Idx::FLOAT, neg));
        // int joined with float widens to comparable.
        assert_eq!(pool.normal(pos), Idx::COMPARABLE);
    }

    #[test]
    fn constrain_failure_reports_false() {
        let mut pool = Pool::new();
        let f = pool.function(&[Idx::INT], Idx::INT, EffectSet::CONVERGES);
        assert!(!pool.constrain(Idx::INT, f));
        assert!(!pool.constrain(f, Idx::INT));
    }

    #[test]
    fn constrain_is_monotone() {
        let mut pool = Pool::new();
        let arr = pool.array(Idx::INT);
        let arr_sup = pool.array(Idx::RATIONAL);
        assert!(pool.constrain(arr, arr_sup));
        assert!(pool.is_subtype(arr, arr_sup));
        // Unrelated later constraints don't retract it.
        let (neg, _pos) = pool.new_flow_pair();
        assert!(pool.constrain(Idx::STRING, neg));
        assert!(pool.is_subtype(arr, arr_sup));
    }

    #[test]
    fn join_picks_least_upper_bounds() {
        let mut pool = Pool::new();
        assert_eq!(pool.join(Idx::INT, Idx::RATIONAL), Idx::RATIONAL);
        assert_eq!(pool.join(Idx::INT, Idx::FLOAT), Idx::COMPARABLE);
        assert_eq!(pool.join(Idx::FALSE, Idx::INT), Idx::INT);
        assert_eq!(pool.join(Idx::INT, Idx::ANY), Idx::ANY);

        let a1 = pool.array(Idx::INT);
        let a2 = pool.array(Idx::FLOAT);
        let joined = pool.join(a1, a2);
        assert_eq!(pool.array_elem(joined), Idx::COMPARABLE);
    }

    #[test]
    fn join_of_sibling_classes_is_common_ancestor() {
        let mut pool = Pool::new();
        let base = class(&mut pool);
        let left = class(&mut pool);
        let right = class(&mut pool);
        pool.nominal_mut(left).superclass = Some(base);
        pool.nominal_mut(right).superclass = Some(base);
        assert_eq!(pool.join(left, right), base);
    }

    #[test]
    fn meet_picks_greatest_lower_bounds() {
        let mut pool = Pool::new();
        assert_eq!(pool.meet(Idx::INT, Idx::RATIONAL), Idx::INT);
        assert_eq!(pool.meet(Idx::INT, Idx::FLOAT), Idx::FALSE);
        assert_eq!(pool.meet(Idx::COMPARABLE, Idx::STRING), Idx::STRING);

        let base = class(&mut pool);
        let derived = class(&mut pool);
        pool.nominal_mut(derived).superclass = Some(base);
        assert_eq!(pool.meet(base, derived), derived);
    }

    #[test]
    fn matches_is_domain_comparison() {
        let mut pool = Pool::new();
        assert!(pool.matches(Idx::INT, Idx::INT));
        assert!(pool.matches(Idx::INT, Idx::RATIONAL));
        assert!(!pool.matches(Idx::STRING, Idx::INT));
        assert!(pool.matches(Idx::UNKNOWN, Idx::INT));
    }

    #[test]
    fn equivalence_is_mutual_subsumption() {
        let mut pool = Pool::new();
        let t1 = pool.tuple(&[Idx::INT, Idx::STRING]);
        let t2 = pool.tuple(&[Idx::INT, Idx::STRING]);
        assert!(pool.is_equivalent(t1, t2));
        assert!(pool.is_equivalent(Idx::VOID, Idx::TRUE));
        assert!(!pool.is_equivalent(Idx::INT, Idx::RATIONAL));
    }
}
