//! Generalization and instantiation of function types.
//!
//! After a function body has been inferred, flow placeholders that stayed
//! unconstrained become generalized type variables ([`Pool::generalize`]);
//! each later use of the function replaces those variables with a fresh
//! flow pair ([`Pool::instantiate`]) so call sites constrain independent
//! copies.

use rustc_hash::FxHashMap;

use crate::{FlowId, Idx, NominalId, NominalInfo, NominalKind, Polarity, Pool, Tag};

impl Pool {
    /// Replace unresolved flow placeholders in `ty` with generalized type
    /// variables.
    ///
    /// A flow whose accumulated child is still its starting bound becomes
    /// a variable; a resolved flow is replaced by its (generalized) child.
    /// Mutually-edged placeholder pairs map to one shared variable. Returns
    /// the generalized type and the variables created, or `None` if the
    /// type is self-referential (a flow reachable from its own child).
    pub fn generalize(&mut self, ty: Idx) -> Option<(Idx, Vec<Idx>)> {
        let mut gen = Generalizer {
            vars: FxHashMap::default(),
            created: Vec::new(),
            in_progress: Vec::new(),
        };
        let out = self.generalize_inner(ty, &mut gen)?;
        Some((out, gen.created))
    }

    fn generalize_inner(&mut self, ty: Idx, gen: &mut Generalizer) -> Option<Idx> {
        if self.is_flow(ty) {
            let id = self.flow_id(ty);
            if let Some(&var) = gen.vars.get(&id) {
                return Some(var);
            }
            if gen.in_progress.contains(&id) {
                return None;
            }
            let child = self.flow_child(id);
            let trivial = match self.flow_polarity(id) {
                Polarity::Positive => child == Idx::FALSE,
                Polarity::Negative => child == Idx::ANY,
            };
            if trivial {
                let mut info = NominalInfo::new(NominalKind::TypeVariable, lyra_ir::Name::EMPTY);
                info.generalized = true;
                let var = self.new_nominal(info);
                gen.vars.insert(id, var);
                // Edged partners stand for the same unknown.
                for edge in self.flow_edges(id).to_vec() {
                    gen.vars.insert(edge, var);
                }
                gen.created.push(var);
                return Some(var);
            }
            gen.in_progress.push(id);
            let out = self.generalize_inner(child, gen);
            gen.in_progress.pop();
            return out;
        }
        self.rebuild(ty, &mut |pool, child, _polarity| {
            pool.generalize_inner(child, gen)
        })
    }

    /// Replace each generalized variable in `vars` with a fresh flow pair
    /// and rebuild `ty` around them.
    ///
    /// Negative occurrences get the negative placeholder, positive ones
    /// the positive placeholder of the same pair.
    pub fn instantiate(&mut self, ty: Idx, vars: &[Idx]) -> Idx {
        if vars.is_empty() {
            return ty;
        }
        let mut map: FxHashMap<NominalId, (Idx, Idx)> = FxHashMap::default();
        for &var in vars {
            debug_assert_eq!(self.nominal(var).kind, NominalKind::TypeVariable);
            let pair = self.new_flow_pair();
            map.insert(self.nominal_id(var), pair);
        }
        self.substitute(ty, &map, Polarity::Positive)
    }

    fn substitute(
        &mut self,
        ty: Idx,
        map: &FxHashMap<NominalId, (Idx, Idx)>,
        polarity: Polarity,
    ) -> Idx {
        if self.tag(ty) == Tag::Nominal && self.nominal(ty).kind == NominalKind::TypeVariable {
            if let Some(&(neg, pos)) = map.get(&self.nominal_id(ty)) {
                return match polarity {
                    Polarity::Negative => neg,
                    Polarity::Positive => pos,
                };
            }
            return ty;
        }
        // Flows inside an instantiated type stay shared.
        if self.is_flow(ty) {
            return ty;
        }
        self.rebuild(ty, &mut |pool, child, child_polarity| {
            Some(pool.substitute(child, map, child_polarity))
        })
        .unwrap_or(ty)
    }

    /// Rebuild one level of structure, mapping each child through `f` at
    /// its polarity relative to this type at positive polarity.
    fn rebuild(
        &mut self,
        ty: Idx,
        f: &mut dyn FnMut(&mut Pool, Idx, Polarity) -> Option<Idx>,
    ) -> Option<Idx> {
        match self.tag(ty) {
            Tag::Array => {
                let elem = self.array_elem(ty);
                let e = f(self, elem, Polarity::Positive)?;
                Some(self.array(e))
            }
            Tag::Option => {
                let inner = self.option_inner(ty);
                let i = f(self, inner, Polarity::Positive)?;
                Some(self.option(i))
            }
            Tag::Map => {
                let (key, value) = (self.map_key(ty), self.map_value(ty));
                let k = f(self, key, Polarity::Positive)?;
                let v = f(self, value, Polarity::Positive)?;
                Some(self.map(k, v))
            }
            Tag::Pointer | Tag::Reference | Tag::TypeOf => {
                let tag = self.tag(ty);
                let (neg_in, pos_in) = (self.negative_slot(ty), self.positive_slot(ty));
                let neg = f(self, neg_in, Polarity::Negative)?;
                let pos = f(self, pos_in, Polarity::Positive)?;
                Some(match tag {
                    Tag::Pointer => self.pointer(neg, pos),
                    Tag::Reference => self.reference(neg, pos),
                    _ => self.type_of(neg, pos),
                })
            }
            Tag::Tuple => {
                let children = self.tuple_elems(ty);
                let mut elems = Vec::with_capacity(children.len());
                for e in children {
                    elems.push(f(self, e, Polarity::Positive)?);
                }
                Some(self.tuple(&elems))
            }
            Tag::Function => {
                let children = self.function_params(ty);
                let ret_in = self.function_return(ty);
                let effects = self.function_effects(ty);
                let mut params = Vec::with_capacity(children.len());
                for p in children {
                    params.push(f(self, p, Polarity::Negative)?);
                }
                let ret = f(self, ret_in, Polarity::Positive)?;
                Some(self.function(&params, ret, effects))
            }
            // Primitives and nominals have no structural children.
            _ => Some(ty),
        }
    }
}

/// Scratch state for one generalization walk.
struct Generalizer {
    vars: FxHashMap<FlowId, Idx>,
    created: Vec<Idx>,
    in_progress: Vec<FlowId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EffectSet;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_function_generalizes_to_one_variable() {
        let mut pool = Pool::new();
        let (neg, pos) = pool.new_flow_pair();
        let f = pool.function(&[neg], pos, EffectSet::COMPUTES);

        let (gen, vars) = pool.generalize(f).unwrap_or((Idx::UNKNOWN, Vec::new()));
        assert_eq!(vars.len(), 1);
        let var = vars[0];
        assert_eq!(pool.function_params(gen), vec![var]);
        assert_eq!(pool.function_return(gen), var);
        assert!(pool.nominal(var).generalized);
    }

    #[test]
    fn resolved_flows_generalize_to_their_child() {
        let mut pool = Pool::new();
        let flow = pool.new_flow(Polarity::Positive);
        assert!(pool.constrain(Idx::INT, flow));
        let f = pool.function(&[], flow, EffectSet::COMPUTES);

        let (gen, vars) = pool.generalize(f).unwrap_or((Idx::UNKNOWN, Vec::new()));
        assert!(vars.is_empty());
        assert_eq!(pool.function_return(gen), Idx::INT);
    }

    #[test]
    fn self_referential_type_is_rejected() {
        let mut pool = Pool::new();
        let flow = pool.new_flow(Polarity::Positive);
        let id = pool.flow_id(flow);
        let arr = pool.array(flow);
        pool.set_flow_child(id, arr);
        assert_eq!(pool.generalize(flow), None);
    }

    #[test]
    fn instantiation_yields_independent_copies() {
        let mut pool = Pool::new();
        let (neg, pos) = pool.new_flow_pair();
        let f = pool.function(&[neg], pos, EffectSet::COMPUTES);
        let (gen, vars) = pool.generalize(f).unwrap_or((Idx::UNKNOWN, Vec::new()));

        let use1 = pool.instantiate(gen, &vars);
        let use2 = pool.instantiate(gen, &vars);
        assert_ne!(use1, use2);

        // Constraining one instance leaves the other untouched.
        let p1 = pool.function_params(use1)[0];
        let r1 = pool.function_return(use1);
        assert!(pool.constrain(Idx::INT, p1));
        assert_eq!(pool.normal(r1), Idx::INT);

        let r2 = pool.function_return(use2);
        assert_eq!(pool.normal(r2), Idx::FALSE);
    }

    #[test]
    fn instantiated_param_and_return_share_the_pair() {
        let mut pool = Pool::new();
        let (neg, pos) = pool.new_flow_pair();
        let f = pool.function(&[neg], pos, EffectSet::COMPUTES);
        let (gen, vars) = pool.generalize(f).unwrap_or((Idx::UNKNOWN, Vec::new()));

        let inst = pool.instantiate(gen, &vars);
        let param = pool.function_params(inst)[0];
        let ret = pool.function_return(inst);
        assert!(pool.is_flow(param));
        assert!(pool.is_flow(ret));
        assert_eq!(pool.flow_polarity(pool.flow_id(param)), Polarity::Negative);
        assert_eq!(pool.flow_polarity(pool.flow_id(ret)), Polarity::Positive);
    }
}
