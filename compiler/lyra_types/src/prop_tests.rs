//! Property tests for the lattice laws.
//!
//! Strategies generate a type *recipe* (a plain tree) which is then
//! materialized into a fresh pool per case, since the pool itself is not
//! cloneable across proptest shrinking.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;

use crate::{EffectSet, Idx, Pool};

#[derive(Debug, Clone)]
enum Recipe {
    Prim(usize),
    Array(Box<Recipe>),
    Option(Box<Recipe>),
    Tuple(Vec<Recipe>),
    Function(Vec<Recipe>, Box<Recipe>, u8),
}

/// `void` and `true` are deliberately absent: their positional
/// equivalences are polarity-dependent and not laws of the value lattice.
const PRIMS: [Idx; 9] = [
    Idx::FALSE,
    Idx::ANY,
    Idx::COMPARABLE,
    Idx::LOGIC,
    Idx::INT,
    Idx::RATIONAL,
    Idx::FLOAT,
    Idx::CHAR,
    Idx::STRING,
];

fn recipe() -> impl Strategy<Value = Recipe> {
    let leaf = (0..PRIMS.len()).prop_map(Recipe::Prim);
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|r| Recipe::Array(Box::new(r))),
            inner.clone().prop_map(|r| Recipe::Option(Box::new(r))),
            prop::collection::vec(inner.clone(), 2..4).prop_map(Recipe::Tuple),
            (
                prop::collection::vec(inner.clone(), 0..3),
                inner,
                0u8..=0xFF,
            )
                .prop_map(|(params, ret, eff)| Recipe::Function(
                    params,
                    Box::new(ret),
                    eff
                )),
        ]
    })
}

fn build(pool: &mut Pool, recipe: &Recipe) -> Idx {
    match recipe {
        Recipe::Prim(i) => PRIMS[*i],
        Recipe::Array(elem) => {
            let e = build(pool, elem);
            pool.array(e)
        }
        Recipe::Option(inner) => {
            let i = build(pool, inner);
            pool.option(i)
        }
        Recipe::Tuple(elems) => {
            let built: Vec<Idx> = elems.iter().map(|e| build(pool, e)).collect();
            pool.tuple(&built)
        }
        Recipe::Function(params, ret, eff) => {
            let built: Vec<Idx> = params.iter().map(|p| build(pool, p)).collect();
            let r = build(pool, ret);
            pool.function(&built, r, EffectSet::from_bits_truncate(u16::from(*eff)))
        }
    }
}

proptest! {
    #[test]
    fn subtyping_is_reflexive(r in recipe()) {
        let mut pool = Pool::new();
        let t = build(&mut pool, &r);
        prop_assert!(pool.is_subtype(t, t));
    }

    #[test]
    fn subtyping_is_transitive(r1 in recipe(), r2 in recipe(), r3 in recipe()) {
        let mut pool = Pool::new();
        let a = build(&mut pool, &r1);
        let b = build(&mut pool, &r2);
        let c = build(&mut pool, &r3);
        if pool.is_subtype(a, b) && pool.is_subtype(b, c) {
            prop_assert!(pool.is_subtype(a, c));
        }
    }

    #[test]
    fn constrain_implies_subtype(r1 in recipe(), r2 in recipe()) {
        let mut pool = Pool::new();
        let a = build(&mut pool, &r1);
        let b = build(&mut pool, &r2);
        if pool.constrain(a, b) {
            prop_assert!(pool.is_subtype(a, b));
        }
    }

    #[test]
    fn constraints_are_never_retracted(r1 in recipe(), r2 in recipe(), r3 in recipe()) {
        let mut pool = Pool::new();
        let a = build(&mut pool, &r1);
        let b = build(&mut pool, &r2);
        if pool.constrain(a, b) {
            // Unrelated later traffic must not break an established fact.
            let c = build(&mut pool, &r3);
            let (neg, _pos) = pool.new_flow_pair();
            let _ = pool.constrain(c, neg);
            prop_assert!(pool.is_subtype(a, b));
        }
    }

    #[test]
    fn join_is_an_upper_bound(r1 in recipe(), r2 in recipe()) {
        let mut pool = Pool::new();
        let a = build(&mut pool, &r1);
        let b = build(&mut pool, &r2);
        let j = pool.join(a, b);
        prop_assert!(pool.is_subtype(a, j));
        prop_assert!(pool.is_subtype(b, j));
    }

    #[test]
    fn meet_is_a_lower_bound(r1 in recipe(), r2 in recipe()) {
        let mut pool = Pool::new();
        let a = build(&mut pool, &r1);
        let b = build(&mut pool, &r2);
        let m = pool.meet(a, b);
        prop_assert!(pool.is_subtype(m, a));
        prop_assert!(pool.is_subtype(m, b));
    }

    #[test]
    fn join_and_meet_are_commutative(r1 in recipe(), r2 in recipe()) {
        let mut pool = Pool::new();
        let a = build(&mut pool, &r1);
        let b = build(&mut pool, &r2);
        let jab = pool.join(a, b);
        let jba = pool.join(b, a);
        prop_assert!(pool.is_equivalent(jab, jba));
        let mab = pool.meet(a, b);
        let mba = pool.meet(b, a);
        prop_assert!(pool.is_equivalent(mab, mba));
    }

    #[test]
    fn flow_roundtrip_preserves_constrained_type(r in recipe()) {
        let mut pool = Pool::new();
        let t = build(&mut pool, &r);
        let (neg, pos) = pool.new_flow_pair();
        prop_assert!(pool.constrain(t, neg));
        // Whatever flowed in must flow out no narrower.
        let out = pool.normal(pos);
        prop_assert!(pool.is_subtype(t, out));
    }
}
