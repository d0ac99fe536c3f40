//! Property tests for the term algebra: canonical ordering, hashing,
//! substitution idempotence.

use mangle_model::{Atom, BaseTerm, Constant, FnApply, Subst, SubstMap, Variable};
use proptest::prelude::*;
use std::collections::HashSet;

fn leaf() -> impl Strategy<Value = Constant> {
    prop_oneof![
        "[a-z]{0,8}".prop_map(Constant::string),
        any::<i64>().prop_map(Constant::number),
        any::<f64>().prop_map(Constant::float),
        any::<i64>().prop_map(Constant::time),
        any::<i64>().prop_map(Constant::duration),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(Constant::bytes),
        "[a-z]{1,5}(/[a-z]{1,5}){0,2}"
            .prop_map(|s| Constant::name(format!("/{s}")).expect("generated name is valid")),
    ]
}

fn constant() -> impl Strategy<Value = Constant> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Constant::pair(a, b)),
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Constant::list),
            proptest::collection::vec((inner.clone(), inner.clone()), 0..4)
                .prop_map(Constant::map),
            proptest::collection::vec((inner.clone(), inner), 0..4).prop_map(Constant::struct_),
        ]
    })
}

fn dedup_keys(entries: Vec<(Constant, Constant)>) -> Vec<(Constant, Constant)> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|(k, _)| seen.insert(k.clone()))
        .collect()
}

proptest! {
    #[test]
    fn equal_constants_have_equal_hashes(c in constant()) {
        let copy = c.clone();
        prop_assert_eq!(c.hash_value(), copy.hash_value());
        prop_assert_eq!(c, copy);
    }

    #[test]
    fn map_construction_is_order_independent(
        entries in proptest::collection::vec((leaf(), leaf()), 0..6),
    ) {
        let entries = dedup_keys(entries);
        let mut reversed = entries.clone();
        reversed.reverse();
        let m1 = Constant::map(entries.clone());
        let m2 = Constant::map(reversed.clone());
        prop_assert_eq!(&m1, &m2);
        prop_assert_eq!(m1.hash_value(), m2.hash_value());

        let s1 = Constant::struct_(entries);
        let s2 = Constant::struct_(reversed);
        prop_assert_eq!(&s1, &s2);
        prop_assert_ne!(&s1, &m1);
    }

    #[test]
    fn map_lookup_finds_every_key(
        entries in proptest::collection::vec((leaf(), leaf()), 0..6),
    ) {
        let entries = dedup_keys(entries);
        let m = Constant::map(entries.clone());
        for (k, v) in &entries {
            prop_assert_eq!(m.get_entry(k), Some(v));
        }
    }

    #[test]
    fn substitution_is_idempotent(
        bindings in proptest::collection::vec(("[A-Z]", leaf()), 0..5),
        free in proptest::collection::vec("[A-Z]", 0..3),
    ) {
        let mut subst = SubstMap::new();
        for (name, value) in bindings {
            subst.bind(Variable::new(name), BaseTerm::Const(value));
        }
        let mut args: Vec<BaseTerm> = subst
            .iter()
            .map(|(v, _)| BaseTerm::Var(v.clone()))
            .collect();
        for name in free {
            args.push(BaseTerm::var(name));
        }
        args.push(BaseTerm::Apply(FnApply::new("fn:list", args.clone())));
        let atom = Atom::new("p", args);

        let once = atom.apply_subst(&subst);
        let twice = once.apply_subst(&subst);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn canonical_order_is_total_and_consistent(a in constant(), b in constant()) {
        use std::cmp::Ordering;
        match a.cmp(&b) {
            Ordering::Equal => {
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(a.hash_value(), b.hash_value());
            }
            Ordering::Less => prop_assert_eq!(b.cmp(&a), Ordering::Greater),
            Ordering::Greater => prop_assert_eq!(b.cmp(&a), Ordering::Less),
        }
    }
}

#[test]
fn substitution_trait_objects_work() {
    let mut subst = SubstMap::new();
    subst.bind(Variable::new("X"), BaseTerm::Const(Constant::number(1)));
    let dyn_subst: &dyn Subst = &subst;
    let term = BaseTerm::var("X");
    assert_eq!(
        term.apply_subst(dyn_subst),
        BaseTerm::Const(Constant::number(1))
    );
}
