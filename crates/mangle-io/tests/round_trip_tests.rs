//! Round-trip property: reading the canonical printed form of any constant
//! yields an equal constant.

use mangle_io::{read_atom, read_constant, write_atom};
use mangle_model::{Atom, BaseTerm, Constant};
use proptest::prelude::*;

// Time instants stay within RFC 3339's four-digit years; durations avoid
// i64::MIN, whose magnitude is unrepresentable when read back.
const TIME_RANGE: std::ops::RangeInclusive<i64> =
    -1_000_000_000_000_000_000..=1_000_000_000_000_000_000;

fn leaf() -> impl Strategy<Value = Constant> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(Constant::string),
        "\\PC{0,8}".prop_map(Constant::string),
        any::<i64>().prop_map(Constant::number),
        any::<f64>()
            .prop_filter("NaN payloads do not survive printing", |f| !f.is_nan())
            .prop_map(Constant::float),
        TIME_RANGE.prop_map(Constant::time),
        ((i64::MIN + 1)..=i64::MAX).prop_map(Constant::duration),
        proptest::collection::vec(any::<u8>(), 0..12).prop_map(Constant::bytes),
        "[a-z0-9]{1,6}(/[a-z0-9]{1,6}){0,2}"
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

proptest! {
    #[test]
    fn constant_print_read_round_trip(c in constant()) {
        let text = c.to_string();
        let back = read_constant(&text)
            .unwrap_or_else(|e| panic!("reading {text:?} failed: {e}"));
        prop_assert_eq!(back, c);
    }

    #[test]
    fn atom_print_read_round_trip(
        args in proptest::collection::vec(constant(), 0..4),
    ) {
        let atom = Atom::new(
            "fact",
            args.into_iter().map(BaseTerm::Const).collect(),
        );
        let text = write_atom(&atom);
        let back = read_atom(&text)
            .unwrap_or_else(|e| panic!("reading {text:?} failed: {e}"));
        prop_assert_eq!(back, atom);
    }
}
