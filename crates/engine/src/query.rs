//! Query helpers over an evaluated store
//!
//! Results are returned in canonical order so query output never depends on
//! store iteration order.

use analysis::ProgramInfo;
use factstore::ReadOnlyFactStore;
use mangle_model::{match_atom, Atom, BaseTerm, SubstMap};

/// All facts matching the pattern, canonically ordered
pub fn query<S: ReadOnlyFactStore + ?Sized>(store: &S, pattern: &Atom) -> Vec<Atom> {
    let mut out = Vec::new();
    store.get_facts(pattern, &mut |fact| {
        if match_atom(pattern, fact, &SubstMap::new()).is_some() {
            out.push(fact.clone());
        }
        true
    });
    out.sort();
    out.dedup();
    out
}

/// Query a predicate of the analyzed program
///
/// Temporal predicates are queried at their declared arity: the lowered
/// interval arguments are matched with wildcards and stripped from the
/// results.
pub fn query_program<S: ReadOnlyFactStore + ?Sized>(
    info: &ProgramInfo,
    store: &S,
    pattern: &Atom,
) -> Vec<Atom> {
    if !info.is_temporal(&pattern.sym) {
        return query(store, pattern);
    }
    let mut args: Vec<BaseTerm> = pattern.args.to_vec();
    args.push(BaseTerm::var("__start"));
    args.push(BaseTerm::var("__end"));
    let lowered = Atom::from_sym(info.lowered_sym(&pattern.sym), args);

    let split = pattern.args.len();
    let mut out: Vec<Atom> = query(store, &lowered)
        .into_iter()
        .map(|fact| {
            Atom::from_sym(
                pattern.sym.clone(),
                fact.args[..split].to_vec(),
            )
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use factstore::{FactStore, SimpleInMemoryStore};
    use mangle_model::Constant;

    fn name(n: &str) -> BaseTerm {
        BaseTerm::Const(Constant::name(n).unwrap())
    }

    #[test]
    fn test_query_is_sorted() {
        let mut store = SimpleInMemoryStore::new();
        store
            .add(Atom::new("p", vec![name("/c")]))
            .unwrap();
        store
            .add(Atom::new("p", vec![name("/a")]))
            .unwrap();
        store
            .add(Atom::new("p", vec![name("/b")]))
            .unwrap();

        let results = query(&store, &Atom::new("p", vec![BaseTerm::var("X")]));
        assert_eq!(
            results,
            vec![
                Atom::new("p", vec![name("/a")]),
                Atom::new("p", vec![name("/b")]),
                Atom::new("p", vec![name("/c")]),
            ]
        );
    }
}
