//! Matching atom patterns against ground facts

use crate::constant::Constant;
use crate::subst::{Subst, SubstMap};
use crate::term::{Atom, BaseTerm};

/// Match a single pattern term against a ground constant, extending `subst`
///
/// Variables bound in `subst` must agree with the constant; free variables are
/// bound to it. Function applications never match (they are reduced before
/// matching by the evaluator).
pub fn match_term(pattern: &BaseTerm, value: &Constant, subst: &mut SubstMap) -> bool {
    match pattern {
        BaseTerm::Const(c) => c == value,
        BaseTerm::Var(v) => match subst.get(v) {
            Some(BaseTerm::Const(bound)) => bound == value,
            Some(_) => false,
            None => {
                subst.bind(v.clone(), BaseTerm::Const(value.clone()));
                true
            }
        },
        BaseTerm::Apply(_) => false,
    }
}

/// Match a pattern atom against a ground fact, extending `base`
///
/// Returns the extended substitution on success. The fact must be ground;
/// mismatching predicate symbols never match.
pub fn match_atom(pattern: &Atom, fact: &Atom, base: &SubstMap) -> Option<SubstMap> {
    if pattern.sym != fact.sym {
        return None;
    }
    let mut subst = base.clone();
    for (p, f) in pattern.args.iter().zip(fact.args.iter()) {
        let value = f.as_constant()?;
        if !match_term(p, value, &mut subst) {
            return None;
        }
    }
    Some(subst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Variable;

    fn c(n: &str) -> BaseTerm {
        BaseTerm::Const(Constant::name(n).unwrap())
    }

    #[test]
    fn test_match_binds_free_vars() {
        let pattern = Atom::new("edge", vec![BaseTerm::var("X"), BaseTerm::var("Y")]);
        let fact = Atom::new("edge", vec![c("/a"), c("/b")]);
        let subst = match_atom(&pattern, &fact, &SubstMap::new()).unwrap();
        assert_eq!(
            subst.get_constant(&Variable::new("X")),
            Some(&Constant::name("/a").unwrap())
        );
        assert_eq!(
            subst.get_constant(&Variable::new("Y")),
            Some(&Constant::name("/b").unwrap())
        );
    }

    #[test]
    fn test_match_respects_existing_bindings() {
        let pattern = Atom::new("edge", vec![BaseTerm::var("X"), BaseTerm::var("X")]);
        let same = Atom::new("edge", vec![c("/a"), c("/a")]);
        let differs = Atom::new("edge", vec![c("/a"), c("/b")]);
        assert!(match_atom(&pattern, &same, &SubstMap::new()).is_some());
        assert!(match_atom(&pattern, &differs, &SubstMap::new()).is_none());
    }

    #[test]
    fn test_match_constant_mismatch() {
        let pattern = Atom::new("edge", vec![c("/a"), BaseTerm::var("Y")]);
        let fact = Atom::new("edge", vec![c("/b"), c("/c")]);
        assert!(match_atom(&pattern, &fact, &SubstMap::new()).is_none());
    }

    #[test]
    fn test_match_arity_mismatch() {
        let pattern = Atom::new("edge", vec![BaseTerm::var("X")]);
        let fact = Atom::new("edge", vec![c("/a"), c("/b")]);
        assert!(match_atom(&pattern, &fact, &SubstMap::new()).is_none());
    }
}
