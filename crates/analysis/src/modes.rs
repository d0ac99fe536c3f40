//! Mode checking
//!
//! Walks each clause body left to right, tracking the set of variables known
//! to be bound, and verifies that every goal satisfies at least one declared
//! mode of its callee.

use crate::{AnalysisError, AnalysisResult};
use mangle_model::{ArgMode, Atom, BaseTerm, Clause, Decl, Literal, PredicateSym, Variable};
use rustc_hash::{FxHashMap, FxHashSet};

fn term_vars(term: &BaseTerm) -> FxHashSet<Variable> {
    let mut out = FxHashSet::default();
    term.collect_variables(&mut out);
    out
}

fn evaluable(term: &BaseTerm, bound: &FxHashSet<Variable>) -> bool {
    term_vars(term).iter().all(|v| bound.contains(v))
}

fn goal_satisfies_mode(atom: &Atom, mode: &[ArgMode], bound: &FxHashSet<Variable>) -> bool {
    if mode.len() != atom.args.len() {
        return false;
    }
    atom.args.iter().zip(mode.iter()).all(|(arg, m)| match m {
        ArgMode::Input => evaluable(arg, bound),
        ArgMode::Output => matches!(arg, BaseTerm::Var(v) if !bound.contains(v)),
        ArgMode::InputOutput => true,
    })
}

fn check_goal(
    atom: &Atom,
    decls: &FxHashMap<PredicateSym, Decl>,
    bound: &FxHashSet<Variable>,
) -> AnalysisResult<()> {
    let Some(decl) = decls.get(&atom.sym) else {
        // Declarations were collected for every referenced predicate.
        return Err(AnalysisError::UnknownPredicate(format!("{:?}", atom.sym)));
    };
    if decl
        .modes
        .iter()
        .any(|mode| goal_satisfies_mode(atom, &mode.0, bound))
    {
        Ok(())
    } else {
        Err(AnalysisError::ModeViolation {
            predicate: format!("{:?}", atom.sym),
            goal: atom.to_string(),
        })
    }
}

/// Check every goal of a clause against the declared modes of its callee
pub fn check_clause(
    clause: &Clause,
    decls: &FxHashMap<PredicateSym, Decl>,
) -> AnalysisResult<()> {
    let mut bound: FxHashSet<Variable> = FxHashSet::default();
    for lit in &clause.body {
        match lit {
            Literal::Positive(atom) | Literal::PositiveAt(atom, _) => {
                check_goal(atom, decls, &bound)?;
                lit.collect_variables(&mut bound);
            }
            Literal::Temporal(t) => {
                check_goal(&t.atom, decls, &bound)?;
                t.atom.collect_variables(&mut bound);
            }
            Literal::Negative(atom) => {
                // Negation tests a ground atom and binds nothing; every
                // variable must be bound by the time the goal is reached.
                let mut vars = FxHashSet::default();
                atom.collect_variables(&mut vars);
                if vars.iter().any(|v| !bound.contains(v)) {
                    return Err(AnalysisError::ModeViolation {
                        predicate: format!("{:?}", atom.sym),
                        goal: lit.to_string(),
                    });
                }
                check_goal(atom, decls, &bound)?;
            }
            Literal::Eq(l, r) => {
                match (l, r) {
                    (BaseTerm::Var(v), other) if !bound.contains(v) && evaluable(other, &bound) => {
                        bound.insert(v.clone());
                    }
                    (other, BaseTerm::Var(v)) if !bound.contains(v) && evaluable(other, &bound) => {
                        bound.insert(v.clone());
                    }
                    (l, r) if evaluable(l, &bound) && evaluable(r, &bound) => {}
                    _ => {
                        return Err(AnalysisError::ModeViolation {
                            predicate: "=".to_string(),
                            goal: lit.to_string(),
                        })
                    }
                }
            }
            Literal::Ineq(l, r) => {
                if !(evaluable(l, &bound) && evaluable(r, &bound)) {
                    return Err(AnalysisError::ModeViolation {
                        predicate: "!=".to_string(),
                        goal: lit.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::Mode;

    fn decl_with_modes(name: &str, arity: usize, modes: Vec<Mode>) -> Decl {
        let args = (0..arity)
            .map(|i| BaseTerm::Var(Variable::new(format!("A{i}"))))
            .collect();
        Decl::new(Atom::new(name, args)).with_modes(modes)
    }

    fn decls_of(decls: Vec<Decl>) -> FxHashMap<PredicateSym, Decl> {
        decls.into_iter().map(|d| (d.sym().clone(), d)).collect()
    }

    #[test]
    fn test_all_wildcard_mode_always_passes() {
        let decls = decls_of(vec![decl_with_modes("p", 2, vec![Mode::any(2)])]);
        let clause = Clause::rule(
            Atom::new("q", vec![BaseTerm::var("X")]),
            vec![Literal::Positive(Atom::new(
                "p",
                vec![BaseTerm::var("X"), BaseTerm::var("Y")],
            ))],
        );
        // q undeclared here, but only goals are checked.
        assert!(check_clause(&clause, &decls).is_ok());
    }

    #[test]
    fn test_input_mode_requires_bound_variable() {
        let decls = decls_of(vec![
        decl_with_modes("lookup", 2, vec![Mode(vec![ArgMode::Input, ArgMode::Output])]),
            decl_with_modes("src", 1, vec![Mode::any(1)]),
        ]);
        // Bad: lookup called with free first argument.
        let bad = Clause::rule(
            Atom::new("out", vec![BaseTerm::var("V")]),
            vec![Literal::Positive(Atom::new(
                "lookup",
                vec![BaseTerm::var("K"), BaseTerm::var("V")],
            ))],
        );
        assert!(matches!(
            check_clause(&bad, &decls),
            Err(AnalysisError::ModeViolation { .. })
        ));

        // Good: src binds K first.
        let good = Clause::rule(
            Atom::new("out", vec![BaseTerm::var("V")]),
            vec![
                Literal::Positive(Atom::new("src", vec![BaseTerm::var("K")])),
                Literal::Positive(Atom::new(
                    "lookup",
                    vec![BaseTerm::var("K"), BaseTerm::var("V")],
                )),
            ],
        );
        assert!(check_clause(&good, &decls).is_ok());
    }

    #[test]
    fn test_unbound_equality_rejected() {
        let decls = decls_of(vec![]);
        let clause = Clause::rule(
            Atom::new("p", vec![BaseTerm::var("X")]),
            vec![Literal::Eq(BaseTerm::var("X"), BaseTerm::var("Y"))],
        );
        assert!(matches!(
            check_clause(&clause, &decls),
            Err(AnalysisError::ModeViolation { .. })
        ));
    }
}
