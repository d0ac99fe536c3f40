//! External predicate registry
//!
//! Callers can supply implementations for predicates whose facts live outside
//! the store. The engine invokes them with the current argument bindings; an
//! implementation returns fully-ground substitution rows for the goal's free
//! variables.

use crate::{EvalError, EvalResult};
use mangle_model::{match_term, Atom, BaseTerm, PredicateSym, SubstMap};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A user-provided predicate implementation
pub trait ExternalPredicate: Send + Sync {
    /// Produce one substitution per matching tuple for the partially bound
    /// goal. Every returned binding must be a constant.
    fn solve(&self, goal: &Atom) -> Result<Vec<SubstMap>, String>;
}

/// Registry of external predicates, one per predicate symbol
#[derive(Clone, Default)]
pub struct ExternalPredicates {
    map: FxHashMap<PredicateSym, Arc<dyn ExternalPredicate>>,
}

impl ExternalPredicates {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation for `sym`, replacing any previous one
    pub fn register(&mut self, sym: PredicateSym, imp: Arc<dyn ExternalPredicate>) {
        self.map.insert(sym, imp);
    }

    /// True if `sym` has an implementation
    pub fn contains(&self, sym: &PredicateSym) -> bool {
        self.map.contains_key(sym)
    }

    /// Solve a goal, extending `base` with each returned row
    ///
    /// Rows that contradict existing bindings are dropped; rows that leave
    /// the goal non-ground are an error in the implementation.
    pub(crate) fn solve(
        &self,
        goal: &Atom,
        base: &SubstMap,
    ) -> EvalResult<Option<Vec<SubstMap>>> {
        let Some(imp) = self.map.get(&goal.sym) else {
            return Ok(None);
        };
        let pattern = goal.apply_subst(base);
        let rows = imp.solve(&pattern).map_err(|message| EvalError::UserPredicate {
            predicate: format!("{:?}", goal.sym),
            message,
        })?;

        let mut out = Vec::with_capacity(rows.len());
        'rows: for row in rows {
            let mut merged = base.clone();
            for (var, term) in row.iter() {
                let BaseTerm::Const(value) = term else {
                    return Err(EvalError::UserPredicate {
                        predicate: format!("{:?}", goal.sym),
                        message: format!("non-constant binding for {var}"),
                    });
                };
                if !match_term(&BaseTerm::Var(var.clone()), value, &mut merged) {
                    continue 'rows;
                }
            }
            if !pattern.apply_subst(&merged).is_ground() {
                return Err(EvalError::UserPredicate {
                    predicate: format!("{:?}", goal.sym),
                    message: "solution leaves the goal non-ground".to_string(),
                });
            }
            out.push(merged);
        }
        Ok(Some(out))
    }
}

impl std::fmt::Debug for ExternalPredicates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalPredicates")
            .field("predicates", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::{Constant, Variable};

    struct Range(i64);

    impl ExternalPredicate for Range {
        fn solve(&self, goal: &Atom) -> Result<Vec<SubstMap>, String> {
            let Some(BaseTerm::Var(v)) = goal.args.first() else {
                return Ok(vec![]);
            };
            Ok((0..self.0)
                .map(|n| {
                    let mut s = SubstMap::new();
                    s.bind(v.clone(), BaseTerm::Const(Constant::number(n)));
                    s
                })
                .collect())
        }
    }

    #[test]
    fn test_solve_extends_bindings() {
        let mut externals = ExternalPredicates::new();
        let sym = PredicateSym::new("range", 1);
        externals.register(sym.clone(), Arc::new(Range(3)));

        let goal = Atom::new("range", vec![BaseTerm::var("N")]);
        let rows = externals.solve(&goal, &SubstMap::new()).unwrap().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].get_constant(&Variable::new("N")),
            Some(&Constant::number(0))
        );
    }

    #[test]
    fn test_unregistered_returns_none() {
        let externals = ExternalPredicates::new();
        let goal = Atom::new("range", vec![BaseTerm::var("N")]);
        assert!(externals.solve(&goal, &SubstMap::new()).unwrap().is_none());
    }
}
