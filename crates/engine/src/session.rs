//! Interactive sessions: load, query, checkpoint, pop
//!
//! A session accumulates program units. Each loaded unit evaluates into its
//! own overlay layer of a teeing store, so `pop` undoes exactly the last
//! unit: its clauses, and every fact whose derivation first became possible
//! with it.

use crate::{eval_program, query_program, EvalOptions, EvalResult, EvalStats, ExternalPredicates};
use analysis::{analyze, AnalyzerOptions, ProgramInfo, Unit};
use factstore::{IndexedInMemoryStore, TeeingStore};
use mangle_model::{Atom, PredicateSym};
use tracing::debug;

/// An interactive evaluation session
pub struct Session {
    store: TeeingStore,
    units: Vec<Unit>,
    info: ProgramInfo,
    externals: ExternalPredicates,
    analyzer_options: AnalyzerOptions,
    eval_options: EvalOptions,
}

impl Session {
    /// Empty session with default options
    pub fn new() -> Self {
        Self::with_options(AnalyzerOptions::default(), EvalOptions::default())
    }

    /// Session with explicit analyzer and evaluator options
    pub fn with_options(analyzer_options: AnalyzerOptions, eval_options: EvalOptions) -> Self {
        Self {
            store: TeeingStore::new(IndexedInMemoryStore::new()),
            units: Vec::new(),
            info: ProgramInfo::default(),
            externals: ExternalPredicates::new(),
            analyzer_options,
            eval_options,
        }
    }

    /// Register an external predicate implementation
    pub fn register_external(
        &mut self,
        sym: PredicateSym,
        imp: std::sync::Arc<dyn crate::ExternalPredicate>,
    ) {
        self.externals.register(sym, imp);
    }

    /// Load a unit: analyze the accumulated program and evaluate it into a
    /// fresh overlay layer
    ///
    /// On failure the session state is unchanged.
    pub fn load(&mut self, unit: Unit) -> EvalResult<EvalStats> {
        self.units.push(unit);
        let info = match analyze(&self.units, &self.analyzer_options) {
            Ok(info) => info,
            Err(err) => {
                self.units.pop();
                return Err(err.into());
            }
        };
        self.store.push_layer();
        match eval_program(&info, &mut self.store, &self.externals, &self.eval_options) {
            Ok(stats) => {
                debug!(derived = stats.derived, "unit loaded");
                self.info = info;
                Ok(stats)
            }
            Err(err) => {
                self.store.pop_layer();
                self.units.pop();
                Err(err)
            }
        }
    }

    /// Undo the most recently loaded unit; true if something was popped
    pub fn pop(&mut self) -> EvalResult<bool> {
        if self.store.pop_layer().is_none() {
            return Ok(false);
        }
        self.units.pop();
        self.info = analyze(&self.units, &self.analyzer_options)?;
        Ok(true)
    }

    /// Query a predicate; results are canonically ordered
    pub fn query(&self, pattern: &Atom) -> Vec<Atom> {
        query_program(&self.info, &self.store, pattern)
    }

    /// Signature and doc line for a predicate, if declared
    pub fn signature(&self, sym: &PredicateSym) -> Option<String> {
        self.info.signature(sym)
    }

    /// The analyzed program of the current session state
    pub fn info(&self) -> &ProgramInfo {
        &self.info
    }

    /// Number of facts currently visible
    pub fn fact_count(&self) -> usize {
        use factstore::ReadOnlyFactStore;
        self.store.fact_count()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::{BaseTerm, Clause, Constant, Literal};

    fn name(n: &str) -> BaseTerm {
        BaseTerm::Const(Constant::name(n).unwrap())
    }

    #[test]
    fn test_load_query_pop() {
        let mut session = Session::new();
        session
            .load(Unit {
                decls: vec![],
                clauses: vec![
                    Clause::fact(Atom::new("edge", vec![name("/a"), name("/b")])),
                    Clause::rule(
                        Atom::new("reach", vec![BaseTerm::var("X"), BaseTerm::var("Y")]),
                        vec![Literal::Positive(Atom::new(
                            "edge",
                            vec![BaseTerm::var("X"), BaseTerm::var("Y")],
                        ))],
                    ),
                ],
            })
            .unwrap();
        assert_eq!(
            session
                .query(&Atom::new("reach", vec![name("/a"), BaseTerm::var("Y")]))
                .len(),
            1
        );

        // A second unit extends the graph; popping restores the old state.
        session
            .load(Unit {
                decls: vec![],
                clauses: vec![Clause::fact(Atom::new("edge", vec![name("/b"), name("/c")]))],
            })
            .unwrap();
        assert_eq!(
            session
                .query(&Atom::new("reach", vec![BaseTerm::var("X"), BaseTerm::var("Y")]))
                .len(),
            2
        );

        assert!(session.pop().unwrap());
        assert_eq!(
            session
                .query(&Atom::new("reach", vec![BaseTerm::var("X"), BaseTerm::var("Y")]))
                .len(),
            1
        );
        assert!(session.pop().unwrap());
        assert!(!session.pop().unwrap());
    }

    #[test]
    fn test_failed_load_leaves_state_unchanged() {
        let mut session = Session::new();
        session
            .load(Unit {
                decls: vec![],
                clauses: vec![Clause::fact(Atom::new("p", vec![name("/a")]))],
            })
            .unwrap();

        // p(X) :- !q(X). q(X) :- !p(X). is not stratifiable.
        let bad = Unit {
            decls: vec![],
            clauses: vec![
                Clause::rule(
                    Atom::new("r", vec![BaseTerm::var("X")]),
                    vec![
                        Literal::Positive(Atom::new("p", vec![BaseTerm::var("X")])),
                        Literal::Negative(Atom::new("s", vec![BaseTerm::var("X")])),
                    ],
                ),
                Clause::rule(
                    Atom::new("s", vec![BaseTerm::var("X")]),
                    vec![
                        Literal::Positive(Atom::new("p", vec![BaseTerm::var("X")])),
                        Literal::Negative(Atom::new("r", vec![BaseTerm::var("X")])),
                    ],
                ),
            ],
        };
        assert!(session.load(bad).is_err());
        assert_eq!(session.fact_count(), 1);
        assert_eq!(
            session
                .query(&Atom::new("p", vec![BaseTerm::var("X")]))
                .len(),
            1
        );
    }
}
