//! Program analysis
//!
//! Binds parsed units into an evaluable program:
//! 1. collect declarations, synthesising one for every referenced predicate
//!    that lacks one
//! 2. desugar declaration bounds naming unary predicates into
//!    inclusion-constraint alternatives
//! 3. eliminate wildcards and check range restriction
//! 4. check that every goal satisfies one declared mode of its callee
//! 5. lower temporal predicates to interval-extended form
//! 6. build the dependency graph, compute strongly connected components and
//!    assign each predicate a stratum
//!
//! The result is a `ProgramInfo` the fixpoint engine evaluates directly.
//! Analysis errors abort; nothing here is skippable.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod decls;
mod info;
mod modes;
mod safety;
mod strata;
mod temporal;

pub use info::{PredicateDeps, ProgramInfo, Unit};

use mangle_model::Clause;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Result type for analysis
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors raised while binding a program
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// Two declarations for the same predicate symbol and arity
    #[error("duplicate declaration for {0}")]
    DuplicateDecl(String),

    /// A predicate was referenced but never declared, and synthesis is off
    #[error("unknown predicate {0}")]
    UnknownPredicate(String),

    /// A head, negated or function-application variable has no positive
    /// occurrence in the clause body
    #[error("unsafe variable {variable} in clause {clause:?}")]
    UnsafeVariable {
        /// The offending variable
        variable: String,
        /// The clause, canonical form
        clause: String,
    },

    /// A wildcard appeared in a rule head
    #[error("wildcard in rule head of {0:?}")]
    WildcardInHead(String),

    /// A head argument was a function application
    #[error("head arguments must be variables or constants in {0:?}")]
    FunctionInHead(String),

    /// No declared mode of the callee is satisfied at this goal
    #[error("no mode of {predicate} is satisfied by goal {goal:?}")]
    ModeViolation {
        /// Callee predicate
        predicate: String,
        /// The goal, canonical form
        goal: String,
    },

    /// Recursion through negation (or through an aggregating transform)
    #[error("program is not stratifiable: negation cycle through {0}")]
    NonStratifiable(String),

    /// Predicate bounds form a cycle
    #[error("cycle in predicate bounds involving {0}")]
    BoundCycle(String),

    /// A declaration bound is neither a type name nor a unary predicate name
    #[error("invalid bound {bound} in declaration of {predicate}")]
    InvalidBound {
        /// Declared predicate
        predicate: String,
        /// Offending bound, canonical form
        bound: String,
    },

    /// A declared fact does not conform to its predicate's bounds
    #[error("fact {0} does not conform to its declared bounds")]
    BoundMismatch(String),

    /// Malformed transform pipeline
    #[error("invalid transform in {clause:?}: {message}")]
    InvalidTransform {
        /// The clause, canonical form
        clause: String,
        /// Description
        message: String,
    },

    /// A ground fact of a temporal predicate carried non-instant bounds
    #[error("temporal fact {0:?} must carry concrete instant bounds")]
    InvalidFactInterval(String),

    /// A premise interval bound was neither a variable nor an instant
    #[error("premise interval bounds must be variables or instants in {0:?}")]
    UnsupportedPremiseBound(String),
}

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Synthesise declarations for referenced but undeclared predicates;
    /// when off, such references are an error
    pub synthesize_decls: bool,
    /// Check ground facts against declared type bounds
    pub check_fact_bounds: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            synthesize_decls: true,
            check_fact_bounds: true,
        }
    }
}

/// Analyze program units into a `ProgramInfo`
pub fn analyze(units: &[Unit], options: &AnalyzerOptions) -> AnalysisResult<ProgramInfo> {
    let mut clauses: Vec<Clause> = Vec::new();
    for unit in units {
        clauses.extend(unit.clauses.iter().cloned());
    }

    // Wildcards go first so every later step sees proper variables.
    let clauses = safety::eliminate_wildcards(clauses)?;

    let mut decls = decls::collect(units, &clauses, options)?;
    decls::desugar_bounds(&mut decls)?;

    for clause in &clauses {
        safety::check_clause(clause)?;
        modes::check_clause(clause, &decls)?;
    }

    let lowering = temporal::detect(&clauses);
    let (rules, initial_facts) = temporal::lower(clauses, &lowering, options, &decls)?;

    let (strata, stratum_of, deps) = strata::stratify(&rules)?;
    debug!(
        strata = strata.len(),
        rules = rules.values().map(Vec::len).sum::<usize>(),
        facts = initial_facts.len(),
        "analysis complete"
    );

    Ok(ProgramInfo {
        decls,
        initial_facts,
        rules,
        strata,
        stratum_of,
        deps,
        temporal: lowering,
    })
}

/// Convenience: analyze a single unit with default options
pub fn analyze_unit(unit: Unit) -> AnalysisResult<ProgramInfo> {
    analyze(&[unit], &AnalyzerOptions::default())
}

pub use decls::resolve_type_bound;

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::{Atom, BaseTerm, Clause, Constant, Literal};

    fn name(n: &str) -> BaseTerm {
        BaseTerm::Const(Constant::name(n).unwrap())
    }

    #[test]
    fn test_analyze_transitive_closure() {
        let unit = Unit {
            decls: vec![],
            clauses: vec![
                Clause::fact(Atom::new("edge", vec![name("/a"), name("/b")])),
                Clause::fact(Atom::new("edge", vec![name("/b"), name("/c")])),
                Clause::rule(
                    Atom::new("reach", vec![BaseTerm::var("X"), BaseTerm::var("Y")]),
                    vec![Literal::Positive(Atom::new(
                        "edge",
                        vec![BaseTerm::var("X"), BaseTerm::var("Y")],
                    ))],
                ),
                Clause::rule(
                    Atom::new("reach", vec![BaseTerm::var("X"), BaseTerm::var("Z")]),
                    vec![
                        Literal::Positive(Atom::new(
                            "edge",
                            vec![BaseTerm::var("X"), BaseTerm::var("Y")],
                        )),
                        Literal::Positive(Atom::new(
                            "reach",
                            vec![BaseTerm::var("Y"), BaseTerm::var("Z")],
                        )),
                    ],
                ),
            ],
        };
        let info = analyze_unit(unit).unwrap();
        assert_eq!(info.initial_facts.len(), 2);
        // edge was synthesised, reach holds two rules.
        assert!(info.decls.len() >= 2);
        let reach = mangle_model::PredicateSym::new("reach", 2);
        assert_eq!(info.rules.get(&reach).map(Vec::len), Some(2));
        // Everything lives in stratum 0: no negation anywhere.
        assert_eq!(info.stratum_of.get(&reach), Some(&0));
    }

    #[test]
    fn test_unknown_predicate_without_synthesis() {
        let unit = Unit {
            decls: vec![],
            clauses: vec![Clause::fact(Atom::new("p", vec![name("/a")]))],
        };
        let options = AnalyzerOptions {
            synthesize_decls: false,
            ..Default::default()
        };
        assert!(matches!(
            analyze(&[unit], &options),
            Err(AnalysisError::UnknownPredicate(_))
        ));
    }
}
