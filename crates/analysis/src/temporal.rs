//! Temporal lowering
//!
//! A predicate is temporal when any clause annotates its head with an
//! interval, constrains it with an interval pattern, or queries it under a
//! metric operator. Temporal facts are stored at arity + 2 with the interval
//! endpoints appended as time constants, so endpoint binding is ordinary
//! unification and recursive temporal rules ride the normal semi-naive loop.

use crate::{decls, AnalysisError, AnalysisResult, AnalyzerOptions};
use mangle_model::{
    Atom, BaseTerm, Clause, Constant, Decl, FreshVars, Literal, PredicateSym, TimeBound,
};
use rustc_hash::{FxHashMap, FxHashSet};

/// The set of temporal predicates referenced by the clauses
pub fn detect(clauses: &[Clause]) -> FxHashSet<PredicateSym> {
    let mut out = FxHashSet::default();
    for clause in clauses {
        if clause.head_interval.is_some() {
            out.insert(clause.head.sym.clone());
        }
        for lit in &clause.body {
            match lit {
                Literal::PositiveAt(atom, _) => {
                    out.insert(atom.sym.clone());
                }
                Literal::Temporal(t) => {
                    out.insert(t.atom.sym.clone());
                }
                _ => {}
            }
        }
    }
    out
}

fn lowered(sym: &PredicateSym) -> PredicateSym {
    sym.with_arity(sym.arity() + 2)
}

fn extend_with_fresh(atom: &Atom, fresh: &mut FreshVars) -> Atom {
    let mut args: Vec<BaseTerm> = atom.args.to_vec();
    args.push(BaseTerm::Var(fresh.fresh()));
    args.push(BaseTerm::Var(fresh.fresh()));
    Atom::from_sym(lowered(&atom.sym), args)
}

fn bound_to_term(bound: &TimeBound, clause: &Clause) -> AnalysisResult<BaseTerm> {
    match bound {
        TimeBound::Var(v) => Ok(BaseTerm::Var(v.clone())),
        TimeBound::Instant(nanos) => Ok(BaseTerm::Const(Constant::time(*nanos))),
        _ => Err(AnalysisError::UnsupportedPremiseBound(clause.to_string())),
    }
}

fn lower_fact(
    clause: &Clause,
    temporal: &FxHashSet<PredicateSym>,
) -> AnalysisResult<Atom> {
    let atom = &clause.head;
    if !temporal.contains(&atom.sym) {
        return Ok(atom.clone());
    }
    let (start, end) = match &clause.head_interval {
        None => (i64::MIN, i64::MAX),
        Some(pat) => match (&pat.start, &pat.end) {
            (TimeBound::Instant(s), TimeBound::Instant(e)) => (*s, *e),
            _ => return Err(AnalysisError::InvalidFactInterval(clause.to_string())),
        },
    };
    let mut args: Vec<BaseTerm> = atom.args.to_vec();
    args.push(BaseTerm::Const(Constant::time(start)));
    args.push(BaseTerm::Const(Constant::time(end)));
    Ok(Atom::from_sym(lowered(&atom.sym), args))
}

/// Lower clauses into rules grouped by (lowered) head predicate, plus the
/// initial ground facts
#[allow(clippy::type_complexity)]
pub fn lower(
    clauses: Vec<Clause>,
    temporal: &FxHashSet<PredicateSym>,
    options: &AnalyzerOptions,
    decl_map: &FxHashMap<PredicateSym, Decl>,
) -> AnalysisResult<(FxHashMap<PredicateSym, Vec<Clause>>, Vec<Atom>)> {
    let mut rules: FxHashMap<PredicateSym, Vec<Clause>> = FxHashMap::default();
    let mut facts: Vec<Atom> = Vec::new();

    for clause in clauses {
        if clause.body.is_empty() && clause.transform.is_none() {
            if options.check_fact_bounds {
                decls::check_fact_bounds(decl_map, &clause.head)?;
            }
            facts.push(lower_fact(&clause, temporal)?);
            continue;
        }

        let mut fresh = FreshVars::for_clause(&clause);
        let body = clause
            .body
            .iter()
            .map(|lit| -> AnalysisResult<Literal> {
                Ok(match lit {
                    Literal::Positive(atom) if temporal.contains(&atom.sym) => {
                        Literal::Positive(extend_with_fresh(atom, &mut fresh))
                    }
                    Literal::PositiveAt(atom, pat) => {
                        let mut args: Vec<BaseTerm> = atom.args.to_vec();
                        args.push(bound_to_term(&pat.start, &clause)?);
                        args.push(bound_to_term(&pat.end, &clause)?);
                        Literal::Positive(Atom::from_sym(lowered(&atom.sym), args))
                    }
                    Literal::Negative(atom) if temporal.contains(&atom.sym) => {
                        Literal::Negative(extend_with_fresh(atom, &mut fresh))
                    }
                    Literal::Temporal(t) => {
                        let mut t = t.clone();
                        t.atom = extend_with_fresh(&t.atom, &mut fresh);
                        Literal::Temporal(t)
                    }
                    other => other.clone(),
                })
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        let head_sym = if temporal.contains(&clause.head.sym) {
            lowered(&clause.head.sym)
        } else {
            clause.head.sym.clone()
        };
        rules
            .entry(head_sym)
            .or_default()
            .push(Clause { body, ..clause });
    }
    Ok((rules, facts))
}
