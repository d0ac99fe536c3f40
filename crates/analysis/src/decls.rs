//! Declaration collection, synthesis, and bound desugaring

use crate::{AnalysisError, AnalysisResult, AnalyzerOptions, Unit};
use mangle_model::{
    types, Atom, BaseTerm, Clause, Constant, Decl, InclusionConstraint, Literal, PredicateSym,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

fn referenced_predicates(clauses: &[Clause], out: &mut FxHashSet<PredicateSym>) {
    for clause in clauses {
        out.insert(clause.head.sym.clone());
        for lit in &clause.body {
            if let Some(atom) = lit.atom() {
                out.insert(atom.sym.clone());
            }
        }
    }
}

/// Collect explicit declarations, reject duplicates, and synthesise a
/// declaration for every referenced predicate that lacks one
pub fn collect(
    units: &[Unit],
    clauses: &[Clause],
    options: &AnalyzerOptions,
) -> AnalysisResult<FxHashMap<PredicateSym, Decl>> {
    let mut decls: FxHashMap<PredicateSym, Decl> = FxHashMap::default();
    for unit in units {
        for decl in &unit.decls {
            let sym = decl.sym().clone();
            if decls.insert(sym.clone(), decl.clone()).is_some() {
                return Err(AnalysisError::DuplicateDecl(format!("{sym:?}")));
            }
        }
    }

    let mut referenced = FxHashSet::default();
    referenced_predicates(clauses, &mut referenced);
    for sym in referenced {
        if decls.contains_key(&sym) {
            continue;
        }
        if !options.synthesize_decls {
            return Err(AnalysisError::UnknownPredicate(format!("{sym:?}")));
        }
        debug!(predicate = ?sym, "synthesising declaration");
        decls.insert(sym.clone(), Decl::synthetic(sym));
    }
    Ok(decls)
}

/// Resolve the type upper bound of a unary predicate, following predicate
/// bounds transitively; cycles are an error
pub fn resolve_type_bound(
    decls: &FxHashMap<PredicateSym, Decl>,
    predicate: &str,
) -> AnalysisResult<Constant> {
    let mut visiting = FxHashSet::default();
    resolve_rec(decls, predicate, &mut visiting)
}

fn resolve_rec(
    decls: &FxHashMap<PredicateSym, Decl>,
    predicate: &str,
    visiting: &mut FxHashSet<String>,
) -> AnalysisResult<Constant> {
    if !visiting.insert(predicate.to_string()) {
        return Err(AnalysisError::BoundCycle(predicate.to_string()));
    }
    let sym = PredicateSym::new(predicate, 1);
    let decl = decls
        .get(&sym)
        .ok_or_else(|| AnalysisError::UnknownPredicate(format!("{sym:?}")))?;
    // The resolved bound of a predicate is the bound of its first alternative's
    // single argument.
    let first = decl
        .bounds
        .first()
        .and_then(|alt| alt.args.first())
        .cloned()
        .unwrap_or_else(types::any);
    let resolved = if first.as_name().is_some() {
        first
    } else if let Some(inner) = first.as_str() {
        let inner = inner.to_string();
        resolve_rec(decls, &inner, visiting)?
    } else {
        return Err(AnalysisError::InvalidBound {
            predicate: predicate.to_string(),
            bound: first.to_string(),
        });
    };
    visiting.remove(predicate);
    Ok(resolved)
}

/// Desugar bounds naming unary predicates into inclusion-constraint
/// alternatives, leaving only type-name bounds behind
pub fn desugar_bounds(decls: &mut FxHashMap<PredicateSym, Decl>) -> AnalysisResult<()> {
    let snapshot = decls.clone();
    for decl in decls.values_mut() {
        let mut alternatives: Vec<Vec<Literal>> = Vec::new();
        for bound in &mut decl.bounds {
            let mut calls: Vec<Literal> = Vec::new();
            for (position, arg_bound) in bound.args.iter_mut().enumerate() {
                let current = arg_bound.clone();
                if let Some(type_name) = current.as_name() {
                    if !types::is_type_name(type_name) {
                        return Err(AnalysisError::InvalidBound {
                            predicate: format!("{:?}", decl.atom.sym),
                            bound: current.to_string(),
                        });
                    }
                } else if let Some(pred_name) = current.as_str() {
                    let resolved = resolve_type_bound(&snapshot, pred_name)?;
                    let arg_term = decl
                        .atom
                        .args
                        .get(position)
                        .cloned()
                        .unwrap_or_else(|| BaseTerm::var(format!("X{position}")));
                    calls.push(Literal::Positive(Atom::new(pred_name, vec![arg_term])));
                    *arg_bound = resolved;
                } else {
                    return Err(AnalysisError::InvalidBound {
                        predicate: format!("{:?}", decl.atom.sym),
                        bound: current.to_string(),
                    });
                }
            }
            if !calls.is_empty() {
                alternatives.push(calls);
            }
        }
        if !alternatives.is_empty() {
            let constraint = decl
                .constraint
                .get_or_insert_with(InclusionConstraint::default);
            constraint.alternatives.extend(alternatives);
        }
    }
    Ok(())
}

/// Check one ground fact against its predicate's (desugared) type bounds
pub fn check_fact_bounds(
    decls: &FxHashMap<PredicateSym, Decl>,
    fact: &Atom,
) -> AnalysisResult<()> {
    let Some(decl) = decls.get(&fact.sym) else {
        return Ok(());
    };
    let conforms_alt = |bound_args: &[Constant]| {
        bound_args.len() == fact.args.len()
            && bound_args.iter().zip(fact.args.iter()).all(|(bound, arg)| {
                let Some(type_name) = bound.as_name() else {
                    return false;
                };
                arg.as_constant()
                    .is_some_and(|c| types::conforms(type_name, c))
            })
    };
    if decl.bounds.iter().any(|alt| conforms_alt(&alt.args)) {
        Ok(())
    } else {
        Err(AnalysisError::BoundMismatch(fact.to_string()))
    }
}
