//! Wildcard elimination and range-restriction checking

use crate::{AnalysisError, AnalysisResult};
use functional::sym;
use mangle_model::{
    Atom, BaseTerm, Clause, FnApply, FreshVars, Literal, TimeBound, Variable,
};
use rustc_hash::FxHashSet;

fn replace_wildcards_in_term(term: &BaseTerm, fresh: &mut FreshVars) -> BaseTerm {
    match term {
        BaseTerm::Var(v) if v.is_wildcard() => BaseTerm::Var(fresh.fresh()),
        BaseTerm::Const(_) | BaseTerm::Var(_) => term.clone(),
        BaseTerm::Apply(app) => BaseTerm::Apply(replace_wildcards_in_app(app, fresh)),
    }
}

fn replace_wildcards_in_app(app: &FnApply, fresh: &mut FreshVars) -> FnApply {
    FnApply {
        sym: app.sym.clone(),
        args: app
            .args
            .iter()
            .map(|a| replace_wildcards_in_term(a, fresh))
            .collect(),
    }
}

fn replace_wildcards_in_atom(atom: &Atom, fresh: &mut FreshVars) -> Atom {
    Atom {
        sym: atom.sym.clone(),
        args: atom
            .args
            .iter()
            .map(|a| replace_wildcards_in_term(a, fresh))
            .collect(),
    }
}

fn term_has_wildcard(term: &BaseTerm) -> bool {
    match term {
        BaseTerm::Var(v) => v.is_wildcard(),
        BaseTerm::Const(_) => false,
        BaseTerm::Apply(app) => app.args.iter().any(term_has_wildcard),
    }
}

/// Replace every body wildcard with a fresh variable; reject wildcards in
/// rule heads and transforms
pub fn eliminate_wildcards(clauses: Vec<Clause>) -> AnalysisResult<Vec<Clause>> {
    clauses
        .into_iter()
        .map(|clause| {
            if clause.head.args.iter().any(term_has_wildcard) {
                return Err(AnalysisError::WildcardInHead(clause.to_string()));
            }
            if let Some(transform) = &clause.transform {
                let in_group = transform
                    .group_by
                    .iter()
                    .flat_map(|g| g.args.iter())
                    .any(term_has_wildcard);
                let in_lets = transform
                    .lets
                    .iter()
                    .any(|stmt| stmt.var.is_wildcard() || stmt.app.args.iter().any(term_has_wildcard));
                if in_group || in_lets {
                    return Err(AnalysisError::InvalidTransform {
                        clause: clause.to_string(),
                        message: "wildcard in transform".to_string(),
                    });
                }
            }
            let mut fresh = FreshVars::for_clause(&clause);
            let body = clause
                .body
                .iter()
                .map(|lit| match lit {
                    Literal::Positive(a) => {
                        Literal::Positive(replace_wildcards_in_atom(a, &mut fresh))
                    }
                    Literal::PositiveAt(a, pat) => {
                        let mut pat = pat.clone();
                        for bound in [&mut pat.start, &mut pat.end] {
                            if matches!(bound, TimeBound::Var(v) if v.is_wildcard()) {
                                *bound = TimeBound::Var(fresh.fresh());
                            }
                        }
                        Literal::PositiveAt(replace_wildcards_in_atom(a, &mut fresh), pat)
                    }
                    Literal::Negative(a) => {
                        Literal::Negative(replace_wildcards_in_atom(a, &mut fresh))
                    }
                    Literal::Eq(l, r) => Literal::Eq(
                        replace_wildcards_in_term(l, &mut fresh),
                        replace_wildcards_in_term(r, &mut fresh),
                    ),
                    Literal::Ineq(l, r) => Literal::Ineq(
                        replace_wildcards_in_term(l, &mut fresh),
                        replace_wildcards_in_term(r, &mut fresh),
                    ),
                    Literal::Temporal(t) => {
                        let mut t = t.clone();
                        t.atom = replace_wildcards_in_atom(&t.atom, &mut fresh);
                        Literal::Temporal(t)
                    }
                })
                .collect();
            Ok(Clause { body, ..clause })
        })
        .collect()
}

fn collect_app_syms(app: &FnApply, out: &mut Vec<String>) {
    out.push(app.sym.as_str().to_string());
    for arg in &app.args {
        if let BaseTerm::Apply(inner) = arg {
            collect_app_syms(inner, out);
        }
    }
}

/// Variables that the clause body binds: variables of positive literals,
/// closed under equalities whose other side is already bound
pub fn bound_variables(clause: &Clause) -> FxHashSet<Variable> {
    let mut bound: FxHashSet<Variable> = FxHashSet::default();
    for lit in &clause.body {
        if lit.is_positive() || matches!(lit, Literal::Temporal(_)) {
            lit.collect_variables(&mut bound);
        }
    }
    loop {
        let mut changed = false;
        for lit in &clause.body {
            if let Literal::Eq(l, r) = lit {
                for (var_side, expr_side) in [(l, r), (r, l)] {
                    if let BaseTerm::Var(v) = var_side {
                        if bound.contains(v) {
                            continue;
                        }
                        let mut expr_vars = FxHashSet::default();
                        expr_side.collect_variables(&mut expr_vars);
                        if expr_vars.iter().all(|ev| bound.contains(ev)) {
                            bound.insert(v.clone());
                            changed = true;
                        }
                    }
                }
            }
        }
        if !changed {
            return bound;
        }
    }
}

/// Check range restriction and transform well-formedness for one clause
pub fn check_clause(clause: &Clause) -> AnalysisResult<()> {
    let bound = bound_variables(clause);
    let unsafe_var = |variable: &Variable| AnalysisError::UnsafeVariable {
        variable: variable.name().to_string(),
        clause: clause.to_string(),
    };

    // Head arguments are variables or constants, never applications.
    for arg in &clause.head.args {
        if matches!(arg, BaseTerm::Apply(_)) {
            return Err(AnalysisError::FunctionInHead(clause.to_string()));
        }
    }

    // Reduce operators may only appear in transforms.
    for lit in &clause.body {
        let mut syms = Vec::new();
        match lit {
            Literal::Eq(l, r) | Literal::Ineq(l, r) => {
                for side in [l, r] {
                    if let BaseTerm::Apply(app) = side {
                        collect_app_syms(app, &mut syms);
                    }
                }
            }
            _ => {
                if let Some(atom) = lit.atom() {
                    for arg in &atom.args {
                        if let BaseTerm::Apply(app) = arg {
                            collect_app_syms(app, &mut syms);
                        }
                    }
                }
            }
        }
        if let Some(reducer) = syms.iter().find(|s| sym::is_reducer(s)) {
            return Err(AnalysisError::InvalidTransform {
                clause: clause.to_string(),
                message: format!("{reducer} outside a transform"),
            });
        }
    }

    // Negated, inequality and function-application variables need a positive
    // occurrence.
    for lit in &clause.body {
        let mut need_bound = FxHashSet::default();
        match lit {
            Literal::Negative(a) => a.collect_variables(&mut need_bound),
            Literal::Ineq(l, r) => {
                l.collect_variables(&mut need_bound);
                r.collect_variables(&mut need_bound);
            }
            Literal::Eq(l, r) => {
                for side in [l, r] {
                    if let BaseTerm::Apply(app) = side {
                        app.collect_variables(&mut need_bound);
                    }
                }
            }
            _ => {}
        }
        if let Some(v) = need_bound.iter().find(|v| !bound.contains(*v)) {
            return Err(unsafe_var(v));
        }
    }

    match &clause.transform {
        None => {
            // Every head variable appears positively in the body.
            let mut head_vars = FxHashSet::default();
            clause.head.collect_variables(&mut head_vars);
            if let Some(pat) = &clause.head_interval {
                pat.collect_variables(&mut head_vars);
            }
            if clause.body.is_empty() {
                if let Some(v) = head_vars.iter().next() {
                    return Err(unsafe_var(v));
                }
            } else if let Some(v) = head_vars.iter().find(|v| !bound.contains(*v)) {
                return Err(unsafe_var(v));
            }
        }
        Some(transform) => {
            if clause.body.is_empty() {
                return Err(AnalysisError::InvalidTransform {
                    clause: clause.to_string(),
                    message: "transform over an empty body".to_string(),
                });
            }
            // Group-by arguments are bound variables.
            let mut available: FxHashSet<Variable> = FxHashSet::default();
            if let Some(group) = &transform.group_by {
                if group.sym.as_str() != sym::GROUP_BY {
                    return Err(AnalysisError::InvalidTransform {
                        clause: clause.to_string(),
                        message: format!("unexpected do-statement {}", group.sym.as_str()),
                    });
                }
                for arg in &group.args {
                    match arg {
                        BaseTerm::Var(v) if bound.contains(v) => {
                            available.insert(v.clone());
                        }
                        _ => {
                            return Err(AnalysisError::InvalidTransform {
                                clause: clause.to_string(),
                                message: "group_by arguments must be bound variables"
                                    .to_string(),
                            })
                        }
                    }
                }
            }
            // Let statements apply known reducers over bound variables.
            for stmt in &transform.lets {
                if !sym::is_reducer(stmt.app.sym.as_str()) {
                    return Err(AnalysisError::InvalidTransform {
                        clause: clause.to_string(),
                        message: format!("{} is not a reduce operator", stmt.app.sym.as_str()),
                    });
                }
                let mut app_vars = FxHashSet::default();
                stmt.app.collect_variables(&mut app_vars);
                if let Some(v) = app_vars.iter().find(|v| !bound.contains(*v)) {
                    return Err(unsafe_var(v));
                }
                available.insert(stmt.var.clone());
            }
            // Head variables come from the group key or the reducer outputs.
            let mut head_vars = FxHashSet::default();
            clause.head.collect_variables(&mut head_vars);
            if let Some(v) = head_vars.iter().find(|v| !available.contains(*v)) {
                return Err(unsafe_var(v));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::{Constant, FnApply, LetStmt, Transform};

    fn name(n: &str) -> BaseTerm {
        BaseTerm::Const(Constant::name(n).unwrap())
    }

    #[test]
    fn test_wildcards_become_fresh_variables() {
        let clause = Clause::rule(
            Atom::new("hasChild", vec![BaseTerm::var("X")]),
            vec![Literal::Positive(Atom::new(
                "parent",
                vec![BaseTerm::var("X"), BaseTerm::var("_")],
            ))],
        );
        let out = eliminate_wildcards(vec![clause]).unwrap();
        let mut vars = FxHashSet::default();
        out[0].collect_variables(&mut vars);
        assert!(!vars.iter().any(Variable::is_wildcard));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_wildcard_in_head_rejected() {
        let clause = Clause::rule(
            Atom::new("p", vec![BaseTerm::var("_")]),
            vec![Literal::Positive(Atom::new("q", vec![BaseTerm::var("X")]))],
        );
        assert!(matches!(
            eliminate_wildcards(vec![clause]),
            Err(AnalysisError::WildcardInHead(_))
        ));
    }

    #[test]
    fn test_unsafe_head_variable() {
        let clause = Clause::rule(
            Atom::new("p", vec![BaseTerm::var("X"), BaseTerm::var("Y")]),
            vec![Literal::Positive(Atom::new("q", vec![BaseTerm::var("X")]))],
        );
        assert!(matches!(
            check_clause(&clause),
            Err(AnalysisError::UnsafeVariable { .. })
        ));
    }

    #[test]
    fn test_equality_binds_head_variable() {
        // m(X) :- X = fn:map(/a, 1).
        let clause = Clause::rule(
            Atom::new("m", vec![BaseTerm::var("X")]),
            vec![Literal::Eq(
                BaseTerm::var("X"),
                BaseTerm::Apply(FnApply::new(
                    "fn:map",
                    vec![name("/a"), BaseTerm::Const(Constant::number(1))],
                )),
            )],
        );
        assert!(check_clause(&clause).is_ok());
    }

    #[test]
    fn test_negated_variable_must_be_positive() {
        let clause = Clause::rule(
            Atom::new("p", vec![BaseTerm::var("X")]),
            vec![
                Literal::Positive(Atom::new("q", vec![BaseTerm::var("X")])),
                Literal::Negative(Atom::new("r", vec![BaseTerm::var("Y")])),
            ],
        );
        assert!(matches!(
            check_clause(&clause),
            Err(AnalysisError::UnsafeVariable { .. })
        ));
    }

    #[test]
    fn test_transform_head_vars_from_group_and_lets() {
        // total(P, T) :- sale(P, Q) |> do fn:group_by(P), let T = fn:sum(Q).
        let clause = Clause::rule(
            Atom::new("total", vec![BaseTerm::var("P"), BaseTerm::var("T")]),
            vec![Literal::Positive(Atom::new(
                "sale",
                vec![BaseTerm::var("P"), BaseTerm::var("Q")],
            ))],
        )
        .with_transform(Transform {
            group_by: Some(FnApply::new(sym::GROUP_BY, vec![BaseTerm::var("P")])),
            lets: vec![LetStmt {
                var: Variable::new("T"),
                app: FnApply::new(sym::SUM, vec![BaseTerm::var("Q")]),
            }],
        });
        assert!(check_clause(&clause).is_ok());
    }

    #[test]
    fn test_transform_rejects_non_reducer() {
        let clause = Clause::rule(
            Atom::new("p", vec![BaseTerm::var("T")]),
            vec![Literal::Positive(Atom::new("q", vec![BaseTerm::var("Q")]))],
        )
        .with_transform(Transform {
            group_by: None,
            lets: vec![LetStmt {
                var: Variable::new("T"),
                app: FnApply::new("fn:plus", vec![BaseTerm::var("Q")]),
            }],
        });
        assert!(matches!(
            check_clause(&clause),
            Err(AnalysisError::InvalidTransform { .. })
        ));
    }

    #[test]
    fn test_reducer_outside_transform_rejected() {
        let clause = Clause::rule(
            Atom::new("p", vec![BaseTerm::var("X")]),
            vec![
                Literal::Positive(Atom::new("q", vec![BaseTerm::var("X")])),
                Literal::Eq(
                    BaseTerm::var("Y"),
                    BaseTerm::Apply(FnApply::new(sym::COUNT, vec![])),
                ),
            ],
        );
        assert!(matches!(
            check_clause(&clause),
            Err(AnalysisError::InvalidTransform { .. })
        ));
    }
}
