//! The semi-naive fixpoint engine
//!
//! Strata evaluate in ascending order. Round zero of a stratum evaluates
//! every rule against the full store; later rounds substitute the previous
//! round's delta for one recursive premise at a time. Box-temporal recursion
//! is not delta-decomposable (coverage is a property of the whole fact set),
//! so rules recursing through a box operator re-evaluate naively each round.

use crate::external::ExternalPredicates;
use crate::{temporal, transform, CancelToken, EvalError, EvalResult};
use analysis::ProgramInfo;
use factstore::{FactStore, ReadOnlyFactStore, SimpleInMemoryStore};
use functional::{eval_apply_fn, FunctionError};
use mangle_model::{
    match_atom, Atom, BaseTerm, Clause, Constant, Interval, Literal, PredicateSym, Subst,
    SubstMap, TimeBound,
};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Evaluation options
#[derive(Clone, Debug)]
pub struct EvalOptions {
    /// Reference time for temporal operators and head intervals; the wall
    /// clock at evaluation start when unset
    pub now: Option<i64>,
    /// Cooperative cancellation, checked at round boundaries
    pub cancel: Option<CancelToken>,
    /// Per-stratum round cap; exceeding it is an internal error, never a
    /// silent truncation
    pub max_rounds: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            now: None,
            cancel: None,
            max_rounds: 100_000,
        }
    }
}

/// Counters describing one evaluation run
#[derive(Clone, Debug, Default)]
pub struct EvalStats {
    /// Strata that held at least one rule
    pub strata: usize,
    /// Semi-naive rounds across all strata
    pub rounds: usize,
    /// Facts newly added to the store (including initial facts)
    pub derived: usize,
}

fn check_cancel(options: &EvalOptions) -> EvalResult<()> {
    match &options.cancel {
        Some(token) if token.is_cancelled() => Err(EvalError::Cancelled),
        _ => Ok(()),
    }
}

/// Compute the minimal model of `info` into `store`
pub fn eval_program(
    info: &ProgramInfo,
    store: &mut dyn FactStore,
    externals: &ExternalPredicates,
    options: &EvalOptions,
) -> EvalResult<EvalStats> {
    let now = match options.now {
        Some(nanos) => nanos,
        None => functional::time::now_nanos()
            .map_err(|e| EvalError::Internal(format!("cannot read wall clock: {e}")))?,
    };

    let mut stats = EvalStats::default();
    for fact in &info.initial_facts {
        if store.add(fact.clone())? {
            stats.derived += 1;
        }
    }

    for (index, preds) in info.strata.iter().enumerate() {
        check_cancel(options)?;
        let stratum_preds: FxHashSet<PredicateSym> = preds.iter().cloned().collect();
        let mut rules: Vec<&Clause> = Vec::new();
        for sym in preds {
            rules.extend(info.rules_of(sym));
        }
        if rules.is_empty() {
            continue;
        }
        debug!(stratum = index, rules = rules.len(), "evaluating stratum");
        eval_stratum(
            info,
            &stratum_preds,
            &rules,
            store,
            externals,
            now,
            options,
            &mut stats,
        )?;
        stats.strata += 1;
    }
    Ok(stats)
}

/// How a rule participates in semi-naive rounds
enum DeltaPlan {
    /// No recursive premise; round zero suffices
    NonRecursive,
    /// Recursive positive or diamond premises at these body positions
    Positions(Vec<usize>),
    /// Recursion through a box operator: re-evaluate fully each round
    Naive,
}

fn delta_plan(clause: &Clause, stratum_preds: &FxHashSet<PredicateSym>) -> DeltaPlan {
    let mut positions = Vec::new();
    let mut boxed = false;
    for (i, lit) in clause.body.iter().enumerate() {
        match lit {
            Literal::Positive(atom) if stratum_preds.contains(&atom.sym) => positions.push(i),
            Literal::Temporal(t) if stratum_preds.contains(&t.atom.sym) => {
                if t.op.is_box() {
                    boxed = true;
                } else {
                    positions.push(i);
                }
            }
            _ => {}
        }
    }
    if boxed {
        DeltaPlan::Naive
    } else if positions.is_empty() {
        DeltaPlan::NonRecursive
    } else {
        DeltaPlan::Positions(positions)
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_stratum(
    info: &ProgramInfo,
    stratum_preds: &FxHashSet<PredicateSym>,
    rules: &[&Clause],
    store: &mut dyn FactStore,
    externals: &ExternalPredicates,
    now: i64,
    options: &EvalOptions,
    stats: &mut EvalStats,
) -> EvalResult<()> {
    // Round zero: every rule against the full store.
    let mut delta = SimpleInMemoryStore::new();
    for clause in rules {
        for fact in eval_clause(info, clause, &*store, None, externals, now)? {
            if !store.contains(&fact) && !delta.contains(&fact) {
                delta.add(fact)?;
            }
        }
    }
    stats.rounds += 1;

    let mut round = 1usize;
    while !delta.is_empty() {
        check_cancel(options)?;
        if round > options.max_rounds {
            return Err(EvalError::Internal(format!(
                "stratum did not converge within {} rounds",
                options.max_rounds
            )));
        }
        stats.derived += store.merge(&delta)?;

        let mut next = SimpleInMemoryStore::new();
        for clause in rules {
            let mut emit = |facts: Vec<Atom>, next: &mut SimpleInMemoryStore| -> EvalResult<()> {
                for fact in facts {
                    if !store.contains(&fact) && !next.contains(&fact) {
                        next.add(fact)?;
                    }
                }
                Ok(())
            };
            match delta_plan(clause, stratum_preds) {
                DeltaPlan::NonRecursive => {}
                DeltaPlan::Naive => {
                    let facts = eval_clause(info, clause, &*store, None, externals, now)?;
                    emit(facts, &mut next)?;
                }
                DeltaPlan::Positions(positions) => {
                    for position in positions {
                        let facts = eval_clause(
                            info,
                            clause,
                            &*store,
                            Some((position, &delta)),
                            externals,
                            now,
                        )?;
                        emit(facts, &mut next)?;
                    }
                }
            }
        }
        delta = next;
        round += 1;
        stats.rounds += 1;
    }
    Ok(())
}

fn eval_clause<S: ReadOnlyFactStore + ?Sized>(
    info: &ProgramInfo,
    clause: &Clause,
    store: &S,
    delta: Option<(usize, &SimpleInMemoryStore)>,
    externals: &ExternalPredicates,
    now: i64,
) -> EvalResult<Vec<Atom>> {
    let mut substs = vec![SubstMap::new()];
    for (i, lit) in clause.body.iter().enumerate() {
        if substs.is_empty() {
            break;
        }
        let delta_here = delta.filter(|(p, _)| *p == i).map(|(_, d)| d);
        substs = eval_literal(lit, substs, store, delta_here, externals, now)?;
    }

    let mut facts = Vec::with_capacity(substs.len());
    let mut emit = |result: Result<Atom, String>, facts: &mut Vec<Atom>| match result {
        Ok(fact) => facts.push(fact),
        Err(message) => warn!(clause = %clause, %message, "skipping row"),
    };
    match &clause.transform {
        None => {
            for row in substs {
                emit(head_fact(info, clause, &row, now), &mut facts);
            }
        }
        Some(t) => {
            for row in transform::apply(t, substs)? {
                emit(head_fact(info, clause, &row, now), &mut facts);
            }
        }
    }
    Ok(facts)
}

/// Evaluate ground function applications inside a query pattern
fn reduce_pattern(pattern: Atom, subst: &SubstMap) -> Result<Atom, FunctionError> {
    if pattern
        .args
        .iter()
        .all(|a| !matches!(a, BaseTerm::Apply(_)))
    {
        return Ok(pattern);
    }
    let args = pattern
        .args
        .iter()
        .map(|arg| match arg {
            BaseTerm::Apply(app) => eval_apply_fn(app, subst).map(BaseTerm::Const),
            other => Ok(other.clone()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Atom::from_sym(pattern.sym, args))
}

fn eval_literal<S: ReadOnlyFactStore + ?Sized>(
    lit: &Literal,
    substs: Vec<SubstMap>,
    store: &S,
    delta: Option<&SimpleInMemoryStore>,
    externals: &ExternalPredicates,
    now: i64,
) -> EvalResult<Vec<SubstMap>> {
    match lit {
        Literal::Positive(atom) => {
            let mut out = Vec::new();
            for subst in substs {
                if delta.is_none() {
                    if let Some(rows) = externals.solve(atom, &subst)? {
                        out.extend(rows);
                        continue;
                    }
                }
                let pattern = match reduce_pattern(atom.apply_subst(&subst), &subst) {
                    Ok(pattern) => pattern,
                    Err(err) => {
                        warn!(goal = %atom, error = %err, "skipping row");
                        continue;
                    }
                };
                let mut push = |fact: &Atom| {
                    if let Some(extended) = match_atom(&pattern, fact, &subst) {
                        out.push(extended);
                    }
                    true
                };
                match delta {
                    Some(d) => d.get_facts(&pattern, &mut push),
                    None => store.get_facts(&pattern, &mut push),
                }
            }
            Ok(out)
        }
        Literal::Negative(atom) => {
            // Negation consults the model built by lower strata; free
            // variables (lowered interval endpoints) mean "for no binding".
            let mut out = Vec::new();
            for subst in substs {
                let pattern = atom.apply_subst(&subst);
                let mut found = false;
                store.get_facts(&pattern, &mut |fact| {
                    if match_atom(&pattern, fact, &subst).is_some() {
                        found = true;
                        return false;
                    }
                    true
                });
                if !found {
                    out.push(subst);
                }
            }
            Ok(out)
        }
        Literal::Eq(l, r) => {
            let mut out = Vec::new();
            for mut subst in substs {
                match eval_equality(l, r, &mut subst) {
                    Ok(true) => out.push(subst),
                    Ok(false) => {}
                    Err(err) => warn!(literal = %lit, error = %err, "skipping row"),
                }
            }
            Ok(out)
        }
        Literal::Ineq(l, r) => {
            let mut out = Vec::new();
            for subst in substs {
                match (resolve_value(l, &subst), resolve_value(r, &subst)) {
                    (Ok(Some(a)), Ok(Some(b))) => {
                        if a != b {
                            out.push(subst);
                        }
                    }
                    (Err(err), _) | (_, Err(err)) => {
                        warn!(literal = %lit, error = %err, "skipping row");
                    }
                    _ => warn!(literal = %lit, "unbound inequality; skipping row"),
                }
            }
            Ok(out)
        }
        Literal::Temporal(t) => match delta {
            Some(d) => Ok(temporal::eval_temporal(t, substs, d, now)),
            None => Ok(temporal::eval_temporal(t, substs, store, now)),
        },
        Literal::PositiveAt(..) => Err(EvalError::Internal(
            "interval premise survived temporal lowering".to_string(),
        )),
    }
}

/// A term resolved against a row: a ground constant or a still-free variable
fn resolve_value(
    term: &BaseTerm,
    subst: &SubstMap,
) -> Result<Option<Constant>, FunctionError> {
    match term {
        BaseTerm::Const(c) => Ok(Some(c.clone())),
        BaseTerm::Var(v) => match subst.get(v) {
            Some(BaseTerm::Const(c)) => Ok(Some(c.clone())),
            Some(other) => resolve_value(other, subst),
            None => Ok(None),
        },
        BaseTerm::Apply(app) => eval_apply_fn(app, subst).map(Some),
    }
}

/// Equality: a test when both sides are ground, a binding when one side is a
/// free variable
fn eval_equality(
    l: &BaseTerm,
    r: &BaseTerm,
    subst: &mut SubstMap,
) -> Result<bool, FunctionError> {
    let lv = resolve_value(l, subst)?;
    let rv = resolve_value(r, subst)?;
    match (lv, rv) {
        (Some(a), Some(b)) => Ok(a == b),
        (None, Some(value)) => {
            if let BaseTerm::Var(v) = l {
                subst.bind(v.clone(), BaseTerm::Const(value));
                Ok(true)
            } else {
                Ok(false)
            }
        }
        (Some(value), None) => {
            if let BaseTerm::Var(v) = r {
                subst.bind(v.clone(), BaseTerm::Const(value));
                Ok(true)
            } else {
                Ok(false)
            }
        }
        (None, None) => Err(FunctionError::Malformed {
            function: "=".to_string(),
            message: "both sides unbound".to_string(),
        }),
    }
}

fn resolve_bound<S: Subst + ?Sized>(
    bound: &TimeBound,
    row: &S,
    now: i64,
) -> Result<i64, String> {
    match bound {
        TimeBound::MinusInf => Ok(i64::MIN),
        TimeBound::PlusInf => Ok(i64::MAX),
        TimeBound::Now => Ok(now),
        TimeBound::Instant(nanos) => Ok(*nanos),
        TimeBound::Relative(offset) => Ok(now.saturating_add(*offset)),
        TimeBound::Var(v) => match row.get(v) {
            Some(BaseTerm::Const(c)) => c
                .as_time()
                .ok_or_else(|| format!("interval bound {v} is not bound to a time")),
            _ => Err(format!("interval bound {v} is not bound to a time")),
        },
    }
}

/// Build the derived fact for one answer row
fn head_fact<S: Subst + ?Sized>(
    info: &ProgramInfo,
    clause: &Clause,
    row: &S,
    now: i64,
) -> Result<Atom, String> {
    let head = clause.head.apply_subst(row);
    let mut args: Vec<BaseTerm> = Vec::with_capacity(head.args.len() + 2);
    for arg in head.args {
        match arg {
            BaseTerm::Const(_) => args.push(arg),
            BaseTerm::Var(v) => return Err(format!("unbound head variable {v}")),
            BaseTerm::Apply(_) => {
                return Err("function application in head".to_string());
            }
        }
    }
    if !info.is_temporal(&clause.head.sym) {
        return Ok(Atom::from_sym(clause.head.sym.clone(), args));
    }
    let interval = match &clause.head_interval {
        // A temporal fact derived without an annotation holds at the
        // reference time.
        None => Interval::new(now, now),
        Some(pat) => Interval::new(
            resolve_bound(&pat.start, row, now)?,
            resolve_bound(&pat.end, row, now)?,
        ),
    };
    args.push(BaseTerm::Const(Constant::time(interval.start)));
    args.push(BaseTerm::Const(Constant::time(interval.end)));
    Ok(Atom::from_sym(info.lowered_sym(&clause.head.sym), args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::{analyze_unit, Unit};
    use factstore::IndexedInMemoryStore;

    fn name(n: &str) -> BaseTerm {
        BaseTerm::Const(Constant::name(n).unwrap())
    }

    #[test]
    fn test_transitive_closure_fixpoint() {
        let unit = Unit {
            decls: vec![],
            clauses: vec![
                Clause::fact(Atom::new("edge", vec![name("/a"), name("/b")])),
                Clause::fact(Atom::new("edge", vec![name("/b"), name("/c")])),
                Clause::fact(Atom::new("edge", vec![name("/c"), name("/d")])),
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
        let mut store = IndexedInMemoryStore::new();
        let stats = eval_program(
            &info,
            &mut store,
            &ExternalPredicates::new(),
            &EvalOptions::default(),
        )
        .unwrap();

        // 3 edges + 6 reach facts.
        assert_eq!(store.fact_count(), 9);
        assert!(stats.rounds >= 2);
        assert!(store.contains(&Atom::new("reach", vec![name("/a"), name("/d")])));
    }

    #[test]
    fn test_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let options = EvalOptions {
            cancel: Some(token),
            ..Default::default()
        };
        let unit = Unit {
            decls: vec![],
            clauses: vec![
                Clause::fact(Atom::new("q", vec![name("/a")])),
                Clause::rule(
                    Atom::new("r", vec![BaseTerm::var("X")]),
                    vec![Literal::Positive(Atom::new("q", vec![BaseTerm::var("X")]))],
                ),
            ],
        };
        let info = analyze_unit(unit).unwrap();
        let mut store = IndexedInMemoryStore::new();
        let result = eval_program(&info, &mut store, &ExternalPredicates::new(), &options);
        assert!(matches!(result, Err(EvalError::Cancelled)));
    }
}
