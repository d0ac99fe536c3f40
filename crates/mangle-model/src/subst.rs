//! Substitutions, application, and fresh-variable generation

use crate::constant::Constant;
use crate::term::{Atom, BaseTerm, Clause, FnApply, LetStmt, Literal, Transform, Variable};
use crate::temporal::{IntervalPattern, TemporalLiteral, TimeBound};
use rustc_hash::{FxHashMap, FxHashSet};

/// A mapping from variables to base terms
///
/// Kept as a trait so the evaluator can pick a representation per expected
/// domain size.
pub trait Subst {
    /// The binding for `v`, if any
    fn get(&self, v: &Variable) -> Option<&BaseTerm>;
}

/// Hash-map-backed substitution; the evaluator's workhorse
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubstMap {
    map: FxHashMap<Variable, BaseTerm>,
}

impl SubstMap {
    /// Empty substitution
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `v` to `term`, replacing any previous binding
    pub fn bind(&mut self, v: Variable, term: BaseTerm) {
        self.map.insert(v, term);
    }

    /// True if `v` is bound
    pub fn contains(&self, v: &Variable) -> bool {
        self.map.contains_key(v)
    }

    /// The bound constant for `v`, if it is bound to one
    pub fn get_constant(&self, v: &Variable) -> Option<&Constant> {
        match self.map.get(v) {
            Some(BaseTerm::Const(c)) => Some(c),
            _ => None,
        }
    }

    /// Remove the binding for `v`
    pub fn unbind(&mut self, v: &Variable) {
        self.map.remove(v);
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if no variable is bound
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over bindings (iteration order is not canonical)
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &BaseTerm)> {
        self.map.iter()
    }
}

impl Subst for SubstMap {
    fn get(&self, v: &Variable) -> Option<&BaseTerm> {
        self.map.get(v)
    }
}

/// Sorted-pair-vector substitution for small domains
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubstPairs {
    entries: Vec<(Variable, BaseTerm)>,
}

impl SubstPairs {
    /// Empty substitution
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `v` to `term`, replacing any previous binding
    pub fn bind(&mut self, v: Variable, term: BaseTerm) {
        match self.entries.binary_search_by(|(e, _)| e.cmp(&v)) {
            Ok(i) => self.entries[i].1 = term,
            Err(i) => self.entries.insert(i, (v, term)),
        }
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no variable is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bound constant for `v`, if it is bound to one
    pub fn get_constant(&self, v: &Variable) -> Option<&Constant> {
        match Subst::get(self, v) {
            Some(BaseTerm::Const(c)) => Some(c),
            _ => None,
        }
    }
}

impl Subst for SubstPairs {
    fn get(&self, v: &Variable) -> Option<&BaseTerm> {
        self.entries
            .binary_search_by(|(e, _)| e.cmp(v))
            .ok()
            .map(|i| &self.entries[i].1)
    }
}

impl FromIterator<(Variable, BaseTerm)> for SubstMap {
    fn from_iter<T: IntoIterator<Item = (Variable, BaseTerm)>>(iter: T) -> Self {
        let mut s = SubstMap::new();
        for (v, t) in iter {
            s.bind(v, t);
        }
        s
    }
}

impl FromIterator<(Variable, BaseTerm)> for SubstPairs {
    fn from_iter<T: IntoIterator<Item = (Variable, BaseTerm)>>(iter: T) -> Self {
        let mut s = SubstPairs::new();
        for (v, t) in iter {
            s.bind(v, t);
        }
        s
    }
}

impl BaseTerm {
    /// Replace every bound variable with its binding; function applications
    /// are substituted into but never reduced
    pub fn apply_subst<S: Subst + ?Sized>(&self, subst: &S) -> BaseTerm {
        match self {
            BaseTerm::Const(_) => self.clone(),
            BaseTerm::Var(v) => match subst.get(v) {
                Some(t) => t.clone(),
                None => self.clone(),
            },
            BaseTerm::Apply(app) => BaseTerm::Apply(app.apply_subst(subst)),
        }
    }
}

impl FnApply {
    /// Substitute into every argument
    pub fn apply_subst<S: Subst + ?Sized>(&self, subst: &S) -> FnApply {
        FnApply {
            sym: self.sym.clone(),
            args: self.args.iter().map(|a| a.apply_subst(subst)).collect(),
        }
    }
}

impl Atom {
    /// Substitute into every argument
    pub fn apply_subst<S: Subst + ?Sized>(&self, subst: &S) -> Atom {
        Atom {
            sym: self.sym.clone(),
            args: self.args.iter().map(|a| a.apply_subst(subst)).collect(),
        }
    }
}

impl IntervalPattern {
    /// Resolve variable bounds that are bound to time constants
    pub fn apply_subst<S: Subst + ?Sized>(&self, subst: &S) -> IntervalPattern {
        let resolve = |bound: &TimeBound| match bound {
            TimeBound::Var(v) => match subst.get(v) {
                Some(BaseTerm::Const(c)) => match c.as_time() {
                    Some(nanos) => TimeBound::Instant(nanos),
                    None => bound.clone(),
                },
                _ => bound.clone(),
            },
            other => other.clone(),
        };
        IntervalPattern {
            start: resolve(&self.start),
            end: resolve(&self.end),
        }
    }
}

impl Literal {
    /// Substitute into the literal
    pub fn apply_subst<S: Subst + ?Sized>(&self, subst: &S) -> Literal {
        match self {
            Literal::Positive(a) => Literal::Positive(a.apply_subst(subst)),
            Literal::PositiveAt(a, pat) => {
                Literal::PositiveAt(a.apply_subst(subst), pat.apply_subst(subst))
            }
            Literal::Negative(a) => Literal::Negative(a.apply_subst(subst)),
            Literal::Eq(l, r) => Literal::Eq(l.apply_subst(subst), r.apply_subst(subst)),
            Literal::Ineq(l, r) => Literal::Ineq(l.apply_subst(subst), r.apply_subst(subst)),
            Literal::Temporal(t) => Literal::Temporal(TemporalLiteral {
                op: t.op,
                window: t.window,
                atom: t.atom.apply_subst(subst),
            }),
        }
    }
}

impl Clause {
    /// Substitute into head, body and transform
    pub fn apply_subst<S: Subst + ?Sized>(&self, subst: &S) -> Clause {
        Clause {
            head: self.head.apply_subst(subst),
            head_interval: self.head_interval.as_ref().map(|p| p.apply_subst(subst)),
            body: self.body.iter().map(|l| l.apply_subst(subst)).collect(),
            transform: self.transform.as_ref().map(|t| Transform {
                group_by: t.group_by.as_ref().map(|g| g.apply_subst(subst)),
                lets: t
                    .lets
                    .iter()
                    .map(|stmt| LetStmt {
                        var: stmt.var.clone(),
                        app: stmt.app.apply_subst(subst),
                    })
                    .collect(),
            }),
        }
    }
}

/// Fresh-variable generator over a used-variable set
///
/// `fresh` selects the lowest-indexed `X0, X1, ...` not yet in the set and
/// records it there.
#[derive(Clone, Debug, Default)]
pub struct FreshVars {
    used: FxHashSet<Variable>,
}

impl FreshVars {
    /// Generator with an empty used set
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator seeded with every variable of `clause`
    pub fn for_clause(clause: &Clause) -> Self {
        let mut used = FxHashSet::default();
        clause.collect_variables(&mut used);
        Self { used }
    }

    /// Mark a variable as used
    pub fn mark_used(&mut self, v: Variable) {
        self.used.insert(v);
    }

    /// The lowest-indexed unused `Xn`, which becomes used
    pub fn fresh(&mut self) -> Variable {
        let mut i = 0usize;
        loop {
            let candidate = Variable::new(format!("X{i}"));
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Variable {
        Variable::new("X")
    }

    #[test]
    fn test_apply_leaves_unbound() {
        let subst = SubstMap::new();
        let term = BaseTerm::var("X");
        assert_eq!(term.apply_subst(&subst), term);
    }

    #[test]
    fn test_apply_binds() {
        let mut subst = SubstMap::new();
        subst.bind(x(), BaseTerm::Const(Constant::number(3)));
        let app = FnApply::new("fn:plus", vec![BaseTerm::var("X"), BaseTerm::var("Y")]);
        let applied = app.apply_subst(&subst);
        assert_eq!(applied.args[0], BaseTerm::Const(Constant::number(3)));
        assert_eq!(applied.args[1], BaseTerm::var("Y"));
    }

    #[test]
    fn test_apply_does_not_reduce() {
        let mut subst = SubstMap::new();
        subst.bind(x(), BaseTerm::Const(Constant::number(3)));
        let term = BaseTerm::Apply(FnApply::new(
            "fn:plus",
            vec![BaseTerm::var("X"), BaseTerm::Const(Constant::number(1))],
        ));
        match term.apply_subst(&subst) {
            BaseTerm::Apply(app) => assert_eq!(app.sym.as_str(), "fn:plus"),
            other => panic!("expected an application, got {other:?}"),
        }
    }

    #[test]
    fn test_pairs_and_map_agree() {
        let mut pairs = SubstPairs::new();
        let mut map = SubstMap::new();
        for (name, n) in [("B", 2), ("A", 1), ("C", 3)] {
            pairs.bind(Variable::new(name), BaseTerm::Const(Constant::number(n)));
            map.bind(Variable::new(name), BaseTerm::Const(Constant::number(n)));
        }
        for name in ["A", "B", "C", "D"] {
            let v = Variable::new(name);
            assert_eq!(Subst::get(&pairs, &v), Subst::get(&map, &v));
        }
    }

    #[test]
    fn test_fresh_skips_used() {
        let mut fresh = FreshVars::new();
        fresh.mark_used(Variable::new("X0"));
        fresh.mark_used(Variable::new("X2"));
        assert_eq!(fresh.fresh(), Variable::new("X1"));
        assert_eq!(fresh.fresh(), Variable::new("X3"));
    }
}
