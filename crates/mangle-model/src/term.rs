//! Base terms, atoms, literals and clauses

use crate::constant::Constant;
use crate::temporal::{IntervalPattern, TemporalLiteral};
use crate::{ModelError, ModelResult};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::sync::Arc;

/// A predicate symbol with fixed arity
///
/// Two symbols with the same name but different arities are distinct
/// predicates.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateSym {
    name: Arc<str>,
    arity: usize,
}

impl PredicateSym {
    /// Create a predicate symbol
    pub fn new(name: impl AsRef<str>, arity: usize) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            arity,
        }
    }

    /// Predicate name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The same predicate name at a different arity
    pub fn with_arity(&self, arity: usize) -> Self {
        Self {
            name: self.name.clone(),
            arity,
        }
    }
}

impl std::fmt::Debug for PredicateSym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A function symbol; always carries the `fn:` prefix
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionSym {
    name: Arc<str>,
}

impl FunctionSym {
    /// Create a function symbol from its full `fn:`-prefixed name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// Full symbol name including the `fn:` prefix
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for FunctionSym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A variable symbol
///
/// The literal `_` is the wildcard; it must be replaced with a fresh variable
/// before evaluation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    name: Arc<str>,
}

impl Variable {
    /// Create a variable
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for the wildcard `_`
    pub fn is_wildcard(&self) -> bool {
        &*self.name == "_"
    }
}

impl std::fmt::Debug for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A function application; evaluated lazily once its variables are bound
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FnApply {
    /// Function symbol
    pub sym: FunctionSym,
    /// Argument terms
    pub args: Vec<BaseTerm>,
}

impl FnApply {
    /// Create a function application
    pub fn new(sym: impl AsRef<str>, args: Vec<BaseTerm>) -> Self {
        Self {
            sym: FunctionSym::new(sym),
            args,
        }
    }

    /// Collect the variables appearing in the arguments
    pub fn collect_variables(&self, out: &mut FxHashSet<Variable>) {
        for arg in &self.args {
            arg.collect_variables(out);
        }
    }
}

/// Constant, variable, or function application
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseTerm {
    /// A constant value
    Const(Constant),
    /// A variable
    Var(Variable),
    /// A lazy function application
    Apply(FnApply),
}

impl BaseTerm {
    /// Variable shorthand
    pub fn var(name: impl AsRef<str>) -> BaseTerm {
        BaseTerm::Var(Variable::new(name))
    }

    /// True if this term contains no variables
    pub fn is_ground(&self) -> bool {
        match self {
            BaseTerm::Const(_) => true,
            BaseTerm::Var(_) => false,
            BaseTerm::Apply(app) => app.args.iter().all(BaseTerm::is_ground),
        }
    }

    /// The constant, if this term is one
    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            BaseTerm::Const(c) => Some(c),
            _ => None,
        }
    }

    /// The variable, if this term is one
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            BaseTerm::Var(v) => Some(v),
            _ => None,
        }
    }

    /// Recursively gather every variable appearing in this term
    pub fn collect_variables(&self, out: &mut FxHashSet<Variable>) {
        match self {
            BaseTerm::Const(_) => {}
            BaseTerm::Var(v) => {
                out.insert(v.clone());
            }
            BaseTerm::Apply(app) => app.collect_variables(out),
        }
    }
}

impl From<Constant> for BaseTerm {
    fn from(c: Constant) -> Self {
        BaseTerm::Const(c)
    }
}

impl From<Variable> for BaseTerm {
    fn from(v: Variable) -> Self {
        BaseTerm::Var(v)
    }
}

/// A predicate applied to base terms
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    /// Predicate symbol
    pub sym: PredicateSym,
    /// Arguments; length always equals the symbol's arity
    pub args: SmallVec<[BaseTerm; 4]>,
}

impl Atom {
    /// Create an atom; the arity is taken from the argument count
    pub fn new(predicate: impl AsRef<str>, args: Vec<BaseTerm>) -> Self {
        let sym = PredicateSym::new(predicate, args.len());
        Self {
            sym,
            args: SmallVec::from_vec(args),
        }
    }

    /// Create an atom for an existing symbol
    pub fn from_sym(sym: PredicateSym, args: Vec<BaseTerm>) -> Self {
        debug_assert_eq!(sym.arity(), args.len());
        Self {
            sym,
            args: SmallVec::from_vec(args),
        }
    }

    /// Number of arguments
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// True if no argument contains a variable
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(BaseTerm::is_ground)
    }

    /// Gather every variable appearing in the arguments
    pub fn collect_variables(&self, out: &mut FxHashSet<Variable>) {
        for arg in &self.args {
            arg.collect_variables(out);
        }
    }

    /// The set of variables appearing in the arguments
    pub fn variables(&self) -> FxHashSet<Variable> {
        let mut out = FxHashSet::default();
        self.collect_variables(&mut out);
        out
    }
}

impl std::fmt::Debug for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// A clause premise
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Positive atom
    Positive(Atom),
    /// Positive atom constrained to / binding a temporal interval
    PositiveAt(Atom, IntervalPattern),
    /// Negated atom (stratified negation-as-failure)
    Negative(Atom),
    /// Equality constraint; binds when one side is a free variable
    Eq(BaseTerm, BaseTerm),
    /// Inequality constraint
    Ineq(BaseTerm, BaseTerm),
    /// Metric temporal operator over an atom
    Temporal(TemporalLiteral),
}

impl Literal {
    /// The underlying atom, if this literal has one
    pub fn atom(&self) -> Option<&Atom> {
        match self {
            Literal::Positive(a) | Literal::PositiveAt(a, _) | Literal::Negative(a) => Some(a),
            Literal::Temporal(t) => Some(&t.atom),
            Literal::Eq(..) | Literal::Ineq(..) => None,
        }
    }

    /// True for plain or interval-annotated positive atoms
    pub fn is_positive(&self) -> bool {
        matches!(self, Literal::Positive(_) | Literal::PositiveAt(..))
    }

    /// True for negated atoms
    pub fn is_negative(&self) -> bool {
        matches!(self, Literal::Negative(_))
    }

    /// Gather every variable appearing in this literal
    pub fn collect_variables(&self, out: &mut FxHashSet<Variable>) {
        match self {
            Literal::Positive(a) | Literal::Negative(a) => a.collect_variables(out),
            Literal::PositiveAt(a, pat) => {
                a.collect_variables(out);
                pat.collect_variables(out);
            }
            Literal::Eq(l, r) | Literal::Ineq(l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
            Literal::Temporal(t) => t.atom.collect_variables(out),
        }
    }
}

/// One `let V = fn:...` statement of a transform pipeline
#[derive(Clone, Debug, PartialEq)]
pub struct LetStmt {
    /// Variable receiving the reducer result
    pub var: Variable,
    /// Reducer application
    pub app: FnApply,
}

/// A head transform: optional leading group-by, then reducer statements
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    /// `do fn:group_by(...)` arguments; `None` groups the whole relation
    pub group_by: Option<FnApply>,
    /// Reducer statements applied per group, in order
    pub lets: Vec<LetStmt>,
}

impl Transform {
    /// Build a transform from the abstract statement sequence of the surface
    /// language: at most one leading `do`, then only `let` statements.
    pub fn from_stmts(stmts: Vec<(Option<Variable>, FnApply)>) -> ModelResult<Transform> {
        let mut group_by = None;
        let mut lets = Vec::new();
        for (i, (var, app)) in stmts.into_iter().enumerate() {
            match var {
                None if i == 0 => group_by = Some(app),
                None => {
                    return Err(ModelError::InvalidTransform(
                        "a do-statement may only appear first".to_string(),
                    ))
                }
                Some(var) => lets.push(LetStmt { var, app }),
            }
        }
        Ok(Transform { group_by, lets })
    }
}

/// A rule `head :- premises` with optional head interval and transform
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    /// Head atom
    pub head: Atom,
    /// Optional temporal annotation attached to derived facts
    pub head_interval: Option<IntervalPattern>,
    /// Premises, evaluated left to right
    pub body: Vec<Literal>,
    /// Optional transform pipeline over the answer relation
    pub transform: Option<Transform>,
}

impl Clause {
    /// A fact: head with an empty body
    pub fn fact(head: Atom) -> Self {
        Self::rule(head, Vec::new())
    }

    /// A plain rule
    pub fn rule(head: Atom, body: Vec<Literal>) -> Self {
        Self {
            head,
            head_interval: None,
            body,
            transform: None,
        }
    }

    /// Attach a transform pipeline
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach a head interval annotation
    pub fn with_interval(mut self, interval: IntervalPattern) -> Self {
        self.head_interval = Some(interval);
        self
    }

    /// True if the body is empty and the head is ground
    pub fn is_fact(&self) -> bool {
        self.body.is_empty() && self.transform.is_none() && self.head.is_ground()
    }

    /// Gather every variable appearing anywhere in the clause
    pub fn collect_variables(&self, out: &mut FxHashSet<Variable>) {
        self.head.collect_variables(out);
        if let Some(pat) = &self.head_interval {
            pat.collect_variables(out);
        }
        for lit in &self.body {
            lit.collect_variables(out);
        }
        if let Some(t) = &self.transform {
            if let Some(g) = &t.group_by {
                g.collect_variables(out);
            }
            for stmt in &t.lets {
                out.insert(stmt.var.clone());
                stmt.app.collect_variables(out);
            }
        }
    }
}
