//! The analyzed program: declarations, rules, strata

use mangle_model::{Atom, Clause, Decl, PredicateSym};
use rustc_hash::{FxHashMap, FxHashSet};

/// One parsed source unit: declarations and clauses
///
/// Package and use directives of the surface language are resolved by the
/// parser collaborator; the analyzer only sees the flattened unit.
#[derive(Clone, Debug, Default)]
pub struct Unit {
    /// Explicit declarations
    pub decls: Vec<Decl>,
    /// Facts and rules
    pub clauses: Vec<Clause>,
}

/// Immediate dependencies of one predicate, split by polarity
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PredicateDeps {
    /// Predicates this one depends on through plain or temporal atoms
    pub positive: FxHashSet<PredicateSym>,
    /// Predicates this one depends on through negation or through an
    /// aggregating transform
    pub negative: FxHashSet<PredicateSym>,
}

/// The bound program produced by analysis, read-only afterwards
#[derive(Clone, Debug, Default)]
pub struct ProgramInfo {
    /// Declarations by predicate symbol (synthetic or explicit), at the
    /// predicate's declared (non-lowered) arity
    pub decls: FxHashMap<PredicateSym, Decl>,
    /// Ground facts declared by the program, temporal facts already lowered
    pub initial_facts: Vec<Atom>,
    /// Rules grouped by (lowered) head predicate
    pub rules: FxHashMap<PredicateSym, Vec<Clause>>,
    /// Predicates per stratum, ascending
    pub strata: Vec<Vec<PredicateSym>>,
    /// Stratum index per (lowered) predicate
    pub stratum_of: FxHashMap<PredicateSym, usize>,
    /// Dependency sets per (lowered) predicate
    pub deps: FxHashMap<PredicateSym, PredicateDeps>,
    /// Predicates carrying temporal intervals, at their declared arity;
    /// their facts are stored with two appended instant arguments
    pub temporal: FxHashSet<PredicateSym>,
}

impl ProgramInfo {
    /// True if the predicate's facts carry a temporal interval
    pub fn is_temporal(&self, sym: &PredicateSym) -> bool {
        self.temporal.contains(sym)
    }

    /// The storage symbol for a predicate: arity + 2 for temporal predicates
    pub fn lowered_sym(&self, sym: &PredicateSym) -> PredicateSym {
        if self.is_temporal(sym) {
            sym.with_arity(sym.arity() + 2)
        } else {
            sym.clone()
        }
    }

    /// The (lowered) predicate a clause defines
    pub fn head_sym(&self, clause: &Clause) -> PredicateSym {
        self.lowered_sym(&clause.head.sym)
    }

    /// The declaration for a predicate, if any
    pub fn decl(&self, sym: &PredicateSym) -> Option<&Decl> {
        self.decls.get(sym)
    }

    /// Human-readable signature and doc line for a predicate
    pub fn signature(&self, sym: &PredicateSym) -> Option<String> {
        let decl = self.decls.get(sym)?;
        let doc = decl.doc();
        if doc.is_empty() {
            Some(decl.atom.to_string())
        } else {
            Some(format!("{} — {}", decl.atom, doc))
        }
    }

    /// All rules defining one (lowered) predicate
    pub fn rules_of(&self, sym: &PredicateSym) -> &[Clause] {
        self.rules.get(sym).map(Vec::as_slice).unwrap_or(&[])
    }
}
