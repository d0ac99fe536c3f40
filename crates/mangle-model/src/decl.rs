//! Predicate declarations: modes, type bounds, inclusion constraints

use crate::constant::Constant;
use crate::term::{Atom, BaseTerm, Literal, PredicateSym, Variable};
use crate::types;

/// Argument mode of one position in a declared mode tuple
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgMode {
    /// `+`: the argument must be bound when the goal is reached
    Input,
    /// `-`: the argument must be a still-free variable
    Output,
    /// `?`: either
    InputOutput,
}

/// One declared mode alternative, one entry per argument position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mode(pub Vec<ArgMode>);

impl Mode {
    /// The all-`?` mode for a given arity
    pub fn any(arity: usize) -> Mode {
        Mode(vec![ArgMode::InputOutput; arity])
    }
}

/// One upper-bound alternative, one bound per argument position
///
/// A bound is either a type name constant (`/any`, `/number`, ...) or a
/// string constant naming a unary predicate, which analysis desugars into an
/// inclusion-constraint alternative.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundDecl {
    /// Per-argument bounds
    pub args: Vec<Constant>,
}

impl BoundDecl {
    /// The all-`/any` bound for a given arity
    pub fn any(arity: usize) -> BoundDecl {
        BoundDecl {
            args: vec![types::any(); arity],
        }
    }
}

/// Inclusion constraint: the declared relation is contained in the union of
/// the alternatives' bodies
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InclusionConstraint {
    /// Alternative premise lists
    pub alternatives: Vec<Vec<Literal>>,
}

/// A predicate declaration
///
/// Created by the analyzer (synthetic or from source), then read-only.
#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    /// Declared head form; arguments are distinct variables
    pub atom: Atom,
    /// Description metadata atoms, e.g. `doc("...")`
    pub descr: Vec<Atom>,
    /// Declared mode alternatives; a goal must satisfy at least one
    pub modes: Vec<Mode>,
    /// Upper-bound alternatives
    pub bounds: Vec<BoundDecl>,
    /// Optional inclusion constraint (also produced by bound desugaring)
    pub constraint: Option<InclusionConstraint>,
    /// True for declarations the analyzer synthesised
    pub synthetic: bool,
}

impl Decl {
    /// Declaration with default modes and bounds
    pub fn new(atom: Atom) -> Decl {
        let arity = atom.arity();
        Decl {
            atom,
            descr: Vec::new(),
            modes: vec![Mode::any(arity)],
            bounds: vec![BoundDecl::any(arity)],
            constraint: None,
            synthetic: false,
        }
    }

    /// Synthetic declaration for an undeclared predicate: all-`?` modes and
    /// `/any` bounds
    pub fn synthetic(sym: PredicateSym) -> Decl {
        let args = (0..sym.arity())
            .map(|i| BaseTerm::Var(Variable::new(format!("X{i}"))))
            .collect();
        let mut decl = Decl::new(Atom::from_sym(sym, args));
        decl.synthetic = true;
        decl
    }

    /// The declared predicate symbol
    pub fn sym(&self) -> &PredicateSym {
        &self.atom.sym
    }

    /// Attach a doc description atom
    pub fn with_doc(mut self, doc: &str) -> Decl {
        self.descr.push(Atom::new(
            "doc",
            vec![BaseTerm::Const(Constant::string(doc))],
        ));
        self
    }

    /// Replace the mode alternatives
    pub fn with_modes(mut self, modes: Vec<Mode>) -> Decl {
        self.modes = modes;
        self
    }

    /// Replace the bound alternatives
    pub fn with_bounds(mut self, bounds: Vec<BoundDecl>) -> Decl {
        self.bounds = bounds;
        self
    }

    /// Concatenated doc strings from the description atoms
    pub fn doc(&self) -> String {
        let mut parts = Vec::new();
        for atom in &self.descr {
            if atom.sym.name() == "doc" {
                for arg in &atom.args {
                    if let BaseTerm::Const(c) = arg {
                        if let Some(s) = c.as_str() {
                            parts.push(s.to_string());
                        }
                    }
                }
            }
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_decl_shape() {
        let decl = Decl::synthetic(PredicateSym::new("foo", 2));
        assert!(decl.synthetic);
        assert_eq!(decl.atom.arity(), 2);
        assert_eq!(decl.modes, vec![Mode::any(2)]);
        assert_eq!(decl.bounds, vec![BoundDecl::any(2)]);
    }

    #[test]
    fn test_doc_accessor() {
        let decl = Decl::new(Atom::new("p", vec![BaseTerm::var("X")]))
            .with_doc("holds for all p")
            .with_doc("see also q");
        assert_eq!(decl.doc(), "holds for all p see also q");
    }
}
