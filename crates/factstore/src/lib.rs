//! Fact stores for the Mangle engine
//!
//! A fact store is an ordered collection of ground atoms keyed by predicate
//! symbol. This crate provides:
//! - `SimpleInMemoryStore`: plain per-predicate fact sets (also the engine's
//!   per-round delta representation)
//! - `IndexedInMemoryStore`: additionally sub-indexes facts by their first
//!   argument and keeps operation statistics
//! - `TeeingStore`: overlay layers over a base store, so interactive sessions
//!   can checkpoint and pop
//!
//! Stores only ever hold ground atoms; inserting a non-ground atom is an
//! error, never a panic.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;
mod tee;

pub use memory::{IndexedInMemoryStore, SimpleInMemoryStore, StoreStats};
pub use tee::TeeingStore;

use mangle_model::{Atom, BaseTerm, PredicateSym};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by fact stores
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Attempted to insert an atom containing variables
    #[error("cannot store non-ground atom {0}")]
    NonGroundFact(String),
}

/// Read access to a set of ground atoms
pub trait ReadOnlyFactStore {
    /// Enumerate facts whose predicate matches the pattern's and whose ground
    /// argument positions match literally. Variable positions match anything.
    /// The callback returns `false` to stop enumeration early.
    fn get_facts(&self, pattern: &Atom, cb: &mut dyn FnMut(&Atom) -> bool);

    /// True if the ground atom is present
    fn contains(&self, atom: &Atom) -> bool;

    /// Every predicate symbol with at least one fact
    fn predicates(&self) -> Vec<PredicateSym>;

    /// Total number of facts
    fn fact_count(&self) -> usize;
}

/// Read-write access to a set of ground atoms
pub trait FactStore: ReadOnlyFactStore {
    /// Insert a ground atom. Returns `Ok(true)` if the fact is new.
    fn add(&mut self, atom: Atom) -> StoreResult<bool>;

    /// Copy every fact of `other` into this store; returns the number of
    /// facts that were new.
    fn merge(&mut self, other: &dyn ReadOnlyFactStore) -> StoreResult<usize> {
        let mut batch = Vec::new();
        for sym in other.predicates() {
            let pattern = all_pattern(&sym);
            other.get_facts(&pattern, &mut |fact| {
                batch.push(fact.clone());
                true
            });
        }
        let mut added = 0;
        for fact in batch {
            if self.add(fact)? {
                added += 1;
            }
        }
        Ok(added)
    }
}

/// An all-variables pattern matching every fact of `sym`
pub fn all_pattern(sym: &PredicateSym) -> Atom {
    let args = (0..sym.arity())
        .map(|i| BaseTerm::var(format!("X{i}")))
        .collect();
    Atom::from_sym(sym.clone(), args)
}

/// True if `fact` matches the pattern's ground positions literally
pub(crate) fn matches_pattern(pattern: &Atom, fact: &Atom) -> bool {
    if pattern.sym != fact.sym {
        return false;
    }
    pattern.args.iter().zip(fact.args.iter()).all(|(p, f)| match p {
        BaseTerm::Var(_) => true,
        BaseTerm::Const(c) => f.as_constant() == Some(c),
        // Unreduced applications never occur in query patterns.
        BaseTerm::Apply(_) => false,
    })
}
