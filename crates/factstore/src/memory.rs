//! In-memory fact stores

use crate::{matches_pattern, FactStore, ReadOnlyFactStore, StoreError, StoreResult};
use mangle_model::{Atom, BaseTerm, PredicateSym};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

/// Plain per-predicate fact sets
///
/// Also serves as the evaluator's per-round delta representation.
#[derive(Clone, Debug, Default)]
pub struct SimpleInMemoryStore {
    facts: FxHashMap<PredicateSym, FxHashSet<Atom>>,
}

impl SimpleInMemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the store holds no facts
    pub fn is_empty(&self) -> bool {
        self.facts.values().all(FxHashSet::is_empty)
    }

    /// Remove every fact
    pub fn clear(&mut self) {
        self.facts.clear();
    }

    /// Iterate over all facts
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.facts.values().flatten()
    }

    /// Iterate over the facts of one predicate
    pub fn atoms_of(&self, sym: &PredicateSym) -> impl Iterator<Item = &Atom> {
        self.facts.get(sym).into_iter().flatten()
    }
}

impl ReadOnlyFactStore for SimpleInMemoryStore {
    fn get_facts(&self, pattern: &Atom, cb: &mut dyn FnMut(&Atom) -> bool) {
        if let Some(set) = self.facts.get(&pattern.sym) {
            for fact in set {
                if matches_pattern(pattern, fact) && !cb(fact) {
                    return;
                }
            }
        }
    }

    fn contains(&self, atom: &Atom) -> bool {
        self.facts
            .get(&atom.sym)
            .is_some_and(|set| set.contains(atom))
    }

    fn predicates(&self) -> Vec<PredicateSym> {
        self.facts
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(sym, _)| sym.clone())
            .collect()
    }

    fn fact_count(&self) -> usize {
        self.facts.values().map(FxHashSet::len).sum()
    }
}

impl FactStore for SimpleInMemoryStore {
    fn add(&mut self, atom: Atom) -> StoreResult<bool> {
        if !atom.is_ground() {
            return Err(StoreError::NonGroundFact(atom.to_string()));
        }
        Ok(self
            .facts
            .entry(atom.sym.clone())
            .or_default()
            .insert(atom))
    }
}

/// Read/write counters for an indexed store
#[derive(Clone, Debug, Default)]
pub struct StoreStats {
    /// Number of lookup operations
    pub reads: u64,
    /// Number of insert operations (including duplicates)
    pub writes: u64,
    /// Current number of stored facts
    pub fact_count: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreStats {{ facts: {}, reads: {}, writes: {} }}",
            self.fact_count, self.reads, self.writes
        )
    }
}

#[derive(Clone, Debug, Default)]
struct PredicateIndex {
    all: FxHashSet<Atom>,
    /// Facts bucketed by the hash of their first argument.
    by_first: FxHashMap<u64, Vec<Atom>>,
}

impl PredicateIndex {
    fn insert(&mut self, atom: Atom) -> bool {
        if !self.all.insert(atom.clone()) {
            return false;
        }
        if let Some(BaseTerm::Const(first)) = atom.args.first() {
            self.by_first
                .entry(first.hash_value())
                .or_default()
                .push(atom);
        }
        true
    }
}

/// Fact store with a per-predicate sub-index on the first argument
///
/// Lookups with a ground first argument scan only the matching bucket.
/// Operation statistics are kept behind a lock so shared references can
/// record reads.
#[derive(Clone, Debug, Default)]
pub struct IndexedInMemoryStore {
    facts: FxHashMap<PredicateSym, PredicateIndex>,
    stats: Arc<RwLock<StoreStats>>,
}

impl IndexedInMemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the operation counters
    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }
}

impl ReadOnlyFactStore for IndexedInMemoryStore {
    fn get_facts(&self, pattern: &Atom, cb: &mut dyn FnMut(&Atom) -> bool) {
        self.stats.write().reads += 1;
        let Some(index) = self.facts.get(&pattern.sym) else {
            return;
        };
        match pattern.args.first() {
            Some(BaseTerm::Const(first)) => {
                if let Some(bucket) = index.by_first.get(&first.hash_value()) {
                    for fact in bucket {
                        if matches_pattern(pattern, fact) && !cb(fact) {
                            return;
                        }
                    }
                }
            }
            _ => {
                for fact in &index.all {
                    if matches_pattern(pattern, fact) && !cb(fact) {
                        return;
                    }
                }
            }
        }
    }

    fn contains(&self, atom: &Atom) -> bool {
        self.facts
            .get(&atom.sym)
            .is_some_and(|index| index.all.contains(atom))
    }

    fn predicates(&self) -> Vec<PredicateSym> {
        self.facts
            .iter()
            .filter(|(_, index)| !index.all.is_empty())
            .map(|(sym, _)| sym.clone())
            .collect()
    }

    fn fact_count(&self) -> usize {
        self.facts.values().map(|index| index.all.len()).sum()
    }
}

impl FactStore for IndexedInMemoryStore {
    fn add(&mut self, atom: Atom) -> StoreResult<bool> {
        if !atom.is_ground() {
            return Err(StoreError::NonGroundFact(atom.to_string()));
        }
        let new = self
            .facts
            .entry(atom.sym.clone())
            .or_default()
            .insert(atom);
        let mut stats = self.stats.write();
        stats.writes += 1;
        if new {
            stats.fact_count += 1;
        }
        Ok(new)
    }
}
