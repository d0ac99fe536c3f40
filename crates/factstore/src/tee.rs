//! Teeing store: overlay layers over a base store
//!
//! Reads consult the base and every overlay; writes land on the top layer
//! only. Popping a layer discards its facts, restoring the previous state.
//! Interactive sessions use this for checkpoint / pop.

use crate::{FactStore, IndexedInMemoryStore, ReadOnlyFactStore, SimpleInMemoryStore, StoreResult};
use mangle_model::{Atom, PredicateSym};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Layered fact store
#[derive(Clone, Debug, Default)]
pub struct TeeingStore {
    base: IndexedInMemoryStore,
    overlays: Vec<SimpleInMemoryStore>,
}

impl TeeingStore {
    /// Teeing store with no overlays; writes go straight to the base
    pub fn new(base: IndexedInMemoryStore) -> Self {
        Self {
            base,
            overlays: Vec::new(),
        }
    }

    /// The base store
    pub fn base(&self) -> &IndexedInMemoryStore {
        &self.base
    }

    /// Number of overlay layers
    pub fn depth(&self) -> usize {
        self.overlays.len()
    }

    /// Start a new overlay layer; subsequent writes land on it
    pub fn push_layer(&mut self) {
        self.overlays.push(SimpleInMemoryStore::new());
        debug!(depth = self.overlays.len(), "pushed overlay layer");
    }

    /// Discard the top overlay layer, returning its facts
    ///
    /// Returns `None` when no overlay exists (base facts cannot be popped).
    pub fn pop_layer(&mut self) -> Option<SimpleInMemoryStore> {
        let popped = self.overlays.pop();
        if let Some(layer) = &popped {
            debug!(
                discarded = layer.fact_count(),
                depth = self.overlays.len(),
                "popped overlay layer"
            );
        }
        popped
    }

    fn layers(&self) -> impl Iterator<Item = &dyn ReadOnlyFactStore> {
        std::iter::once(&self.base as &dyn ReadOnlyFactStore)
            .chain(self.overlays.iter().map(|o| o as &dyn ReadOnlyFactStore))
    }
}

impl ReadOnlyFactStore for TeeingStore {
    fn get_facts(&self, pattern: &Atom, cb: &mut dyn FnMut(&Atom) -> bool) {
        let mut stopped = false;
        for layer in self.layers() {
            layer.get_facts(pattern, &mut |fact| {
                if cb(fact) {
                    true
                } else {
                    stopped = true;
                    false
                }
            });
            if stopped {
                return;
            }
        }
    }

    fn contains(&self, atom: &Atom) -> bool {
        self.layers().any(|layer| layer.contains(atom))
    }

    fn predicates(&self) -> Vec<PredicateSym> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for layer in self.layers() {
            for sym in layer.predicates() {
                if seen.insert(sym.clone()) {
                    out.push(sym);
                }
            }
        }
        out
    }

    fn fact_count(&self) -> usize {
        self.layers().map(|layer| layer.fact_count()).sum()
    }
}

impl FactStore for TeeingStore {
    fn add(&mut self, atom: Atom) -> StoreResult<bool> {
        if self.overlays.is_empty() {
            return self.base.add(atom);
        }
        // A fact already visible in a lower layer is not new and must not be
        // duplicated into the top layer.
        let top = self.overlays.len() - 1;
        let below = self.base.contains(&atom)
            || self.overlays[..top].iter().any(|layer| layer.contains(&atom));
        if below {
            return Ok(false);
        }
        self.overlays[top].add(atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::{BaseTerm, Constant};

    fn person(n: &str) -> Atom {
        Atom::new(
            "person",
            vec![BaseTerm::Const(Constant::name(n).unwrap())],
        )
    }

    #[test]
    fn test_writes_land_on_top_layer() {
        let mut base = IndexedInMemoryStore::new();
        base.add(person("/alice")).unwrap();

        let mut store = TeeingStore::new(base);
        store.push_layer();
        assert!(store.add(person("/bob")).unwrap());

        assert!(store.contains(&person("/alice")));
        assert!(store.contains(&person("/bob")));
        assert!(!store.base().contains(&person("/bob")));
        assert_eq!(store.fact_count(), 2);
    }

    #[test]
    fn test_pop_restores_previous_state() {
        let mut base = IndexedInMemoryStore::new();
        base.add(person("/alice")).unwrap();

        let mut store = TeeingStore::new(base);
        store.push_layer();
        store.add(person("/bob")).unwrap();
        store.push_layer();
        store.add(person("/carol")).unwrap();
        assert_eq!(store.fact_count(), 3);

        let popped = store.pop_layer().unwrap();
        assert_eq!(popped.fact_count(), 1);
        assert!(!store.contains(&person("/carol")));
        assert!(store.contains(&person("/bob")));

        store.pop_layer().unwrap();
        assert!(!store.contains(&person("/bob")));
        assert!(store.contains(&person("/alice")));
        assert!(store.pop_layer().is_none());
    }

    #[test]
    fn test_duplicate_of_lower_layer_is_not_new() {
        let mut base = IndexedInMemoryStore::new();
        base.add(person("/alice")).unwrap();

        let mut store = TeeingStore::new(base);
        store.push_layer();
        assert!(!store.add(person("/alice")).unwrap());
        let popped = store.pop_layer().unwrap();
        assert!(popped.is_empty());
    }

    #[test]
    fn test_enumeration_spans_layers() {
        let mut base = IndexedInMemoryStore::new();
        base.add(person("/alice")).unwrap();
        let mut store = TeeingStore::new(base);
        store.push_layer();
        store.add(person("/bob")).unwrap();

        let pattern = crate::all_pattern(&PredicateSym::new("person", 1));
        let mut found = Vec::new();
        store.get_facts(&pattern, &mut |fact| {
            found.push(fact.clone());
            true
        });
        assert_eq!(found.len(), 2);
    }
}
