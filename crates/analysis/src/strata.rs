//! Dependency graph, strongly connected components, stratification
//!
//! Nodes are (lowered) predicate symbols. Edges run from a rule's head to
//! each body predicate, tagged negative when they arise from a negated atom
//! or from an aggregating transform. An SCC containing an internal negative
//! edge makes the program non-stratifiable; otherwise strata follow the
//! condensation in topological order, incrementing across negative edges.

use crate::{AnalysisError, AnalysisResult, PredicateDeps};
use mangle_model::{Clause, Literal, PredicateSym};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

type Graph = FxHashMap<PredicateSym, Vec<(PredicateSym, bool)>>;

fn build_graph(rules: &FxHashMap<PredicateSym, Vec<Clause>>) -> Graph {
    let mut graph: Graph = FxHashMap::default();
    for (head, clauses) in rules {
        let edges = graph.entry(head.clone()).or_default();
        for clause in clauses {
            let aggregating = clause.transform.is_some();
            for lit in &clause.body {
                match lit {
                    Literal::Positive(atom) | Literal::PositiveAt(atom, _) => {
                        edges.push((atom.sym.clone(), aggregating));
                    }
                    Literal::Temporal(t) => {
                        edges.push((t.atom.sym.clone(), aggregating));
                    }
                    Literal::Negative(atom) => {
                        edges.push((atom.sym.clone(), true));
                    }
                    Literal::Eq(..) | Literal::Ineq(..) => {}
                }
            }
        }
    }
    // Every referenced predicate is a node, even pure EDB ones.
    let targets: Vec<PredicateSym> = graph
        .values()
        .flatten()
        .map(|(sym, _)| sym.clone())
        .collect();
    for sym in targets {
        graph.entry(sym).or_default();
    }
    graph
}

struct Tarjan<'a> {
    graph: &'a Graph,
    index: FxHashMap<PredicateSym, usize>,
    lowlink: FxHashMap<PredicateSym, usize>,
    on_stack: FxHashSet<PredicateSym>,
    stack: Vec<PredicateSym>,
    next_index: usize,
    /// Components in reverse topological order: every successor component of
    /// a component is emitted before it.
    components: Vec<Vec<PredicateSym>>,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            index: FxHashMap::default(),
            lowlink: FxHashMap::default(),
            on_stack: FxHashSet::default(),
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Vec<PredicateSym>> {
        let mut nodes: Vec<&PredicateSym> = self.graph.keys().collect();
        nodes.sort();
        for node in nodes {
            if !self.index.contains_key(node) {
                self.connect(node);
            }
        }
        self.components
    }

    fn connect(&mut self, v: &PredicateSym) {
        self.index.insert(v.clone(), self.next_index);
        self.lowlink.insert(v.clone(), self.next_index);
        self.next_index += 1;
        self.stack.push(v.clone());
        self.on_stack.insert(v.clone());

        let graph = self.graph;
        if let Some(edges) = graph.get(v) {
            for (w, _) in edges {
                if !self.index.contains_key(w) {
                    self.connect(w);
                    let w_low = self.lowlink[w];
                    let v_low = self.lowlink[v];
                    self.lowlink.insert(v.clone(), v_low.min(w_low));
                } else if self.on_stack.contains(w) {
                    let w_index = self.index[w];
                    let v_low = self.lowlink[v];
                    self.lowlink.insert(v.clone(), v_low.min(w_index));
                }
            }
        }

        if self.lowlink[v] == self.index[v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.remove(&w);
                let done = w == *v;
                component.push(w);
                if done {
                    break;
                }
            }
            component.sort();
            self.components.push(component);
        }
    }
}

/// Stratify the rule set
///
/// Returns predicates grouped per stratum, the stratum index of each
/// predicate, and the split dependency sets.
#[allow(clippy::type_complexity)]
pub fn stratify(
    rules: &FxHashMap<PredicateSym, Vec<Clause>>,
) -> AnalysisResult<(
    Vec<Vec<PredicateSym>>,
    FxHashMap<PredicateSym, usize>,
    FxHashMap<PredicateSym, PredicateDeps>,
)> {
    let graph = build_graph(rules);
    let components = Tarjan::new(&graph).run();

    let mut component_of: FxHashMap<PredicateSym, usize> = FxHashMap::default();
    for (ci, component) in components.iter().enumerate() {
        for sym in component {
            component_of.insert(sym.clone(), ci);
        }
    }

    let mut component_stratum = vec![0usize; components.len()];
    for (ci, component) in components.iter().enumerate() {
        let mut stratum = 0;
        for sym in component {
            if let Some(edges) = graph.get(sym) {
                for (dep, negative) in edges {
                    let dep_component = component_of[dep];
                    if dep_component == ci {
                        if *negative {
                            return Err(AnalysisError::NonStratifiable(
                                sym.name().to_string(),
                            ));
                        }
                    } else {
                        // Successor components were emitted earlier, so their
                        // stratum is already final.
                        let dep_stratum = component_stratum[dep_component]
                            + usize::from(*negative);
                        stratum = stratum.max(dep_stratum);
                    }
                }
            }
        }
        component_stratum[ci] = stratum;
    }

    let mut stratum_of: FxHashMap<PredicateSym, usize> = FxHashMap::default();
    let stratum_count = component_stratum.iter().max().map_or(0, |m| m + 1);
    let mut strata: Vec<Vec<PredicateSym>> = vec![Vec::new(); stratum_count];
    for (ci, component) in components.iter().enumerate() {
        for sym in component {
            stratum_of.insert(sym.clone(), component_stratum[ci]);
            strata[component_stratum[ci]].push(sym.clone());
        }
    }
    for bucket in &mut strata {
        bucket.sort();
    }

    let mut deps: FxHashMap<PredicateSym, PredicateDeps> = FxHashMap::default();
    for (sym, edges) in &graph {
        let entry = deps.entry(sym.clone()).or_default();
        for (dep, negative) in edges {
            if *negative {
                entry.negative.insert(dep.clone());
            } else {
                entry.positive.insert(dep.clone());
            }
        }
    }

    debug!(components = components.len(), strata = strata.len(), "stratified");
    Ok((strata, stratum_of, deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::{Atom, BaseTerm};

    fn rule(head: &str, body: Vec<Literal>) -> (PredicateSym, Clause) {
        let clause = Clause::rule(Atom::new(head, vec![BaseTerm::var("X")]), body);
        (clause.head.sym.clone(), clause)
    }

    fn pos(name: &str) -> Literal {
        Literal::Positive(Atom::new(name, vec![BaseTerm::var("X")]))
    }

    fn neg(name: &str) -> Literal {
        Literal::Negative(Atom::new(name, vec![BaseTerm::var("X")]))
    }

    fn rules_of(items: Vec<(PredicateSym, Clause)>) -> FxHashMap<PredicateSym, Vec<Clause>> {
        let mut out: FxHashMap<PredicateSym, Vec<Clause>> = FxHashMap::default();
        for (sym, clause) in items {
            out.entry(sym).or_default().push(clause);
        }
        out
    }

    #[test]
    fn test_positive_recursion_single_stratum() {
        let rules = rules_of(vec![
            rule("reach", vec![pos("edge")]),
            rule("reach", vec![pos("edge"), pos("reach")]),
        ]);
        let (strata, stratum_of, _) = stratify(&rules).unwrap();
        assert_eq!(strata.len(), 1);
        assert_eq!(stratum_of[&PredicateSym::new("reach", 1)], 0);
        assert_eq!(stratum_of[&PredicateSym::new("edge", 1)], 0);
    }

    #[test]
    fn test_negation_forces_higher_stratum() {
        let rules = rules_of(vec![
            rule("hasChild", vec![pos("parent")]),
            rule("childless", vec![pos("person"), neg("hasChild")]),
        ]);
        let (_, stratum_of, deps) = stratify(&rules).unwrap();
        let childless = PredicateSym::new("childless", 1);
        let has_child = PredicateSym::new("hasChild", 1);
        assert!(stratum_of[&childless] > stratum_of[&has_child]);
        assert!(deps[&childless].negative.contains(&has_child));
        assert!(deps[&childless].positive.contains(&PredicateSym::new("person", 1)));
    }

    #[test]
    fn test_negative_cycle_rejected() {
        // p(X) :- !q(X). q(X) :- !p(X).
        let rules = rules_of(vec![
            rule("p", vec![pos("s"), neg("q")]),
            rule("q", vec![pos("s"), neg("p")]),
        ]);
        assert!(matches!(
            stratify(&rules),
            Err(AnalysisError::NonStratifiable(_))
        ));
    }

    #[test]
    fn test_transform_counts_as_negative_dependency() {
        let mut clause = Clause::rule(
            Atom::new("total", vec![BaseTerm::var("T")]),
            vec![pos("sale")],
        );
        clause.transform = Some(mangle_model::Transform {
            group_by: None,
            lets: vec![],
        });
        let rules = rules_of(vec![(clause.head.sym.clone(), clause)]);
        let (_, stratum_of, _) = stratify(&rules).unwrap();
        assert!(stratum_of[&PredicateSym::new("total", 1)] > stratum_of[&PredicateSym::new("sale", 1)]);
    }
}
