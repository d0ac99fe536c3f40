//! Metric temporal operator evaluation
//!
//! Temporal atoms were lowered at analysis time: their last two arguments are
//! the fact's interval endpoints. Diamond operators hold when some matching
//! fact's interval overlaps the window; box operators hold when the union of
//! matching fact intervals covers the whole window.

use factstore::ReadOnlyFactStore;
use mangle_model::{match_atom, match_term, Atom, Constant, Interval, SubstMap, TemporalLiteral};
use std::collections::BTreeMap;
use tracing::warn;

/// Union coverage: true if `intervals` jointly cover every instant of
/// `window`
pub(crate) fn covers(window: Interval, intervals: &mut Vec<Interval>) -> bool {
    intervals.sort();
    let mut cursor = window.start;
    for interval in intervals.iter() {
        if interval.start > cursor {
            return false;
        }
        if interval.end >= window.end {
            return true;
        }
        if interval.end >= cursor {
            cursor = interval.end.saturating_add(1);
        }
    }
    false
}

fn fact_interval(fact: &Atom, split: usize) -> Option<Interval> {
    let start = fact.args.get(split)?.as_constant()?.as_time()?;
    let end = fact.args.get(split + 1)?.as_constant()?.as_time()?;
    Some(Interval::new(start, end))
}

/// Evaluate a temporal literal over the substitution frontier
///
/// For each incoming substitution, matching facts are grouped by their
/// non-interval arguments; each group that satisfies the operator over the
/// resolved window contributes one extended substitution.
pub(crate) fn eval_temporal<S: ReadOnlyFactStore + ?Sized>(
    lit: &TemporalLiteral,
    substs: Vec<SubstMap>,
    store: &S,
    now: i64,
) -> Vec<SubstMap> {
    let window = lit.window.resolve(lit.op, now);
    let split = lit.atom.args.len().saturating_sub(2);
    let mut out = Vec::new();

    for subst in substs {
        let pattern = lit.atom.apply_subst(&subst);
        let mut groups: BTreeMap<Vec<Constant>, Vec<Interval>> = BTreeMap::new();
        store.get_facts(&pattern, &mut |fact| {
            if match_atom(&pattern, fact, &subst).is_some() {
                let prefix: Option<Vec<Constant>> = fact.args[..split]
                    .iter()
                    .map(|a| a.as_constant().cloned())
                    .collect();
                match (prefix, fact_interval(fact, split)) {
                    (Some(prefix), Some(interval)) => {
                        groups.entry(prefix).or_default().push(interval);
                    }
                    _ => warn!(fact = %fact, "temporal fact without interval endpoints"),
                }
            }
            true
        });

        for (prefix, mut intervals) in groups {
            let holds = if lit.op.is_box() {
                covers(window, &mut intervals)
            } else {
                intervals.iter().any(|iv| iv.overlaps(&window))
            };
            if !holds {
                continue;
            }
            // Bind the atom's argument variables to this group's values; the
            // interval endpoint variables stay free (they are fresh and
            // private to the lowering).
            let mut extended = subst.clone();
            let matched = pattern.args[..split]
                .iter()
                .zip(prefix.iter())
                .all(|(p, c)| match_term(p, c, &mut extended));
            if matched {
                out.push(extended);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_contiguous() {
        let window = Interval::new(0, 100);
        let mut intervals = vec![Interval::new(50, 100), Interval::new(0, 49)];
        assert!(covers(window, &mut intervals));
    }

    #[test]
    fn test_covers_gap() {
        let window = Interval::new(0, 100);
        let mut intervals = vec![Interval::new(0, 40), Interval::new(42, 100)];
        assert!(!covers(window, &mut intervals));
    }

    #[test]
    fn test_covers_overlapping_and_superset() {
        let window = Interval::new(10, 20);
        let mut intervals = vec![Interval::new(0, 15), Interval::new(12, 30)];
        assert!(covers(window, &mut intervals));
        let mut none: Vec<Interval> = vec![];
        assert!(!covers(window, &mut none));
    }

    #[test]
    fn test_covers_single_instant() {
        let window = Interval::new(5, 5);
        let mut intervals = vec![Interval::new(5, 5)];
        assert!(covers(window, &mut intervals));
    }
}
