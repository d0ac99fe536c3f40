//! Transform pipelines: group-by plus reducer statements
//!
//! The clause body first materialises the relation of answer substitutions;
//! `fn:group_by` partitions it by the values of the named variables, and each
//! `let` computes its reducer over the current group (or over the whole
//! relation without a group-by). A failing reducer skips the affected group
//! with a warning rather than aborting the stratum.

use crate::{EvalError, EvalResult};
use functional::reduce::eval_reducer;
use mangle_model::{BaseTerm, Constant, SubstMap, SubstPairs, Transform, Variable};
use std::collections::BTreeMap;
use tracing::warn;

fn group_variables(transform: &Transform) -> EvalResult<Vec<Variable>> {
    let Some(group) = &transform.group_by else {
        return Ok(Vec::new());
    };
    group
        .args
        .iter()
        .map(|arg| match arg {
            BaseTerm::Var(v) => Ok(v.clone()),
            other => Err(EvalError::Internal(format!(
                "non-variable group_by argument {other} survived analysis"
            ))),
        })
        .collect()
}

/// Apply a transform pipeline to the answer relation
///
/// Returns one substitution per surviving group, binding the group-by
/// variables to the group key and each `let` variable to its reducer result.
/// Result domains are small and fixed (key variables plus reducer outputs),
/// so the sorted-pair substitution is used.
pub(crate) fn apply(transform: &Transform, rows: Vec<SubstMap>) -> EvalResult<Vec<SubstPairs>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let group_vars = group_variables(transform)?;

    // BTreeMap keyed by the canonical-ordered key tuple keeps group
    // enumeration deterministic.
    let mut groups: BTreeMap<Vec<Constant>, Vec<SubstMap>> = BTreeMap::new();
    if group_vars.is_empty() {
        groups.insert(Vec::new(), rows);
    } else {
        'rows: for row in rows {
            let mut key = Vec::with_capacity(group_vars.len());
            for var in &group_vars {
                match row.get_constant(var) {
                    Some(c) => key.push(c.clone()),
                    None => {
                        warn!(variable = %var, "group_by variable unbound; skipping row");
                        continue 'rows;
                    }
                }
            }
            groups.entry(key).or_default().push(row);
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    'groups: for (key, group_rows) in groups {
        let mut result = SubstPairs::new();
        for (var, value) in group_vars.iter().zip(key) {
            result.bind(var.clone(), BaseTerm::Const(value));
        }
        for stmt in &transform.lets {
            match eval_reducer(&stmt.app, &group_rows) {
                Ok(value) => result.bind(stmt.var.clone(), BaseTerm::Const(value)),
                Err(err) => {
                    warn!(reducer = stmt.app.sym.as_str(), error = %err, "skipping group");
                    continue 'groups;
                }
            }
        }
        out.push(result);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use functional::sym;
    use mangle_model::{FnApply, LetStmt};

    fn sale_row(product: &str, quantity: i64) -> SubstMap {
        let mut row = SubstMap::new();
        row.bind(
            Variable::new("P"),
            BaseTerm::Const(Constant::name(product).unwrap()),
        );
        row.bind(
            Variable::new("Q"),
            BaseTerm::Const(Constant::number(quantity)),
        );
        row
    }

    #[test]
    fn test_group_by_sum() {
        let transform = Transform {
            group_by: Some(FnApply::new(sym::GROUP_BY, vec![BaseTerm::var("P")])),
            lets: vec![LetStmt {
                var: Variable::new("T"),
                app: FnApply::new(sym::SUM, vec![BaseTerm::var("Q")]),
            }],
        };
        let rows = vec![
            sale_row("/apple", 2),
            sale_row("/apple", 3),
            sale_row("/pear", 5),
        ];
        let out = apply(&transform, rows).unwrap();
        assert_eq!(out.len(), 2);
        let apple = out
            .iter()
            .find(|s| s.get_constant(&Variable::new("P")) == Some(&Constant::name("/apple").unwrap()))
            .unwrap();
        assert_eq!(
            apple.get_constant(&Variable::new("T")),
            Some(&Constant::number(5))
        );
    }

    #[test]
    fn test_whole_relation_without_group_by() {
        let transform = Transform {
            group_by: None,
            lets: vec![LetStmt {
                var: Variable::new("N"),
                app: FnApply::new(sym::COUNT, vec![]),
            }],
        };
        let out = apply(&transform, vec![sale_row("/a", 1), sale_row("/b", 2)]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].get_constant(&Variable::new("N")),
            Some(&Constant::number(2))
        );
    }

    #[test]
    fn test_failing_reducer_skips_group() {
        let transform = Transform {
            group_by: Some(FnApply::new(sym::GROUP_BY, vec![BaseTerm::var("P")])),
            lets: vec![LetStmt {
                var: Variable::new("T"),
                // Float reducer over integer rows: a per-group type error.
                app: FnApply::new(sym::FLOAT_SUM, vec![BaseTerm::var("Q")]),
            }],
        };
        let out = apply(&transform, vec![sale_row("/a", 1)]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_relation_yields_nothing() {
        let transform = Transform {
            group_by: None,
            lets: vec![LetStmt {
                var: Variable::new("N"),
                app: FnApply::new(sym::COUNT, vec![]),
            }],
        };
        assert!(apply(&transform, vec![]).unwrap().is_empty());
    }
}
