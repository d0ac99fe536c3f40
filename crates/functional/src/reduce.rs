//! Reduce operators over grouped answer rows
//!
//! A reducer consumes the rows of one group (each row a substitution binding
//! the clause's body variables) and produces a single constant. Collected
//! values are emitted in canonical constant order so results do not depend on
//! row iteration order.

use crate::eval::eval_base_term;
use crate::{sym, FunctionError, FunctionResult};
use mangle_model::{Constant, FnApply, SubstMap};
use std::collections::BTreeSet;

fn tuple_of(mut values: Vec<Constant>) -> Constant {
    match values.len() {
        0 => Constant::empty_list(),
        1 => values.remove(0),
        _ => {
            let mut iter = values.into_iter().rev();
            let mut acc = iter.next().unwrap_or_else(Constant::empty_list);
            for item in iter {
                acc = Constant::pair(item, acc);
            }
            acc
        }
    }
}

/// Evaluate the reducer's argument tuple against one row
fn row_value(app: &FnApply, row: &SubstMap) -> FunctionResult<Constant> {
    let mut values = Vec::with_capacity(app.args.len());
    for arg in &app.args {
        values.push(eval_base_term(arg, row)?);
    }
    Ok(tuple_of(values))
}

fn require_args(app: &FnApply, expected: &'static str, ok: bool) -> FunctionResult<()> {
    if ok {
        Ok(())
    } else {
        Err(FunctionError::arity(
            app.sym.as_str(),
            expected,
            app.args.len(),
        ))
    }
}

fn numbers(app: &FnApply, rows: &[SubstMap]) -> FunctionResult<Vec<i64>> {
    let name = app.sym.as_str();
    rows.iter()
        .map(|row| {
            let value = row_value(app, row)?;
            value
                .as_number()
                .ok_or_else(|| FunctionError::wrong_type(name, "a number", &value))
        })
        .collect()
}

fn floats(app: &FnApply, rows: &[SubstMap]) -> FunctionResult<Vec<f64>> {
    let name = app.sym.as_str();
    rows.iter()
        .map(|row| {
            let value = row_value(app, row)?;
            value
                .as_float()
                .ok_or_else(|| FunctionError::wrong_type(name, "a float", &value))
        })
        .collect()
}

fn nonempty<T>(app: &FnApply, values: Vec<T>) -> FunctionResult<Vec<T>> {
    if values.is_empty() {
        Err(FunctionError::malformed(
            app.sym.as_str(),
            "reducer applied to an empty group",
        ))
    } else {
        Ok(values)
    }
}

/// Apply a reduce operator over the rows of one group
pub fn eval_reducer(app: &FnApply, rows: &[SubstMap]) -> FunctionResult<Constant> {
    let name = app.sym.as_str();
    match name {
        sym::COLLECT => {
            require_args(app, "at least 1", !app.args.is_empty())?;
            let mut values = rows
                .iter()
                .map(|row| row_value(app, row))
                .collect::<FunctionResult<Vec<_>>>()?;
            values.sort();
            Ok(Constant::list(values))
        }
        sym::COLLECT_DISTINCT => {
            require_args(app, "at least 1", !app.args.is_empty())?;
            let values = rows
                .iter()
                .map(|row| row_value(app, row))
                .collect::<FunctionResult<BTreeSet<_>>>()?;
            Ok(Constant::list(values.into_iter().collect()))
        }
        sym::COLLECT_TO_MAP => {
            require_args(app, "2", app.args.len() == 2)?;
            let mut entries = Vec::with_capacity(rows.len());
            for row in rows {
                let key = eval_base_term(&app.args[0], row)?;
                let value = eval_base_term(&app.args[1], row)?;
                entries.push((key, value));
            }
            Ok(Constant::map(entries))
        }
        sym::COUNT => {
            require_args(app, "0", app.args.is_empty())?;
            Ok(Constant::number(rows.len() as i64))
        }
        sym::COUNT_DISTINCT => {
            require_args(app, "at least 1", !app.args.is_empty())?;
            let values = rows
                .iter()
                .map(|row| row_value(app, row))
                .collect::<FunctionResult<BTreeSet<_>>>()?;
            Ok(Constant::number(values.len() as i64))
        }
        sym::SUM => {
            require_args(app, "1", app.args.len() == 1)?;
            let mut acc: i64 = 0;
            for n in numbers(app, rows)? {
                acc = acc
                    .checked_add(n)
                    .ok_or_else(|| FunctionError::Overflow(name.to_string()))?;
            }
            Ok(Constant::number(acc))
        }
        sym::MIN | sym::MAX => {
            require_args(app, "1", app.args.len() == 1)?;
            let values = nonempty(
                app,
                rows.iter()
                    .map(|row| row_value(app, row))
                    .collect::<FunctionResult<Vec<_>>>()?,
            )?;
            let picked = if name == sym::MIN {
                values.into_iter().min()
            } else {
                values.into_iter().max()
            };
            picked.ok_or_else(|| FunctionError::malformed(name, "empty group"))
        }
        sym::AVG => {
            require_args(app, "1", app.args.len() == 1)?;
            let values = nonempty(app, numbers(app, rows)?)?;
            let total: f64 = values.iter().map(|&n| n as f64).sum();
            Ok(Constant::float(total / values.len() as f64))
        }
        sym::FLOAT_SUM => {
            require_args(app, "1", app.args.len() == 1)?;
            Ok(Constant::float(floats(app, rows)?.into_iter().sum()))
        }
        sym::FLOAT_MIN | sym::FLOAT_MAX => {
            require_args(app, "1", app.args.len() == 1)?;
            let values = nonempty(app, floats(app, rows)?)?;
            let picked = if name == sym::FLOAT_MIN {
                values.into_iter().fold(f64::INFINITY, f64::min)
            } else {
                values.into_iter().fold(f64::NEG_INFINITY, f64::max)
            };
            Ok(Constant::float(picked))
        }
        sym::FLOAT_AVG => {
            require_args(app, "1", app.args.len() == 1)?;
            let values = nonempty(app, floats(app, rows)?)?;
            let total: f64 = values.iter().sum();
            Ok(Constant::float(total / values.len() as f64))
        }
        other => Err(FunctionError::UnknownFunction(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_model::{BaseTerm, Variable};

    fn rows_of(values: &[i64]) -> Vec<SubstMap> {
        values
            .iter()
            .map(|&n| {
                let mut row = SubstMap::new();
                row.bind(Variable::new("Q"), BaseTerm::Const(Constant::number(n)));
                row
            })
            .collect()
    }

    fn reducer(name: &str) -> FnApply {
        FnApply::new(name, vec![BaseTerm::var("Q")])
    }

    #[test]
    fn test_count_and_sum() {
        let rows = rows_of(&[2, 3, 5]);
        assert_eq!(
            eval_reducer(&FnApply::new(sym::COUNT, vec![]), &rows).unwrap(),
            Constant::number(3)
        );
        assert_eq!(
            eval_reducer(&reducer(sym::SUM), &rows).unwrap(),
            Constant::number(10)
        );
    }

    #[test]
    fn test_min_max_avg() {
        let rows = rows_of(&[4, 1, 7]);
        assert_eq!(
            eval_reducer(&reducer(sym::MIN), &rows).unwrap(),
            Constant::number(1)
        );
        assert_eq!(
            eval_reducer(&reducer(sym::MAX), &rows).unwrap(),
            Constant::number(7)
        );
        assert_eq!(
            eval_reducer(&reducer(sym::AVG), &rows).unwrap(),
            Constant::float(4.0)
        );
    }

    #[test]
    fn test_collect_is_canonically_ordered() {
        let rows = rows_of(&[5, 2, 2, 9]);
        assert_eq!(
            eval_reducer(&reducer(sym::COLLECT), &rows).unwrap(),
            Constant::list(vec![
                Constant::number(2),
                Constant::number(2),
                Constant::number(5),
                Constant::number(9),
            ])
        );
        assert_eq!(
            eval_reducer(&reducer(sym::COLLECT_DISTINCT), &rows).unwrap(),
            Constant::list(vec![
                Constant::number(2),
                Constant::number(5),
                Constant::number(9),
            ])
        );
        assert_eq!(
            eval_reducer(&reducer(sym::COUNT_DISTINCT), &rows).unwrap(),
            Constant::number(3)
        );
    }

    #[test]
    fn test_collect_to_map() {
        let mut r1 = SubstMap::new();
        r1.bind(
            Variable::new("K"),
            BaseTerm::Const(Constant::name("/a").unwrap()),
        );
        r1.bind(Variable::new("V"), BaseTerm::Const(Constant::number(1)));
        let mut r2 = SubstMap::new();
        r2.bind(
            Variable::new("K"),
            BaseTerm::Const(Constant::name("/b").unwrap()),
        );
        r2.bind(Variable::new("V"), BaseTerm::Const(Constant::number(2)));

        let app = FnApply::new(
            sym::COLLECT_TO_MAP,
            vec![BaseTerm::var("K"), BaseTerm::var("V")],
        );
        let m = eval_reducer(&app, &[r1, r2]).unwrap();
        assert_eq!(
            m.get_entry(&Constant::name("/a").unwrap()),
            Some(&Constant::number(1))
        );
        assert_eq!(
            m.get_entry(&Constant::name("/b").unwrap()),
            Some(&Constant::number(2))
        );
    }

    #[test]
    fn test_float_variants() {
        let rows: Vec<SubstMap> = [1.5, 2.5]
            .iter()
            .map(|&f| {
                let mut row = SubstMap::new();
                row.bind(Variable::new("Q"), BaseTerm::Const(Constant::float(f)));
                row
            })
            .collect();
        assert_eq!(
            eval_reducer(&reducer(sym::FLOAT_SUM), &rows).unwrap(),
            Constant::float(4.0)
        );
        assert_eq!(
            eval_reducer(&reducer(sym::FLOAT_AVG), &rows).unwrap(),
            Constant::float(2.0)
        );
        assert_eq!(
            eval_reducer(&reducer(sym::FLOAT_MAX), &rows).unwrap(),
            Constant::float(2.5)
        );
    }

    #[test]
    fn test_type_error_propagates() {
        let rows = rows_of(&[1]);
        assert!(matches!(
            eval_reducer(&reducer(sym::FLOAT_SUM), &rows),
            Err(FunctionError::WrongType { .. })
        ));
    }

    #[test]
    fn test_multi_arg_collect_builds_tuples() {
        let mut row = SubstMap::new();
        row.bind(Variable::new("A"), BaseTerm::Const(Constant::number(1)));
        row.bind(Variable::new("B"), BaseTerm::Const(Constant::number(2)));
        let app = FnApply::new(
            sym::COLLECT,
            vec![BaseTerm::var("A"), BaseTerm::var("B")],
        );
        assert_eq!(
            eval_reducer(&app, &[row]).unwrap(),
            Constant::list(vec![Constant::pair(
                Constant::number(1),
                Constant::number(2)
            )])
        );
    }
}
