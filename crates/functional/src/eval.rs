//! Evaluation of `fn:` expressions
//!
//! `eval_apply_fn` recursively evaluates every argument to a ground constant
//! under the given substitution, then dispatches on the function symbol.

use crate::{sym, time, FunctionError, FunctionResult};
use mangle_model::{types, BaseTerm, Constant, ConstantKind, FnApply, Subst};

/// Evaluate a base term to a ground constant
///
/// Variables resolve through the substitution; unbound variables are an
/// error. Function applications evaluate recursively.
pub fn eval_base_term<S: Subst + ?Sized>(term: &BaseTerm, subst: &S) -> FunctionResult<Constant> {
    match term {
        BaseTerm::Const(c) => Ok(c.clone()),
        BaseTerm::Var(v) => match subst.get(v) {
            Some(bound) => eval_base_term(bound, subst),
            None => Err(FunctionError::UnboundVariable {
                function: "eval".to_string(),
                variable: v.name().to_string(),
            }),
        },
        BaseTerm::Apply(app) => eval_apply_fn(app, subst),
    }
}

/// Evaluate a function application to a ground constant
pub fn eval_apply_fn<S: Subst + ?Sized>(app: &FnApply, subst: &S) -> FunctionResult<Constant> {
    let mut args = Vec::with_capacity(app.args.len());
    for arg in &app.args {
        args.push(eval_base_term(arg, subst)?);
    }
    dispatch(app.sym.as_str(), &args)
}

fn expect_arity(function: &str, args: &[Constant], n: usize) -> FunctionResult<()> {
    if args.len() == n {
        Ok(())
    } else {
        let expected: &'static str = match n {
            0 => "0",
            1 => "1",
            2 => "2",
            3 => "3",
            _ => "more",
        };
        Err(FunctionError::arity(function, expected, args.len()))
    }
}

fn expect_number(function: &str, c: &Constant) -> FunctionResult<i64> {
    c.as_number()
        .ok_or_else(|| FunctionError::wrong_type(function, "a number", c))
}

fn expect_float(function: &str, c: &Constant) -> FunctionResult<f64> {
    c.as_float()
        .ok_or_else(|| FunctionError::wrong_type(function, "a float", c))
}

fn expect_string<'a>(function: &str, c: &'a Constant) -> FunctionResult<&'a str> {
    c.as_str()
        .ok_or_else(|| FunctionError::wrong_type(function, "a string", c))
}

fn expect_name<'a>(function: &str, c: &'a Constant) -> FunctionResult<&'a str> {
    c.as_name()
        .ok_or_else(|| FunctionError::wrong_type(function, "a name", c))
}

fn expect_time(function: &str, c: &Constant) -> FunctionResult<i64> {
    c.as_time()
        .ok_or_else(|| FunctionError::wrong_type(function, "a time", c))
}

fn expect_duration(function: &str, c: &Constant) -> FunctionResult<i64> {
    c.as_duration()
        .ok_or_else(|| FunctionError::wrong_type(function, "a duration", c))
}

fn expect_list<'a>(function: &str, c: &'a Constant) -> FunctionResult<&'a [Constant]> {
    c.list_items()
        .ok_or_else(|| FunctionError::wrong_type(function, "a list", c))
}

fn make_name(function: &str, path: String) -> FunctionResult<Constant> {
    Constant::name(path).map_err(|e| FunctionError::malformed(function, e.to_string()))
}

fn checked<T>(function: &str, value: Option<T>) -> FunctionResult<T> {
    value.ok_or_else(|| FunctionError::Overflow(function.to_string()))
}

fn int_fold(
    function: &str,
    args: &[Constant],
    op: impl Fn(i64, i64) -> FunctionResult<i64>,
) -> FunctionResult<Constant> {
    if args.is_empty() {
        return Err(FunctionError::arity(function, "at least 1", 0));
    }
    let mut acc = expect_number(function, &args[0])?;
    for arg in &args[1..] {
        acc = op(acc, expect_number(function, arg)?)?;
    }
    Ok(Constant::number(acc))
}

fn float_fold(
    function: &str,
    args: &[Constant],
    op: impl Fn(f64, f64) -> f64,
) -> FunctionResult<Constant> {
    if args.is_empty() {
        return Err(FunctionError::arity(function, "at least 1", 0));
    }
    let mut acc = expect_float(function, &args[0])?;
    for arg in &args[1..] {
        acc = op(acc, expect_float(function, arg)?);
    }
    Ok(Constant::float(acc))
}

fn key_value_pairs(function: &str, args: &[Constant]) -> FunctionResult<Vec<(Constant, Constant)>> {
    if args.len() % 2 != 0 {
        return Err(FunctionError::arity(function, "an even count", args.len()));
    }
    Ok(args
        .chunks_exact(2)
        .map(|kv| (kv[0].clone(), kv[1].clone()))
        .collect())
}

fn stringify(function: &str, c: &Constant) -> FunctionResult<String> {
    match c.kind() {
        ConstantKind::String => Ok(c.as_str().map(str::to_string).unwrap_or_default()),
        ConstantKind::Number | ConstantKind::Float64 => Ok(c.to_string()),
        ConstantKind::Name => Ok(c.as_name().map(str::to_string).unwrap_or_default()),
        _ => Err(FunctionError::wrong_type(
            function,
            "a string, number, float or name",
            c,
        )),
    }
}

fn interval_endpoints(function: &str, c: &Constant) -> FunctionResult<(i64, i64)> {
    let (start, end) = c
        .as_pair()
        .ok_or_else(|| FunctionError::wrong_type(function, "an interval pair", c))?;
    Ok((expect_time(function, start)?, expect_time(function, end)?))
}

fn dispatch(name: &str, args: &[Constant]) -> FunctionResult<Constant> {
    match name {
        // Containers
        sym::LIST => Ok(Constant::list(args.to_vec())),
        sym::CONS => {
            expect_arity(name, args, 2)?;
            let tail = expect_list(name, &args[1])?;
            let mut items = Vec::with_capacity(tail.len() + 1);
            items.push(args[0].clone());
            items.extend_from_slice(tail);
            Ok(Constant::list(items))
        }
        sym::APPEND => {
            expect_arity(name, args, 2)?;
            let mut items = expect_list(name, &args[0])?.to_vec();
            items.push(args[1].clone());
            Ok(Constant::list(items))
        }
        sym::LEN => {
            expect_arity(name, args, 1)?;
            Ok(Constant::number(expect_list(name, &args[0])?.len() as i64))
        }
        sym::LIST_GET => {
            expect_arity(name, args, 2)?;
            let items = expect_list(name, &args[0])?;
            let index = expect_number(name, &args[1])?;
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or(FunctionError::IndexOutOfBounds {
                    function: name.to_string(),
                    index,
                })
        }
        sym::LIST_CONTAINS => {
            expect_arity(name, args, 2)?;
            let items = expect_list(name, &args[0])?;
            Ok(types::bool_const(items.contains(&args[1])))
        }
        sym::PAIR => {
            expect_arity(name, args, 2)?;
            Ok(Constant::pair(args[0].clone(), args[1].clone()))
        }
        sym::TUPLE => match args {
            [] => Err(FunctionError::arity(name, "at least 1", 0)),
            [single] => Ok(single.clone()),
            _ => {
                let mut iter = args.iter().rev();
                let mut acc = iter.next().cloned().unwrap_or_else(Constant::empty_list);
                for item in iter {
                    acc = Constant::pair(item.clone(), acc);
                }
                Ok(acc)
            }
        },
        sym::MAP => Ok(Constant::map(key_value_pairs(name, args)?)),
        sym::STRUCT => Ok(Constant::struct_(key_value_pairs(name, args)?)),
        sym::MAP_GET | sym::STRUCT_GET => {
            expect_arity(name, args, 2)?;
            let wanted = if name == sym::MAP_GET {
                ConstantKind::Map
            } else {
                ConstantKind::Struct
            };
            if args[0].kind() != wanted {
                return Err(FunctionError::wrong_type(
                    name,
                    if wanted == ConstantKind::Map { "a map" } else { "a struct" },
                    &args[0],
                ));
            }
            args[0]
                .get_entry(&args[1])
                .cloned()
                .ok_or_else(|| FunctionError::KeyNotFound {
                    function: name.to_string(),
                    key: args[1].to_string(),
                })
        }

        // Integer arithmetic
        sym::PLUS => int_fold(name, args, |a, b| checked(name, a.checked_add(b))),
        sym::MINUS => {
            if args.len() == 1 {
                let n = expect_number(name, &args[0])?;
                Ok(Constant::number(checked(name, n.checked_neg())?))
            } else {
                int_fold(name, args, |a, b| checked(name, a.checked_sub(b)))
            }
        }
        sym::MULT => int_fold(name, args, |a, b| checked(name, a.checked_mul(b))),
        sym::DIV => {
            if args.len() < 2 {
                return Err(FunctionError::arity(name, "at least 2", args.len()));
            }
            int_fold(name, args, |a, b| {
                if b == 0 {
                    Err(FunctionError::DivisionByZero(name.to_string()))
                } else {
                    checked(name, a.checked_div(b))
                }
            })
        }

        // Float arithmetic
        sym::FLOAT_PLUS => float_fold(name, args, |a, b| a + b),
        sym::FLOAT_MULT => float_fold(name, args, |a, b| a * b),
        sym::FLOAT_DIV => {
            if args.len() < 2 {
                return Err(FunctionError::arity(name, "at least 2", args.len()));
            }
            float_fold(name, args, |a, b| a / b)
        }
        sym::SQRT => {
            expect_arity(name, args, 1)?;
            Ok(Constant::float(expect_float(name, &args[0])?.sqrt()))
        }

        // Conversions and string helpers
        sym::NUMBER_TO_STRING => {
            expect_arity(name, args, 1)?;
            Ok(Constant::string(
                expect_number(name, &args[0])?.to_string(),
            ))
        }
        sym::FLOAT64_TO_STRING => {
            expect_arity(name, args, 1)?;
            expect_float(name, &args[0])?;
            Ok(Constant::string(args[0].to_string()))
        }
        sym::NAME_TO_STRING => {
            expect_arity(name, args, 1)?;
            Ok(Constant::string(expect_name(name, &args[0])?))
        }
        sym::NAME_ROOT => {
            expect_arity(name, args, 1)?;
            expect_name(name, &args[0])?;
            let segments = args[0].name_segments().unwrap_or_default();
            let root = segments
                .first()
                .ok_or_else(|| FunctionError::malformed(name, "empty name"))?;
            make_name(name, format!("/{root}"))
        }
        sym::NAME_TIP => {
            expect_arity(name, args, 1)?;
            expect_name(name, &args[0])?;
            let segments = args[0].name_segments().unwrap_or_default();
            let tip = segments
                .last()
                .ok_or_else(|| FunctionError::malformed(name, "empty name"))?;
            make_name(name, format!("/{tip}"))
        }
        sym::NAME_LIST => {
            expect_arity(name, args, 1)?;
            expect_name(name, &args[0])?;
            let segments = args[0].name_segments().unwrap_or_default();
            let items = segments
                .iter()
                .map(|seg| make_name(name, format!("/{seg}")))
                .collect::<FunctionResult<Vec<_>>>()?;
            Ok(Constant::list(items))
        }
        sym::STRING_CONCATENATE => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&stringify(name, arg)?);
            }
            Ok(Constant::string(out))
        }
        sym::STRING_REPLACE => {
            expect_arity(name, args, 3)?;
            let s = expect_string(name, &args[0])?;
            let from = expect_string(name, &args[1])?;
            let to = expect_string(name, &args[2])?;
            Ok(Constant::string(s.replace(from, to)))
        }

        // Time
        sym::TIME_NOW => {
            expect_arity(name, args, 0)?;
            Ok(Constant::time(time::now_nanos()?))
        }
        sym::TIME_ADD => {
            expect_arity(name, args, 2)?;
            let t = expect_time(name, &args[0])?;
            let d = expect_duration(name, &args[1])?;
            Ok(Constant::time(checked(name, t.checked_add(d))?))
        }
        sym::TIME_SUB => {
            expect_arity(name, args, 2)?;
            let t1 = expect_time(name, &args[0])?;
            let t2 = expect_time(name, &args[1])?;
            Ok(Constant::duration(checked(name, t1.checked_sub(t2))?))
        }
        sym::TIME_FORMAT => {
            expect_arity(name, args, 2)?;
            let t = expect_time(name, &args[0])?;
            let precision = expect_name(name, &args[1])?;
            Ok(Constant::string(time::format(t, precision)?))
        }
        sym::TIME_FORMAT_CIVIL => {
            expect_arity(name, args, 3)?;
            let t = expect_time(name, &args[0])?;
            let tz = expect_string(name, &args[1])?;
            let precision = expect_name(name, &args[2])?;
            Ok(Constant::string(time::format_civil(t, tz, precision)?))
        }
        sym::TIME_PARSE_RFC3339 => {
            expect_arity(name, args, 1)?;
            Ok(Constant::time(time::parse_rfc3339(expect_string(
                name, &args[0],
            )?)?))
        }
        sym::TIME_PARSE_CIVIL => {
            expect_arity(name, args, 2)?;
            let s = expect_string(name, &args[0])?;
            let tz = expect_string(name, &args[1])?;
            Ok(Constant::time(time::parse_civil(s, tz)?))
        }
        sym::TIME_YEAR
        | sym::TIME_MONTH
        | sym::TIME_DAY
        | sym::TIME_HOUR
        | sym::TIME_MINUTE
        | sym::TIME_SECOND => {
            expect_arity(name, args, 1)?;
            let t = expect_time(name, &args[0])?;
            Ok(Constant::number(time::civil_field(t, name)))
        }
        sym::TIME_TO_UNIX_NANOS => {
            expect_arity(name, args, 1)?;
            Ok(Constant::number(expect_time(name, &args[0])?))
        }
        sym::TIME_FROM_UNIX_NANOS => {
            expect_arity(name, args, 1)?;
            Ok(Constant::time(expect_number(name, &args[0])?))
        }
        sym::TIME_TRUNC => {
            expect_arity(name, args, 2)?;
            let t = expect_time(name, &args[0])?;
            let unit = expect_name(name, &args[1])?;
            Ok(Constant::time(time::trunc(t, unit)?))
        }

        // Duration
        sym::DURATION_ADD => {
            expect_arity(name, args, 2)?;
            let d1 = expect_duration(name, &args[0])?;
            let d2 = expect_duration(name, &args[1])?;
            Ok(Constant::duration(checked(name, d1.checked_add(d2))?))
        }
        sym::DURATION_MULT => {
            expect_arity(name, args, 2)?;
            let d = expect_duration(name, &args[0])?;
            let n = expect_number(name, &args[1])?;
            Ok(Constant::duration(checked(name, d.checked_mul(n))?))
        }
        sym::DURATION_HOURS => {
            expect_arity(name, args, 1)?;
            Ok(Constant::number(
                expect_duration(name, &args[0])? / 3_600_000_000_000,
            ))
        }
        sym::DURATION_MINUTES => {
            expect_arity(name, args, 1)?;
            Ok(Constant::number(
                expect_duration(name, &args[0])? / 60_000_000_000,
            ))
        }
        sym::DURATION_SECONDS => {
            expect_arity(name, args, 1)?;
            Ok(Constant::number(
                expect_duration(name, &args[0])? / 1_000_000_000,
            ))
        }
        sym::DURATION_NANOS => {
            expect_arity(name, args, 1)?;
            Ok(Constant::number(expect_duration(name, &args[0])?))
        }
        sym::DURATION_FROM_NANOS => {
            expect_arity(name, args, 1)?;
            Ok(Constant::duration(expect_number(name, &args[0])?))
        }
        sym::DURATION_FROM_HOURS => {
            expect_arity(name, args, 1)?;
            let n = expect_number(name, &args[0])?;
            Ok(Constant::duration(checked(
                name,
                n.checked_mul(3_600_000_000_000),
            )?))
        }
        sym::DURATION_FROM_MINUTES => {
            expect_arity(name, args, 1)?;
            let n = expect_number(name, &args[0])?;
            Ok(Constant::duration(checked(
                name,
                n.checked_mul(60_000_000_000),
            )?))
        }
        sym::DURATION_FROM_SECONDS => {
            expect_arity(name, args, 1)?;
            let n = expect_number(name, &args[0])?;
            Ok(Constant::duration(checked(
                name,
                n.checked_mul(1_000_000_000),
            )?))
        }
        sym::DURATION_PARSE => {
            expect_arity(name, args, 1)?;
            Ok(Constant::duration(time::parse_duration(expect_string(
                name, &args[0],
            )?)?))
        }

        // Intervals (pairs of time instants)
        sym::INTERVAL_START => {
            expect_arity(name, args, 1)?;
            Ok(Constant::time(interval_endpoints(name, &args[0])?.0))
        }
        sym::INTERVAL_END => {
            expect_arity(name, args, 1)?;
            Ok(Constant::time(interval_endpoints(name, &args[0])?.1))
        }
        sym::INTERVAL_DURATION => {
            expect_arity(name, args, 1)?;
            let (start, end) = interval_endpoints(name, &args[0])?;
            Ok(Constant::duration(checked(name, end.checked_sub(start))?))
        }

        other if sym::is_reducer(other) => Err(FunctionError::malformed(
            other,
            "reduce operators are only valid inside a transform",
        )),
        other => Err(FunctionError::UnknownFunction(other.to_string())),
    }
}
