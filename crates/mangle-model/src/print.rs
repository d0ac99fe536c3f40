//! Canonical pretty-printing
//!
//! The Display impls here define the canonical text form used by fact
//! serialisation: what they print, the fact reader parses back to an equal
//! value.

use crate::constant::Constant;
use crate::term::{Atom, BaseTerm, Clause, FnApply, Literal, Variable};
use crate::temporal::{IntervalPattern, TemporalOp, TimeBound};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Escape a string for the canonical `"..."` form
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c.is_ascii() => out.push(c),
            c => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
        }
    }
    out
}

/// Escape bytes for the canonical `b"..."` form
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 3);
    for &b in bytes {
        match b {
            0x20..=0x7e if b != b'"' && b != b'\\' => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out
}

/// Format epoch nanoseconds in RFC 3339 nanosecond form, UTC
pub fn format_time(nanos: i64) -> String {
    DateTime::<Utc>::from_timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

const DURATION_UNITS: &[(i64, &str)] = &[
    (3_600_000_000_000, "h"),
    (60_000_000_000, "m"),
    (1_000_000_000, "s"),
    (1_000_000, "ms"),
    (1_000, "us"),
    (1, "ns"),
];

/// Format signed nanoseconds in combined suffix notation, e.g. `1h30m`
pub fn format_duration(nanos: i64) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    let mut rest = nanos.unsigned_abs();
    for &(unit, suffix) in DURATION_UNITS {
        let unit = unit as u64;
        let q = rest / unit;
        if q > 0 {
            out.push_str(&format!("{q}{suffix}"));
            rest %= unit;
        }
    }
    out
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        // Debug formatting keeps a trailing ".0" on integral values, which
        // keeps floats distinguishable from numbers on re-read.
        format!("{f:?}")
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Name(n) => write!(f, "{n}"),
            Constant::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Constant::Bytes(b) => write!(f, "b\"{}\"", escape_bytes(b)),
            Constant::Number(n) => write!(f, "{n}"),
            Constant::Float64(x) => write!(f, "{}", format_float(*x)),
            Constant::Time(n) => write!(f, "{}", format_time(*n)),
            Constant::Duration(n) => write!(f, "{}", format_duration(*n)),
            Constant::Pair(p) => write!(f, "fn:pair({}, {})", p.first, p.second),
            Constant::List(l) => {
                write!(f, "[")?;
                for (i, item) in l.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Constant::Map(m) => {
                if m.entries.is_empty() {
                    return write!(f, "[:]");
                }
                write!(f, "[")?;
                for (i, (k, v)) in m.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k} : {v}")?;
                }
                write!(f, "]")
            }
            Constant::Struct(s) => {
                write!(f, "{{")?;
                for (i, (k, v)) in s.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k} : {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for FnApply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.sym.as_str())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for BaseTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseTerm::Const(c) => write!(f, "{c}"),
            BaseTerm::Var(v) => write!(f, "{v}"),
            BaseTerm::Apply(app) => write!(f, "{app}"),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.sym.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBound::MinusInf => write!(f, "-inf"),
            TimeBound::PlusInf => write!(f, "+inf"),
            TimeBound::Now => write!(f, "now"),
            TimeBound::Instant(n) => write!(f, "{}", format_time(*n)),
            TimeBound::Var(v) => write!(f, "{v}"),
            TimeBound::Relative(d) => write!(f, "{}", format_duration(*d)),
        }
    }
}

impl fmt::Display for IntervalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl TemporalOp {
    /// The operator's surface token
    pub fn token(self) -> &'static str {
        match self {
            TemporalOp::DiamondPast => "<-",
            TemporalOp::BoxPast => "[-",
            TemporalOp::DiamondFuture => "<+",
            TemporalOp::BoxFuture => "[+",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Positive(a) => write!(f, "{a}"),
            Literal::PositiveAt(a, pat) => write!(f, "{a}@{pat}"),
            Literal::Negative(a) => write!(f, "!{a}"),
            Literal::Eq(l, r) => write!(f, "{l} = {r}"),
            Literal::Ineq(l, r) => write!(f, "{l} != {r}"),
            Literal::Temporal(t) => write!(
                f,
                "{}[{}, {}] {}",
                t.op.token(),
                format_duration(t.window.lo),
                format_duration(t.window.hi),
                t.atom
            ),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if let Some(pat) = &self.head_interval {
            write!(f, "@{pat}")?;
        }
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            for (i, lit) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{lit}")?;
            }
        }
        if let Some(t) = &self.transform {
            write!(f, " |> ")?;
            let mut first = true;
            if let Some(g) = &t.group_by {
                write!(f, "do {g}")?;
                first = false;
            }
            for stmt in &t.lets {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "let {} = {}", stmt.var, stmt.app)?;
                first = false;
            }
        }
        write!(f, ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_escapes() {
        let c = Constant::string("a\"b\\c\nd\té");
        assert_eq!(c.to_string(), "\"a\\\"b\\\\c\\nd\\t\\u{e9}\"");
    }

    #[test]
    fn test_bytes_escapes() {
        let c = Constant::bytes([0x41, 0x00, 0x22, 0xff]);
        assert_eq!(c.to_string(), "b\"A\\x00\\x22\\xff\"");
    }

    #[test]
    fn test_number_and_float_distinguishable() {
        assert_eq!(Constant::number(5).to_string(), "5");
        assert_eq!(Constant::float(5.0).to_string(), "5.0");
    }

    #[test]
    fn test_duration_format() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(90 * 60 * 1_000_000_000), "1h30m");
        assert_eq!(format_duration(1_500), "1us500ns");
        assert_eq!(format_duration(-5_000_000_000), "-5s");
    }

    #[test]
    fn test_time_format_is_rfc3339_nanos() {
        let c = Constant::time(1_705_312_500_000_000_000);
        assert_eq!(c.to_string(), "2024-01-15T09:55:00.000000000Z");
    }

    #[test]
    fn test_composite_forms() {
        let pair = Constant::pair(Constant::number(1), Constant::number(2));
        assert_eq!(pair.to_string(), "fn:pair(1, 2)");

        let list = Constant::list(vec![Constant::number(1), Constant::number(2)]);
        assert_eq!(list.to_string(), "[1, 2]");

        assert_eq!(Constant::empty_list().to_string(), "[]");
        assert_eq!(Constant::empty_map().to_string(), "[:]");
        assert_eq!(Constant::empty_struct().to_string(), "{}");
    }

    #[test]
    fn test_clause_display() {
        let clause = Clause::rule(
            Atom::new("reach", vec![BaseTerm::var("X"), BaseTerm::var("Z")]),
            vec![
                Literal::Positive(Atom::new(
                    "edge",
                    vec![BaseTerm::var("X"), BaseTerm::var("Y")],
                )),
                Literal::Positive(Atom::new(
                    "reach",
                    vec![BaseTerm::var("Y"), BaseTerm::var("Z")],
                )),
            ],
        );
        assert_eq!(clause.to_string(), "reach(X, Z) :- edge(X, Y), reach(Y, Z).");
    }
}
