//! Hand-written scanner for the canonical fact text format

use crate::{ReadError, ReadResult};
use chrono::DateTime;
use mangle_model::{Atom, BaseTerm, Constant};

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | ':' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '#')
}

fn is_scalar_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | ':' | 'µ')
}

fn is_predicate_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_predicate_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':')
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> ReadError {
        ReadError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> ReadResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {expected:?}, found {:?}",
                self.peek().map(String::from).unwrap_or_default()
            )))
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.peek().is_none()
    }

    fn constant(&mut self) -> ReadResult<Constant> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("expected a constant, found end of input")),
            Some('/') => self.name(),
            Some('"') => self.string(),
            Some('b') if self.rest().starts_with("b\"") => self.bytes(),
            Some('f') if self.rest().starts_with("fn:pair(") => self.pair(),
            Some('[') => self.list_or_map(),
            Some('{') => self.struct_(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | 'N' | 'i') => self.scalar(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
        }
    }

    fn name(&mut self) -> ReadResult<Constant> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        Constant::name(&self.input[start..self.pos]).map_err(|e| self.error(e.to_string()))
    }

    fn hex_byte(&mut self) -> ReadResult<u8> {
        let mut value = 0u8;
        for _ in 0..2 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid \\x escape"))?;
            value = value * 16 + digit as u8;
        }
        Ok(value)
    }

    fn string(&mut self) -> ReadResult<Constant> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(Constant::string(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('x') => out.push(char::from(self.hex_byte()?)),
                    Some('u') => {
                        self.expect('{')?;
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != '}') {
                            self.bump();
                        }
                        let code = u32::from_str_radix(&self.input[start..self.pos], 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| self.error("invalid \\u escape"))?;
                        self.expect('}')?;
                        out.push(code);
                    }
                    other => {
                        return Err(self.error(format!("unknown escape {other:?}")));
                    }
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn bytes(&mut self) -> ReadResult<Constant> {
        self.expect('b')?;
        self.expect('"')?;
        let mut out: Vec<u8> = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated byte string")),
                Some('"') => return Ok(Constant::bytes(out)),
                Some('\\') => {
                    self.expect('x')?;
                    out.push(self.hex_byte()?);
                }
                Some(c) if c.is_ascii() => out.push(c as u8),
                Some(c) => {
                    return Err(self.error(format!("non-ASCII {c:?} in byte string")));
                }
            }
        }
    }

    fn pair(&mut self) -> ReadResult<Constant> {
        for _ in 0.."fn:pair(".len() {
            self.bump();
        }
        let first = self.constant()?;
        self.skip_ws();
        self.expect(',')?;
        let second = self.constant()?;
        self.skip_ws();
        self.expect(')')?;
        Ok(Constant::pair(first, second))
    }

    fn list_or_map(&mut self) -> ReadResult<Constant> {
        self.expect('[')?;
        self.skip_ws();
        if self.eat(']') {
            return Ok(Constant::empty_list());
        }
        if self.eat(':') {
            self.skip_ws();
            self.expect(']')?;
            return Ok(Constant::empty_map());
        }
        let first = self.constant()?;
        self.skip_ws();
        if self.eat(':') {
            // Map: [k1 : v1, k2 : v2]
            let mut entries = vec![(first, self.constant()?)];
            loop {
                self.skip_ws();
                if self.eat(']') {
                    return Ok(Constant::map(entries));
                }
                self.expect(',')?;
                let key = self.constant()?;
                self.skip_ws();
                self.expect(':')?;
                entries.push((key, self.constant()?));
            }
        }
        // List: [a, b, c]
        let mut items = vec![first];
        loop {
            self.skip_ws();
            if self.eat(']') {
                return Ok(Constant::list(items));
            }
            self.expect(',')?;
            items.push(self.constant()?);
        }
    }

    fn struct_(&mut self) -> ReadResult<Constant> {
        self.expect('{')?;
        self.skip_ws();
        if self.eat('}') {
            return Ok(Constant::empty_struct());
        }
        let mut entries = Vec::new();
        loop {
            let key = self.constant()?;
            self.skip_ws();
            self.expect(':')?;
            entries.push((key, self.constant()?));
            self.skip_ws();
            if self.eat('}') {
                return Ok(Constant::struct_(entries));
            }
            self.expect(',')?;
        }
    }

    /// Numbers, floats, time instants and durations share a token shape;
    /// classify after scanning the maximal scalar token.
    fn scalar(&mut self) -> ReadResult<Constant> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_scalar_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        let token = &self.input[start..self.pos];
        match token {
            "" => return Err(self.error("expected a value")),
            "NaN" => return Ok(Constant::float(f64::NAN)),
            "inf" => return Ok(Constant::float(f64::INFINITY)),
            "-inf" => return Ok(Constant::float(f64::NEG_INFINITY)),
            _ => {}
        }
        if token.contains('T') {
            let dt = DateTime::parse_from_rfc3339(token)
                .map_err(|e| self.error(format!("invalid timestamp {token:?}: {e}")))?;
            return dt
                .timestamp_nanos_opt()
                .map(Constant::time)
                .ok_or_else(|| self.error(format!("timestamp {token:?} out of range")));
        }
        if token.ends_with(|c: char| c.is_alphabetic()) {
            return functional::time::parse_duration(token)
                .map(Constant::duration)
                .map_err(|e| self.error(e.to_string()));
        }
        if token.contains(['.', 'e', 'E']) {
            return token
                .parse::<f64>()
                .map(Constant::float)
                .map_err(|e| self.error(format!("invalid float {token:?}: {e}")));
        }
        token
            .parse::<i64>()
            .map(Constant::number)
            .map_err(|e| self.error(format!("invalid number {token:?}: {e}")))
    }

    fn atom(&mut self) -> ReadResult<Atom> {
        self.skip_ws();
        if !self.peek().is_some_and(is_predicate_start) {
            return Err(self.error("expected a predicate name"));
        }
        let start = self.pos;
        while self.peek().is_some_and(is_predicate_char) {
            self.bump();
        }
        let predicate = self.input[start..self.pos].to_string();
        self.expect('(')?;
        self.skip_ws();
        let mut args: Vec<BaseTerm> = Vec::new();
        if !self.eat(')') {
            loop {
                args.push(BaseTerm::Const(self.constant()?));
                self.skip_ws();
                if self.eat(')') {
                    break;
                }
                self.expect(',')?;
            }
        }
        Ok(Atom::new(predicate, args))
    }
}

/// Read one constant; trailing input other than whitespace is an error
pub fn read_constant(input: &str) -> ReadResult<Constant> {
    let mut scanner = Scanner::new(input);
    let constant = scanner.constant()?;
    if !scanner.at_end() {
        return Err(scanner.error("trailing input after constant"));
    }
    Ok(constant)
}

/// Read one ground atom; an optional trailing `.` is accepted
pub fn read_atom(input: &str) -> ReadResult<Atom> {
    let mut scanner = Scanner::new(input);
    let atom = scanner.atom()?;
    scanner.skip_ws();
    scanner.eat('.');
    if !scanner.at_end() {
        return Err(scanner.error("trailing input after fact"));
    }
    Ok(atom)
}

/// Read facts, one per line; blank lines and `#` comments are skipped
pub fn read_facts(input: &str) -> ReadResult<Vec<Atom>> {
    let mut scanner = Scanner::new(input);
    let mut facts = Vec::new();
    while !scanner.at_end() {
        facts.push(scanner.atom()?);
        scanner.skip_ws();
        scanner.eat('.');
    }
    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(c: &Constant) {
        let text = c.to_string();
        let back = read_constant(&text).unwrap_or_else(|e| panic!("reading {text:?}: {e}"));
        assert_eq!(&back, c, "round-trip through {text:?}");
    }

    #[test]
    fn test_scalar_round_trips() {
        round_trip(&Constant::number(-42));
        round_trip(&Constant::float(3.5));
        round_trip(&Constant::float(5.0));
        round_trip(&Constant::float(f64::INFINITY));
        round_trip(&Constant::name("/foo/bar").unwrap());
        round_trip(&Constant::time(1_705_312_500_000_000_000));
        round_trip(&Constant::duration(90 * 60 * 1_000_000_000));
        round_trip(&Constant::duration(-250_000_000));
        round_trip(&Constant::duration(0));
    }

    #[test]
    fn test_string_and_bytes_round_trips() {
        round_trip(&Constant::string("hello \"world\"\n\ttab\\é☃"));
        round_trip(&Constant::string(""));
        round_trip(&Constant::bytes([0x00, 0x41, 0x22, 0x5c, 0xff]));
        round_trip(&Constant::bytes([]));
    }

    #[test]
    fn test_composite_round_trips() {
        let list = Constant::list(vec![
            Constant::number(1),
            Constant::string("x"),
            Constant::name("/n").unwrap(),
        ]);
        round_trip(&list);
        round_trip(&Constant::empty_list());

        let map = Constant::map(vec![
            (Constant::name("/a").unwrap(), Constant::number(1)),
            (Constant::name("/b").unwrap(), list.clone()),
        ]);
        round_trip(&map);
        round_trip(&Constant::empty_map());

        let st = Constant::struct_(vec![
            (Constant::name("/k").unwrap(), map.clone()),
            (Constant::name("/l").unwrap(), Constant::pair(map, list)),
        ]);
        round_trip(&st);
        round_trip(&Constant::empty_struct());
    }

    #[test]
    fn test_nested_pair_form() {
        let c = read_constant("fn:pair(1, fn:pair(/a, \"s\"))").unwrap();
        assert_eq!(
            c,
            Constant::pair(
                Constant::number(1),
                Constant::pair(Constant::name("/a").unwrap(), Constant::string("s")),
            )
        );
    }

    #[test]
    fn test_atom_forms() {
        let atom = read_atom("edge(/a, /b).").unwrap();
        assert_eq!(atom.sym.name(), "edge");
        assert_eq!(atom.arity(), 2);

        let empty = read_atom("tick()").unwrap();
        assert_eq!(empty.arity(), 0);

        assert!(read_atom("edge(/a, X)").is_err());
        assert!(read_atom("edge(/a").is_err());
    }

    #[test]
    fn test_read_facts_with_comments() {
        let text = "# graph\nedge(/a, /b).\n\nedge(/b, /c)\n";
        let facts = read_facts(text).unwrap();
        assert_eq!(facts.len(), 2);
    }

    #[test]
    fn test_errors_carry_position() {
        let err = read_constant("[1, ").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.column > 1);
    }
}
