//! Canonical fact text format
//!
//! The persistence and import surface for facts: an atom's canonical form is
//! `predicate(arg1, arg2, ...)` with each constant printed canonically (the
//! model's Display impls). This crate writes that form and reads it back;
//! reading the canonical form of any constant yields an equal constant.
//!
//! This is deliberately NOT a program parser: only constants and ground
//! atoms, one fact per line, `#` comments.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod read;

pub use read::{read_atom, read_constant, read_facts};

use mangle_model::Atom;

/// Result type for reading
pub type ReadResult<T> = Result<T, ReadError>;

/// A syntax error in the fact text format
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ReadError {
    /// 1-based line of the offending position
    pub line: usize,
    /// 1-based column of the offending position
    pub column: usize,
    /// Description of what went wrong
    pub message: String,
}

/// Write one fact in canonical form
pub fn write_atom(atom: &Atom) -> String {
    atom.to_string()
}

/// Write facts one per line
pub fn write_facts<'a>(facts: impl IntoIterator<Item = &'a Atom>) -> String {
    let mut out = String::new();
    for fact in facts {
        out.push_str(&fact.to_string());
        out.push('\n');
    }
    out
}
