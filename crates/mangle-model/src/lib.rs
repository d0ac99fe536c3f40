//! Term algebra for the Mangle deductive database
//!
//! The data model every other crate builds on:
//! - `Constant`: structurally hashed values (names, strings, bytes, numbers,
//!   floats, time instants, durations, pairs, lists, maps, structs)
//! - `BaseTerm` / `Atom` / `Literal` / `Clause` / `Decl`: the clause language
//! - `TimeBound` / `Interval` / `TemporalLiteral`: metric temporal annotations
//! - `Subst` / unification / fresh-variable generation
//!
//! Terms are immutable value types; composite constants share children through
//! reference counting (no cycles ever arise). Composite hashes are computed
//! once at construction, so equality implies hash equality and map/struct
//! entries have a canonical order.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod constant;
mod decl;
mod print;
mod subst;
mod term;
mod temporal;
pub mod types;
mod unify;

pub use constant::{Constant, ConstantKind};
pub use decl::{ArgMode, BoundDecl, Decl, InclusionConstraint, Mode};
pub use subst::{FreshVars, Subst, SubstMap, SubstPairs};
pub use term::{
    Atom, BaseTerm, Clause, FnApply, FunctionSym, LetStmt, Literal, PredicateSym, Transform,
    Variable,
};
pub use temporal::{Interval, IntervalPattern, TemporalLiteral, TemporalOp, TimeBound, Window};
pub use unify::{match_atom, match_term};

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when constructing model values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Name constant was not a slash-rooted path of non-empty segments
    #[error("invalid name constant {0:?}: names are slash-rooted paths of non-empty segments")]
    InvalidName(String),

    /// Transform statement sequence was malformed
    #[error("invalid transform: {0}")]
    InvalidTransform(String),
}
