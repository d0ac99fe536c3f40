//! Built-in function and reducer evaluation
//!
//! Function expressions carry the `fn:` prefix and evaluate lazily: the
//! evaluator calls `eval_apply_fn` once every free variable of the expression
//! is bound. Reducers (`fn:count`, `fn:sum`, ...) consume a sequence of
//! grouped answer rows and produce a single constant.
//!
//! Failure semantics: every error here is a per-row error; the fixpoint
//! engine logs and skips the affected row or group rather than aborting.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod eval;
pub mod reduce;
pub mod sym;
pub mod time;

pub use eval::{eval_apply_fn, eval_base_term};

/// Result type for built-in evaluation
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Errors raised while evaluating built-in functions and reducers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FunctionError {
    /// The function symbol is not recognised
    #[error("unknown function {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("{function} expects {expected} arguments, got {actual}")]
    WrongArity {
        /// Function symbol
        function: String,
        /// Human-readable expected count, e.g. "2" or "at least 1"
        expected: &'static str,
        /// Actual argument count
        actual: usize,
    },

    /// An argument had the wrong constant kind
    #[error("{function}: expected {expected}, got {actual}")]
    WrongType {
        /// Function symbol
        function: String,
        /// Expected kind description
        expected: &'static str,
        /// Offending value, canonical form
        actual: String,
    },

    /// Integer or duration division by zero
    #[error("division by zero in {0}")]
    DivisionByZero(String),

    /// Map or struct lookup missed
    #[error("{function}: key {key} not found")]
    KeyNotFound {
        /// Function symbol
        function: String,
        /// Missing key, canonical form
        key: String,
    },

    /// List access out of range
    #[error("{function}: index {index} out of range")]
    IndexOutOfBounds {
        /// Function symbol
        function: String,
        /// Offending index
        index: i64,
    },

    /// A free variable reached evaluation
    #[error("{function}: unbound variable {variable}")]
    UnboundVariable {
        /// Function symbol
        function: String,
        /// Variable name
        variable: String,
    },

    /// Arithmetic overflow
    #[error("arithmetic overflow in {0}")]
    Overflow(String),

    /// Malformed input: bad time string, unknown timezone, unsupported
    /// precision, and similar
    #[error("{function}: {message}")]
    Malformed {
        /// Function symbol
        function: String,
        /// Description
        message: String,
    },
}

impl FunctionError {
    pub(crate) fn wrong_type(function: &str, expected: &'static str, actual: impl ToString) -> Self {
        FunctionError::WrongType {
            function: function.to_string(),
            expected,
            actual: actual.to_string(),
        }
    }

    pub(crate) fn malformed(function: &str, message: impl Into<String>) -> Self {
        FunctionError::Malformed {
            function: function.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn arity(function: &str, expected: &'static str, actual: usize) -> Self {
        FunctionError::WrongArity {
            function: function.to_string(),
            expected,
            actual,
        }
    }
}
