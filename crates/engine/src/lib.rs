//! Semi-naive fixpoint evaluation
//!
//! Computes the minimal model of an analyzed program stratum by stratum:
//! - semi-naive iteration with per-round deltas
//! - stratified negation-as-failure
//! - head transforms (group-by + reducer pipelines)
//! - metric temporal operators against a reference time
//! - user-supplied external predicates
//!
//! Evaluation is single-threaded, CPU-bound and deterministic: the result is
//! a function of the program and the fact store state. Per-row evaluation
//! errors are logged and skipped; analysis and internal errors abort.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod external;
mod fixpoint;
mod query;
mod session;
mod temporal;
mod transform;

pub use external::{ExternalPredicate, ExternalPredicates};
pub use fixpoint::{eval_program, EvalOptions, EvalStats};
pub use query::{query, query_program};
pub use session::Session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised by the fixpoint engine
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The caller's cancellation signal fired; raised at round boundaries
    #[error("evaluation cancelled")]
    Cancelled,

    /// Fact store failure
    #[error(transparent)]
    Store(#[from] factstore::StoreError),

    /// Program analysis failed (surfaced through `Session`)
    #[error(transparent)]
    Analysis(#[from] analysis::AnalysisError),

    /// An external predicate implementation failed
    #[error("external predicate {predicate} failed: {message}")]
    UserPredicate {
        /// Predicate symbol
        predicate: String,
        /// Propagated description
        message: String,
    },

    /// Precondition violation indicating a bug
    #[error("internal error: {0}")]
    Internal(String),
}

/// Cooperative cancellation signal checked at round boundaries
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, unsignalled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once `cancel` ran
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
