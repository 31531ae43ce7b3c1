//! Error taxonomy for the wave-picking core.
//!
//! Four kinds, matching the propagation policy: malformed input is surfaced
//! per-instance and never aborts siblings; an unreachable lower bound is a
//! well-formed empty [`crate::model::Solution`], not a hard error; a deadline
//! firing mid-search returns the best feasible solution seen so far; and a
//! post-condition failure on a solution about to be published is the one
//! case that is fatal for the instance, because it means a published
//! invariant would otherwise be violated.

use thiserror::Error;

/// Top-level error type returned by the core's public entry points.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The instance file or in-memory instance violates a data-model
    /// invariant: an out-of-range id, a non-positive quantity, or `LB > UB`.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// No order set can be found that meets `LB` under stock constraints.
    /// Callers that need a concrete artifact should use
    /// [`crate::model::Solution::infeasible`] rather than matching on this
    /// variant; it exists for contexts that need to fail loudly instead
    /// (e.g. a CLI exit code).
    #[error("no feasible wave exists for this instance")]
    Infeasible,

    /// The wall-clock deadline installed at start fired before the search
    /// concluded. The best feasible solution known at that point should
    /// still have been returned to the caller; this variant is for contexts
    /// where no feasible solution was ever found before the deadline.
    #[error("deadline exceeded with no feasible solution found")]
    Timeout,

    /// A solution about to be published failed one of its post-conditions
    /// (§3 invariants 1-6). This should never happen in a correct build; it
    /// indicates a bug in whichever component constructed the solution, so
    /// the instance is abandoned rather than risking a corrupted ledger.
    #[error("internal invariant violated on publish: {0}")]
    InternalInvariantViolation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
