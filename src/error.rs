//! Error kinds shared across the crate.

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The disjoint failure kinds of the planner.
///
/// User input errors and arithmetic precision errors are deliberately
/// kept apart from resource exhaustion: a tripped guard limit is a
/// normal outcome reported through `SearchGuardReport` and only turns
/// into `GuardLimitExceeded` for callers that opted into throwing.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A violated precondition in caller-supplied data. The message
    /// states what failed and, for failed comparisons, both operands.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Arithmetic precision loss the planner refuses to silently
    /// accept, e.g. a tolerance window collapsing under the configured
    /// scale.
    #[error("precision violation: {0}")]
    PrecisionViolation(String),

    /// Raised after a search only when the caller opted into throwing
    /// on guard breaches. The message lists every tripped limit.
    #[error("{0}")]
    GuardLimitExceeded(String),

    /// Reserved for calling code. The planner itself signals "no
    /// viable path" with an empty plan list instead of this error.
    #[error("infeasible path: {0}")]
    InfeasiblePath(String),
}

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub(crate) fn precision(message: impl Into<String>) -> Self {
        Error::PrecisionViolation(message.into())
    }
}
