//! AlgebraError: Unified error type for mesh-algebra public APIs
//!
//! Every construction, disposal, partition and ordering routine returns this
//! error instead of panicking. The variants form a small closed set so callers
//! (e.g. a coarsening loop) can decide which failures are fatal.

use crate::algebra::vector::VectorType;
use thiserror::Error;

/// Unified error type for mesh-algebra operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlgebraError {
    /// The level heap cannot satisfy a fresh allocation.
    #[error("out of memory: requested {requested} bytes, {available} bytes left on the level heap")]
    OutOfMemory { requested: usize, available: usize },
    /// A path/stack capacity was exceeded or an id does not belong to the level.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// A structural invariant was violated.
    #[error("vector structure corrupted: {0}")]
    Inconsistency(String),
    /// A lookup missed; often a legitimate non-error outcome for the caller.
    #[error("not found: {0}")]
    NotFound(String),
    /// The format defines no interaction (zero payload) for this type pair.
    #[error("no interaction defined between {from} and {to} vectors")]
    ConfigurationError { from: VectorType, to: VectorType },
    /// Attempted to construct a PointId with a zero value.
    #[error("PointId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidPointId,
}

impl AlgebraError {
    /// `true` for the "no connection needed" outcome of connection creation.
    #[inline]
    pub fn is_configuration(&self) -> bool {
        matches!(self, AlgebraError::ConfigurationError { .. })
    }

    pub(crate) fn inconsistency(message: impl Into<String>) -> Self {
        AlgebraError::Inconsistency(message.into())
    }
}
