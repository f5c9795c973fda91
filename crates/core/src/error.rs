//! Shared domain error model.
//!
//! Raised when building domain values from external records (source lines,
//! catalogs, identifiers) and when a version check fails. The allocation
//! workflow reports its own, more specific failures through
//! `wms_allocation::AllocationError`.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (blank names, negative quantities, orphan catalog rows).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A record contradicts itself or an operation would break conservation
    /// (e.g. `remaining_qty != ordered_qty - issued_qty`).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Stale version at commit time.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Whether re-reading current state and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
