use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wms_allocation::{MovementRecord, SourceLineKey};
use wms_core::{ExpectedVersion, SubmissionId};

/// The version a commit expects a source line to be at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineExpectation {
    pub line: SourceLineKey,
    pub expected: ExpectedVersion,
}

/// Every record of one submission, committed as a single logical operation.
///
/// ## Atomicity
///
/// A store either accepts every record (and advances every touched line) or
/// none of them. Conservation (`issued + committed <= ordered`) and the
/// version expectations are checked by the store itself; the engine's own
/// pre-commit check runs on a snapshot that may already be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementBatch {
    pub submission_id: SubmissionId,
    pub records: Vec<MovementRecord>,
    pub expectations: Vec<LineExpectation>,
}

/// Confirmation of a committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub submission_id: SubmissionId,
    pub committed_at: DateTime<Utc>,
    pub records: Vec<MovementRecord>,
}

impl CommitReceipt {
    /// Saturates at `i64::MAX`.
    pub fn total_qty(&self) -> i64 {
        self.records
            .iter()
            .fold(0i64, |acc, r| acc.saturating_add(r.qty))
    }
}

/// Movement store operation error.
///
/// These are **infrastructure errors**. The engine surfaces all of them to
/// the operator as one opaque commit failure; the variants exist for logs.
#[derive(Debug, Error)]
pub enum MovementStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("source line not found: {0}")]
    UnknownLine(String),

    /// Authoritative conservation rejection.
    #[error("allocation rejected: {0}")]
    Rejected(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Append-only movement persistence.
///
/// Records are never updated or deleted; a correction is a later, independent
/// movement. Implementations must be safe to share across threads.
pub trait MovementStore: Send + Sync {
    /// Commit a batch atomically (all records accepted or none).
    fn commit(&self, batch: MovementBatch) -> Result<CommitReceipt, MovementStoreError>;

    /// Committed records for one line, oldest first.
    fn history(&self, line: &SourceLineKey) -> Result<Vec<MovementRecord>, MovementStoreError>;
}

impl<S> MovementStore for Arc<S>
where
    S: MovementStore + ?Sized,
{
    fn commit(&self, batch: MovementBatch) -> Result<CommitReceipt, MovementStoreError> {
        (**self).commit(batch)
    }

    fn history(&self, line: &SourceLineKey) -> Result<Vec<MovementRecord>, MovementStoreError> {
        (**self).history(line)
    }
}
