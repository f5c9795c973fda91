//! Engine notifications.
//!
//! These are not persisted facts about stock (movement records are); they tell
//! interested screens what happened to a submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::SubmissionId;
use wms_events::Event;

use crate::submission::MovementKind;

/// Event: SubmissionCommitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionCommitted {
    pub submission_id: SubmissionId,
    pub kind: MovementKind,
    pub line_count: usize,
    pub movement_count: usize,
    pub total_qty: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubmissionRejected (validation or transport failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRejected {
    pub submission_id: SubmissionId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentGenerationFailed (after a successful commit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentGenerationFailed {
    pub submission_id: SubmissionId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationEvent {
    SubmissionCommitted(SubmissionCommitted),
    SubmissionRejected(SubmissionRejected),
    DocumentGenerationFailed(DocumentGenerationFailed),
}

impl AllocationEvent {
    pub fn submission_id(&self) -> SubmissionId {
        match self {
            AllocationEvent::SubmissionCommitted(e) => e.submission_id,
            AllocationEvent::SubmissionRejected(e) => e.submission_id,
            AllocationEvent::DocumentGenerationFailed(e) => e.submission_id,
        }
    }
}

impl Event for AllocationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AllocationEvent::SubmissionCommitted(_) => "allocation.submission.committed",
            AllocationEvent::SubmissionRejected(_) => "allocation.submission.rejected",
            AllocationEvent::DocumentGenerationFailed(_) => "allocation.document.failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AllocationEvent::SubmissionCommitted(e) => e.occurred_at,
            AllocationEvent::SubmissionRejected(e) => e.occurred_at,
            AllocationEvent::DocumentGenerationFailed(e) => e.occurred_at,
        }
    }
}
