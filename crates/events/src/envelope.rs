use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wms_core::SubmissionId;

use crate::Event;

/// Envelope for an event, carrying the submission it belongs to.
///
/// Notes:
/// - Every engine event is scoped to exactly one submission (`submission_id`).
/// - `sequence_number` is monotonically increasing per submission, so a
///   listener can order the events of one workflow run.
/// - `payload` is the typed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    submission_id: SubmissionId,

    event_type: String,
    occurred_at: DateTime<Utc>,

    /// Position within the submission's event sequence (starts at 1).
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        submission_id: SubmissionId,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            submission_id,
            event_type: event_type.into(),
            occurred_at,
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn submission_id(&self) -> SubmissionId {
        self.submission_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, copying its type name and business time.
    pub fn wrap(submission_id: SubmissionId, sequence_number: u64, payload: E) -> Self {
        Self::new(
            Uuid::now_v7(),
            submission_id,
            payload.event_type(),
            payload.occurred_at(),
            sequence_number,
            payload,
        )
    }
}
