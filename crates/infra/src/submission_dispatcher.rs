//! Allocation submission pipeline (application-level orchestration).
//!
//! ```text
//! AllocationSubmission
//!   ↓
//! 1. Snapshot the catalog (one snapshot for the whole submission)
//!   ↓
//! 2. Validate rows and capacity against the staged line snapshots
//!   ↓
//! 3. Re-read every line from the provider and re-check capacity
//!   ↓
//! 4. Plan one movement record per row (no partial plans)
//!   ↓
//! 5. Commit the batch with per-line expected versions (atomic)
//!   ↓
//! 6. Refresh lines, hand off documents, publish notifications
//! ```
//!
//! Steps 1-5 either succeed together or leave no trace. Step 6 never turns a
//! committed submission into a failure; its problems come back as warnings.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use wms_allocation::{
    AllocationError, AllocationEvent, AllocationLedger, AllocationSubmission,
    DocumentGenerationFailed, MovementKind, MovementRecord, MovementValidator, SourceLine,
    SubmissionCommitted, SubmissionRejected, plan_movements,
};
use wms_core::{ExpectedVersion, SubmissionId};
use wms_events::{EventBus, EventEnvelope};

use crate::catalog_store::CatalogStore;
use crate::config::EngineConfig;
use crate::documents::{DocumentGenerator, DocumentRequest};
use crate::movement_store::{
    CommitReceipt, LineExpectation, MovementBatch, MovementStore, MovementStoreError,
};
use crate::source_lines::{ProviderError, SourceLineProvider};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Rejected locally; nothing was sent to persistence.
    #[error(transparent)]
    Validation(#[from] AllocationError),

    /// Persistence or the line provider failed. Staged state is untouched;
    /// refresh and retry.
    #[error("commit failed: {0}")]
    TransportFailure(String),
}

impl SubmitError {
    /// Transport failures may succeed after a refresh; validation failures
    /// need the operator to change the rows.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::TransportFailure(_))
    }
}

impl From<MovementStoreError> for SubmitError {
    fn from(value: MovementStoreError) -> Self {
        SubmitError::TransportFailure(value.to_string())
    }
}

impl From<ProviderError> for SubmitError {
    fn from(value: ProviderError) -> Self {
        SubmitError::TransportFailure(value.to_string())
    }
}

/// Non-blocking problems after a confirmed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitWarning {
    DownstreamDocumentFailure(String),
    /// Line snapshots were derived locally from the committed quantities.
    RefreshFailed(String),
    NotificationFailed(String),
}

impl core::fmt::Display for SubmitWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SubmitWarning::DownstreamDocumentFailure(msg) => {
                write!(f, "document generation failed: {msg}")
            }
            SubmitWarning::RefreshFailed(msg) => write!(f, "line refresh failed: {msg}"),
            SubmitWarning::NotificationFailed(msg) => write!(f, "notification failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub submission_id: SubmissionId,
    /// Committed records, in submission order.
    pub records: Vec<MovementRecord>,
    /// Post-commit snapshots of every submitted line.
    pub refreshed: Vec<SourceLine>,
    pub warnings: Vec<SubmitWarning>,
}

impl SubmitOutcome {
    /// Saturates at `i64::MAX`.
    pub fn total_qty(&self) -> i64 {
        self.records
            .iter()
            .fold(0i64, |acc, r| acc.saturating_add(r.qty))
    }
}

/// Runs allocation submissions against injected collaborators.
///
/// - `S`: persistence (`MovementStore`)
/// - `P`: source of truth for lines (`SourceLineProvider`)
/// - `D`: downstream document hand-off (`DocumentGenerator`)
/// - `B`: notification bus
///
/// One submission per workflow instance is expected to be in flight at a
/// time; cross-client races are settled by the store's version check.
#[derive(Debug)]
pub struct SubmissionDispatcher<S, P, D, B> {
    store: S,
    lines: P,
    documents: D,
    bus: B,
    catalog: Arc<CatalogStore>,
    config: EngineConfig,
}

impl<S, P, D, B> SubmissionDispatcher<S, P, D, B> {
    pub fn new(store: S, lines: P, documents: D, bus: B, catalog: Arc<CatalogStore>) -> Self {
        Self {
            store,
            lines,
            documents,
            bus,
            catalog,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }
}

impl<S, P, D, B> SubmissionDispatcher<S, P, D, B>
where
    S: MovementStore,
    P: SourceLineProvider,
    D: DocumentGenerator,
    B: EventBus<EventEnvelope<AllocationEvent>>,
{
    /// Validate, commit and settle one submission.
    ///
    /// Returns the committed records plus any non-blocking warnings. On error
    /// nothing was persisted.
    pub fn submit(&self, submission: &AllocationSubmission) -> Result<SubmitOutcome, SubmitError> {
        let mut sequence = Sequence::default();
        match self.commit(submission) {
            Ok((committed, receipt)) => {
                Ok(self.settle(submission.kind(), committed, receipt, &mut sequence))
            }
            Err(err) => {
                warn!(
                    submission_id = %submission.id(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "allocation submission rejected"
                );
                let event = AllocationEvent::SubmissionRejected(SubmissionRejected {
                    submission_id: submission.id(),
                    reason: err.to_string(),
                    occurred_at: Utc::now(),
                });
                if let Err(publish) = self.publish(submission.id(), &mut sequence, event) {
                    warn!(submission_id = %submission.id(), error = %publish, "failed to publish rejection");
                }
                Err(err)
            }
        }
    }

    /// Submit everything staged in `ledger`.
    ///
    /// On success committed rows are discarded and line snapshots refreshed
    /// (exhausted lines leave the ledger). On error the ledger is unchanged.
    pub fn submit_ledger(
        &self,
        ledger: &mut AllocationLedger,
        kind: MovementKind,
    ) -> Result<SubmitOutcome, SubmitError> {
        let submission = ledger.to_submission(kind);
        let outcome = self.submit(&submission)?;
        ledger.settle_committed(&outcome.refreshed);
        Ok(outcome)
    }

    /// Steps 1-5: returns the submission as committed (fresh snapshots) and
    /// the store's receipt.
    fn commit(
        &self,
        submission: &AllocationSubmission,
    ) -> Result<(AllocationSubmission, CommitReceipt), SubmitError> {
        let catalog = self.catalog.snapshot();
        let validator = MovementValidator::new(&catalog);

        // Cheap local rejection before any remote read.
        validator.validate(submission)?;

        let current = submission.rebased(|key| {
            self.lines.get(key)?.ok_or_else(|| {
                SubmitError::TransportFailure(format!("line {key} is no longer available"))
            })
        })?;
        validator.validate_submission(&current)?;

        let records = plan_movements(&current, &validator.resolver(), Utc::now())?;

        // One expectation per distinct line, even if it is listed twice.
        let expectations = current
            .requested_by_line()
            .into_iter()
            .map(|(line, _)| LineExpectation {
                line: line.key().clone(),
                expected: if self.config.enforce_line_versions {
                    ExpectedVersion::Exact(line.version())
                } else {
                    ExpectedVersion::Any
                },
            })
            .collect();

        let receipt = self.store.commit(MovementBatch {
            submission_id: current.id(),
            records,
            expectations,
        })?;

        Ok((current, receipt))
    }

    /// Step 6. Never fails; every problem becomes a warning.
    fn settle(
        &self,
        kind: MovementKind,
        committed: AllocationSubmission,
        receipt: CommitReceipt,
        sequence: &mut Sequence,
    ) -> SubmitOutcome {
        let submission_id = committed.id();
        let mut warnings = Vec::new();
        let total_qty = receipt.total_qty();

        info!(
            submission_id = %submission_id,
            kind = kind.as_str(),
            lines = committed.keys().len(),
            movements = receipt.records.len(),
            total_qty,
            "allocation submission committed"
        );

        let refreshed = match self.lines.refresh(&committed.keys()) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(submission_id = %submission_id, error = %err, "line refresh failed after commit");
                warnings.push(SubmitWarning::RefreshFailed(err.to_string()));
                committed
                    .requested_by_line()
                    .into_iter()
                    .filter_map(|(line, qty)| line.record_issue(qty?).ok())
                    .collect()
            }
        };

        if self.config.generate_documents {
            if let Err(err) = self
                .documents
                .request(DocumentRequest::for_receipt(kind, &receipt))
            {
                warn!(submission_id = %submission_id, error = %err, "document hand-off failed");
                warnings.push(SubmitWarning::DownstreamDocumentFailure(err.to_string()));
                let event = AllocationEvent::DocumentGenerationFailed(DocumentGenerationFailed {
                    submission_id,
                    reason: err.to_string(),
                    occurred_at: Utc::now(),
                });
                if let Err(publish) = self.publish(submission_id, sequence, event) {
                    warnings.push(SubmitWarning::NotificationFailed(publish));
                }
            }
        }

        let event = AllocationEvent::SubmissionCommitted(SubmissionCommitted {
            submission_id,
            kind,
            line_count: committed.keys().len(),
            movement_count: receipt.records.len(),
            total_qty,
            occurred_at: Utc::now(),
        });
        if let Err(publish) = self.publish(submission_id, sequence, event) {
            warn!(submission_id = %submission_id, error = %publish, "failed to publish commit notification");
            warnings.push(SubmitWarning::NotificationFailed(publish));
        }

        SubmitOutcome {
            submission_id,
            records: receipt.records,
            refreshed,
            warnings,
        }
    }

    fn publish(
        &self,
        submission_id: SubmissionId,
        sequence: &mut Sequence,
        event: AllocationEvent,
    ) -> Result<(), String> {
        let envelope = EventEnvelope::wrap(submission_id, sequence.next(), event);
        self.bus.publish(envelope).map_err(|e| format!("{e:?}"))
    }
}

/// Per-submission event sequence (starts at 1).
#[derive(Debug, Default)]
struct Sequence(u64);

impl Sequence {
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_allocation::{AllocationEntry, Catalog, LineContext, LocationDraft, SourceLineKey};
    use wms_events::InMemoryEventBus;

    use crate::documents::InMemoryDocumentQueue;
    use crate::movement_store::InMemoryWarehouse;

    type Dispatcher = SubmissionDispatcher<
        Arc<InMemoryWarehouse>,
        Arc<InMemoryWarehouse>,
        Arc<InMemoryDocumentQueue>,
        Arc<InMemoryEventBus<EventEnvelope<AllocationEvent>>>,
    >;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.add_section("A").unwrap();
        catalog.add_sub_section("A", "1").unwrap();
        catalog.add_bin("A", "1", "1").unwrap();
        catalog.add_bin("A", "1", "2").unwrap();
        catalog
    }

    fn line() -> SourceLine {
        SourceLine::new(
            SourceLineKey::new("PS-7", "1", "ITEM", "BATCH", "H-1-1"),
            10,
            0,
            LineContext::default(),
        )
        .unwrap()
    }

    fn dispatcher(warehouse: &Arc<InMemoryWarehouse>) -> Dispatcher {
        SubmissionDispatcher::new(
            warehouse.clone(),
            warehouse.clone(),
            Arc::new(InMemoryDocumentQueue::new()),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(CatalogStore::new(catalog())),
        )
    }

    fn submission(line: &SourceLine, qty: i64) -> AllocationSubmission {
        AllocationSubmission::new(MovementKind::BinTransfer).with_line(
            line.clone(),
            vec![AllocationEntry::new(LocationDraft::from_parts("A", "1", "2"), qty)],
        )
    }

    #[test]
    fn stale_snapshot_is_rechecked_against_the_provider() {
        let line = line();
        let warehouse = Arc::new(InMemoryWarehouse::with_lines([line.clone()]));
        // Another client issued 8 in the meantime.
        warehouse.upsert_line(line.record_issue(8).unwrap());

        let err = dispatcher(&warehouse).submit(&submission(&line, 5)).unwrap_err();

        assert_eq!(
            err,
            SubmitError::Validation(AllocationError::OverAllocation {
                line: line.key().clone(),
                requested: 5,
                available: 2,
            })
        );
        assert_eq!(warehouse.movement_count(), 0);
    }

    #[test]
    fn repeated_line_is_rejected_locally_on_its_combined_total() {
        let line = line().record_issue(5).unwrap();
        let warehouse = Arc::new(InMemoryWarehouse::with_lines([line.clone()]));
        let submission = AllocationSubmission::new(MovementKind::BinTransfer)
            .with_line(
                line.clone(),
                vec![AllocationEntry::new(LocationDraft::from_parts("A", "1", "1"), 3)],
            )
            .with_line(
                line.clone(),
                vec![AllocationEntry::new(LocationDraft::from_parts("A", "1", "2"), 3)],
            );

        let err = dispatcher(&warehouse).submit(&submission).unwrap_err();

        assert_eq!(
            err,
            SubmitError::Validation(AllocationError::OverAllocation {
                line: line.key().clone(),
                requested: 6,
                available: 5,
            })
        );
        assert_eq!(warehouse.movement_count(), 0);
    }

    #[test]
    fn repeated_line_within_capacity_settles_to_one_snapshot() {
        let line = line();
        let warehouse = Arc::new(InMemoryWarehouse::with_lines([line.clone()]));
        let submission = AllocationSubmission::new(MovementKind::BinTransfer)
            .with_line(
                line.clone(),
                vec![AllocationEntry::new(LocationDraft::from_parts("A", "1", "1"), 2)],
            )
            .with_line(
                line.clone(),
                vec![AllocationEntry::new(LocationDraft::from_parts("A", "1", "2"), 3)],
            );

        let outcome = dispatcher(&warehouse).submit(&submission).unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.refreshed.len(), 1);
        assert_eq!(outcome.refreshed[0].issued_qty(), 5);
        assert_eq!(outcome.refreshed[0].version(), 1);
    }

    #[test]
    fn outcome_total_saturates() {
        let line = line();
        let warehouse = Arc::new(InMemoryWarehouse::with_lines([line.clone()]));
        let mut outcome = dispatcher(&warehouse).submit(&submission(&line, 1)).unwrap();
        let mut huge = outcome.records[0].clone();
        huge.qty = i64::MAX;
        outcome.records = vec![huge.clone(), huge];

        assert_eq!(outcome.total_qty(), i64::MAX);
    }

    #[test]
    fn retired_line_is_a_transport_failure() {
        let line = line();
        let warehouse = Arc::new(InMemoryWarehouse::new());

        let err = dispatcher(&warehouse).submit(&submission(&line, 1)).unwrap_err();

        assert!(err.is_retryable());
    }

    #[test]
    fn records_carry_the_pre_commit_snapshot() {
        let line = line().record_issue(3).unwrap();
        let warehouse = Arc::new(InMemoryWarehouse::with_lines([line.clone()]));

        let outcome = dispatcher(&warehouse).submit(&submission(&line, 2)).unwrap();

        let output = outcome.records[0].to_output();
        assert_eq!(output.issued_qty, 3);
        assert_eq!(output.remaining_qty, 7);
        assert_eq!(output.new_bin_location, "A-1-2");
        assert_eq!(outcome.refreshed[0].issued_qty(), 5);
    }

    #[test]
    fn held_snapshot_is_rebased_before_commit() {
        let line = line();
        let warehouse = Arc::new(InMemoryWarehouse::with_lines([line.clone()]));
        let dispatcher = dispatcher(&warehouse);

        assert!(dispatcher.submit(&submission(&line, 2)).is_ok());
        // Same (now outdated) snapshot: the dispatcher re-reads version 1.
        assert!(dispatcher.submit(&submission(&line, 2)).is_ok());
        assert_eq!(warehouse.get(line.key()).unwrap().unwrap().issued_qty(), 4);
    }

    #[test]
    fn documents_can_be_disabled() {
        let line = line();
        let warehouse = Arc::new(InMemoryWarehouse::with_lines([line.clone()]));
        let documents = Arc::new(InMemoryDocumentQueue::new());
        let dispatcher = SubmissionDispatcher::new(
            warehouse.clone(),
            warehouse.clone(),
            documents.clone(),
            Arc::new(InMemoryEventBus::<EventEnvelope<AllocationEvent>>::new()),
            Arc::new(CatalogStore::new(catalog())),
        )
        .with_config(EngineConfig::default().with_generate_documents(false));

        dispatcher.submit(&submission(&line, 1)).unwrap();

        assert!(documents.requests().is_empty());
    }
}
