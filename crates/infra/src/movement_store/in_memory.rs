use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use chrono::Utc;

use wms_allocation::{MovementRecord, SourceLine, SourceLineKey, SourceLineRecord};

use super::r#trait::{CommitReceipt, MovementBatch, MovementStore, MovementStoreError};
use crate::source_lines::{ProviderError, SourceLineProvider};

#[derive(Debug, Default)]
struct State {
    lines: BTreeMap<SourceLineKey, SourceLine>,
    movements: Vec<MovementRecord>,
}

/// In-memory warehouse backend: source lines plus their movement log.
///
/// Plays both collaborator roles (persistence and line provider) so commits
/// and refreshes observe the same state. It checks version expectations and
/// conservation under one write lock, standing in for the authoritative
/// server. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    state: RwLock<State>,
    fail_next_commit: Mutex<Option<String>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(lines: impl IntoIterator<Item = SourceLine>) -> Self {
        let warehouse = Self::new();
        for line in lines {
            warehouse.upsert_line(line);
        }
        warehouse
    }

    pub fn from_records(
        records: impl IntoIterator<Item = SourceLineRecord>,
    ) -> Result<Self, ProviderError> {
        let lines = records
            .into_iter()
            .map(SourceLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_lines(lines))
    }

    /// Insert or replace a line (a document entering the pending set, or an
    /// out-of-band change by another client).
    pub fn upsert_line(&self, line: SourceLine) {
        if let Ok(mut state) = self.state.write() {
            state.lines.insert(line.key().clone(), line);
        }
    }

    /// Make the next commit fail with a transport error.
    pub fn fail_next_commit(&self, reason: impl Into<String>) {
        if let Ok(mut slot) = self.fail_next_commit.lock() {
            *slot = Some(reason.into());
        }
    }

    pub fn movement_count(&self) -> usize {
        self.state.read().map(|s| s.movements.len()).unwrap_or(0)
    }

    pub fn all_movements(&self) -> Vec<MovementRecord> {
        self.state
            .read()
            .map(|s| s.movements.clone())
            .unwrap_or_default()
    }

    fn take_injected_failure(&self) -> Option<String> {
        self.fail_next_commit.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl MovementStore for InMemoryWarehouse {
    fn commit(&self, batch: MovementBatch) -> Result<CommitReceipt, MovementStoreError> {
        if let Some(reason) = self.take_injected_failure() {
            return Err(MovementStoreError::Transport(reason));
        }
        if batch.records.is_empty() {
            return Err(MovementStoreError::InvalidBatch("batch has no records".to_string()));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| MovementStoreError::Transport("lock poisoned".to_string()))?;

        let mut totals: BTreeMap<&SourceLineKey, i64> = BTreeMap::new();
        for (idx, record) in batch.records.iter().enumerate() {
            if record.submission_id != batch.submission_id {
                return Err(MovementStoreError::InvalidBatch(format!(
                    "record {idx} belongs to submission {}",
                    record.submission_id
                )));
            }
            if record.qty <= 0 {
                return Err(MovementStoreError::InvalidBatch(format!(
                    "record {idx} has non-positive quantity {}",
                    record.qty
                )));
            }
            let total = totals.entry(&record.line).or_insert(0);
            *total = total.checked_add(record.qty).ok_or_else(|| {
                MovementStoreError::Rejected(format!("quantity overflow on line {}", record.line))
            })?;
        }

        // Decide every line before touching any of them.
        let mut updated = Vec::with_capacity(totals.len());
        for (key, total) in totals {
            let expectation = batch
                .expectations
                .iter()
                .find(|e| &e.line == key)
                .ok_or_else(|| {
                    MovementStoreError::InvalidBatch(format!("no version expectation for line {key}"))
                })?;
            let current = state
                .lines
                .get(key)
                .ok_or_else(|| MovementStoreError::UnknownLine(key.to_string()))?;

            expectation
                .expected
                .check(current.version())
                .map_err(|e| MovementStoreError::Concurrency(format!("line {key}: {e}")))?;

            let next = current
                .record_issue(total)
                .map_err(|e| MovementStoreError::Rejected(e.to_string()))?;
            updated.push(next);
        }

        for line in updated {
            state.lines.insert(line.key().clone(), line);
        }
        state.movements.extend(batch.records.iter().cloned());

        Ok(CommitReceipt {
            submission_id: batch.submission_id,
            committed_at: Utc::now(),
            records: batch.records,
        })
    }

    fn history(&self, line: &SourceLineKey) -> Result<Vec<MovementRecord>, MovementStoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| MovementStoreError::Transport("lock poisoned".to_string()))?;
        Ok(state
            .movements
            .iter()
            .filter(|r| &r.line == line)
            .cloned()
            .collect())
    }
}

impl SourceLineProvider for InMemoryWarehouse {
    fn get(&self, key: &SourceLineKey) -> Result<Option<SourceLine>, ProviderError> {
        let state = self
            .state
            .read()
            .map_err(|_| ProviderError::Unavailable("lock poisoned".to_string()))?;
        Ok(state.lines.get(key).cloned())
    }

    fn pending(&self) -> Result<Vec<SourceLine>, ProviderError> {
        let state = self
            .state
            .read()
            .map_err(|_| ProviderError::Unavailable("lock poisoned".to_string()))?;
        Ok(state
            .lines
            .values()
            .filter(|l| l.is_pending())
            .cloned()
            .collect())
    }

    fn refresh(&self, keys: &[SourceLineKey]) -> Result<Vec<SourceLine>, ProviderError> {
        let state = self
            .state
            .read()
            .map_err(|_| ProviderError::Unavailable("lock poisoned".to_string()))?;
        Ok(keys
            .iter()
            .filter_map(|k| state.lines.get(k).cloned())
            .collect())
    }
}
