//! Allocation submissions: staged rows grouped by source line.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use wms_core::SubmissionId;

use crate::location::LocationDraft;
use crate::source_line::{SourceLine, SourceLineKey};

/// Which workflow produced a submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Releasing held pickslip stock into bins.
    HoldRelease,
    /// Moving stock between bins.
    BinTransfer,
    /// Putting away a pending receipt.
    ReceiptAllocation,
    /// Adjusting a lot.
    Adjustment,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::HoldRelease => "hold_release",
            MovementKind::BinTransfer => "bin_transfer",
            MovementKind::ReceiptAllocation => "receipt_allocation",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

/// One staged row: a target location and a quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub target: LocationDraft,
    pub qty: i64,
}

impl AllocationEntry {
    pub fn new(target: LocationDraft, qty: i64) -> Self {
        Self { target, qty }
    }

    /// A fresh, untouched row.
    pub fn blank() -> Self {
        Self::default()
    }
}

/// A line and the rows staged against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionLine {
    pub line: SourceLine,
    pub entries: Vec<AllocationEntry>,
}

impl SubmissionLine {
    pub fn key(&self) -> &SourceLineKey {
        self.line.key()
    }

    /// Sum of staged quantities; `None` on overflow.
    pub fn requested_qty(&self) -> Option<i64> {
        self.entries
            .iter()
            .try_fold(0i64, |acc, e| acc.checked_add(e.qty))
    }
}

/// An ordered set of (line, rows) pairs committed as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSubmission {
    id: SubmissionId,
    kind: MovementKind,
    lines: Vec<SubmissionLine>,
}

impl AllocationSubmission {
    pub fn new(kind: MovementKind) -> Self {
        Self::with_id(SubmissionId::new(), kind)
    }

    pub fn with_id(id: SubmissionId, kind: MovementKind) -> Self {
        Self {
            id,
            kind,
            lines: Vec::new(),
        }
    }

    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn lines(&self) -> &[SubmissionLine] {
        &self.lines
    }

    pub fn push_line(&mut self, line: SourceLine, entries: Vec<AllocationEntry>) {
        self.lines.push(SubmissionLine { line, entries });
    }

    /// Builder-style [`Self::push_line`].
    pub fn with_line(mut self, line: SourceLine, entries: Vec<AllocationEntry>) -> Self {
        self.push_line(line, entries);
        self
    }

    /// Distinct line keys, in first-appearance order.
    pub fn keys(&self) -> Vec<SourceLineKey> {
        let mut seen = BTreeSet::new();
        self.lines
            .iter()
            .map(SubmissionLine::key)
            .filter(|key| seen.insert(*key))
            .cloned()
            .collect()
    }

    /// Total staged quantity per line key, in first-appearance order.
    /// `None` for a line whose total overflows.
    pub fn requested_by_line(&self) -> Vec<(&SourceLine, Option<i64>)> {
        let mut totals: Vec<(&SourceLine, Option<i64>)> = Vec::new();
        for staged in &self.lines {
            let requested = staged.requested_qty();
            match totals.iter_mut().find(|(line, _)| line.key() == staged.key()) {
                Some((_, total)) => {
                    *total = total.zip(requested).and_then(|(a, b)| a.checked_add(b));
                }
                None => totals.push((&staged.line, requested)),
            }
        }
        totals
    }

    pub fn entry_count(&self) -> usize {
        self.lines.iter().map(|l| l.entries.len()).sum()
    }

    /// Same rows, with every line snapshot replaced by `lookup`.
    ///
    /// Used to re-read lines immediately before commit.
    pub fn rebased<F, E>(&self, mut lookup: F) -> Result<Self, E>
    where
        F: FnMut(&SourceLineKey) -> Result<SourceLine, E>,
    {
        let lines = self
            .lines
            .iter()
            .map(|staged| {
                Ok(SubmissionLine {
                    line: lookup(staged.key())?,
                    entries: staged.entries.clone(),
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            id: self.id,
            kind: self.kind,
            lines,
        })
    }
}
