//! In-progress allocation state for one workflow instance.
//!
//! The ledger holds the rows an operator is staging, line by line, and gives
//! live remaining-capacity feedback. It keeps no history: committed movements
//! live in persistence, and staged rows disappear on commit or cancel.
//!
//! Invariants:
//! - every open line keeps at least one editable row
//! - a line is open at most once
//! - edits to a row's location cascade (see [`LocationDraft`])

use wms_core::Entity;

use crate::error::{AllocationError, AllocationResult};
use crate::location::LocationDraft;
use crate::source_line::{SourceLine, SourceLineKey};
use crate::submission::{AllocationEntry, AllocationSubmission, MovementKind};

/// A line open in the ledger and its staged rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedLine {
    line: SourceLine,
    entries: Vec<AllocationEntry>,
}

impl StagedLine {
    pub fn line(&self) -> &SourceLine {
        &self.line
    }

    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    pub fn staged_qty(&self) -> i64 {
        self.entries
            .iter()
            .fold(0i64, |acc, e| acc.saturating_add(e.qty))
    }

    /// Remaining after the staged rows; negative when over-staged.
    pub fn remaining_after_staged(&self) -> i64 {
        self.line.remaining_qty().saturating_sub(self.staged_qty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationLedger {
    lines: Vec<StagedLine>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[StagedLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_open(&self, key: &SourceLineKey) -> bool {
        self.position(key).is_some()
    }

    /// Bring a line into the workflow with one blank row.
    ///
    /// Re-opening an open line only replaces its snapshot; rows are kept.
    pub fn open_line(&mut self, line: SourceLine) {
        match self.position(line.key()) {
            Some(idx) => self.lines[idx].line = line,
            None => self.lines.push(StagedLine {
                line,
                entries: vec![AllocationEntry::blank()],
            }),
        }
    }

    /// Drop a line and its rows (cancel for that line).
    pub fn close_line(&mut self, key: &SourceLineKey) -> AllocationResult<StagedLine> {
        let idx = self.require(key)?;
        Ok(self.lines.remove(idx))
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Append a row; returns its index.
    pub fn add_entry(
        &mut self,
        key: &SourceLineKey,
        target: LocationDraft,
        qty: i64,
    ) -> AllocationResult<usize> {
        let staged = self.staged_mut(key)?;
        staged.entries.push(AllocationEntry::new(target, qty));
        Ok(staged.entries.len() - 1)
    }

    /// Remove a row. The last remaining row of a line cannot be removed.
    pub fn remove_entry(&mut self, key: &SourceLineKey, row: usize) -> AllocationResult<AllocationEntry> {
        let staged = self.staged_mut(key)?;
        if row >= staged.entries.len() {
            return Err(AllocationError::EntryIndexOutOfRange {
                line: key.clone(),
                row,
            });
        }
        if staged.entries.len() == 1 {
            return Err(AllocationError::LastEntry { line: key.clone() });
        }
        Ok(staged.entries.remove(row))
    }

    pub fn entries(&self, key: &SourceLineKey) -> AllocationResult<&[AllocationEntry]> {
        let idx = self.require(key)?;
        Ok(&self.lines[idx].entries)
    }

    pub fn set_section(
        &mut self,
        key: &SourceLineKey,
        row: usize,
        section: Option<String>,
    ) -> AllocationResult<()> {
        self.entry_mut(key, row)?.target.set_section(section);
        Ok(())
    }

    pub fn set_sub_section(
        &mut self,
        key: &SourceLineKey,
        row: usize,
        sub_section: Option<String>,
    ) -> AllocationResult<()> {
        self.entry_mut(key, row)?.target.set_sub_section(sub_section);
        Ok(())
    }

    pub fn set_bin(&mut self, key: &SourceLineKey, row: usize, bin: Option<String>) -> AllocationResult<()> {
        self.entry_mut(key, row)?.target.set_bin(bin);
        Ok(())
    }

    pub fn set_qty(&mut self, key: &SourceLineKey, row: usize, qty: i64) -> AllocationResult<()> {
        self.entry_mut(key, row)?.qty = qty;
        Ok(())
    }

    pub fn staged_qty(&self, key: &SourceLineKey) -> AllocationResult<i64> {
        let idx = self.require(key)?;
        Ok(self.lines[idx].staged_qty())
    }

    /// `remainingQty - staged`, for live feedback. May be negative.
    pub fn compute_remaining(&self, key: &SourceLineKey) -> AllocationResult<i64> {
        let idx = self.require(key)?;
        Ok(self.lines[idx].remaining_after_staged())
    }

    /// Snapshot the staged state; the ledger is not modified.
    pub fn to_submission(&self, kind: MovementKind) -> AllocationSubmission {
        self.lines
            .iter()
            .fold(AllocationSubmission::new(kind), |submission, staged| {
                submission.with_line(staged.line.clone(), staged.entries.clone())
            })
    }

    /// Replace snapshots of open lines, keeping their rows. Lines that are
    /// no longer pending (or absent from `fresh`) are dropped.
    pub fn refresh_lines(&mut self, fresh: &[SourceLine]) {
        self.lines.retain_mut(|staged| {
            match fresh.iter().find(|l| l.same_identity_as(&staged.line)) {
                Some(line) if line.is_pending() => {
                    staged.line = line.clone();
                    true
                }
                _ => false,
            }
        });
    }

    /// Settle after a confirmed commit: committed rows are discarded, lines
    /// that still have capacity restart with one blank row, the rest are
    /// dropped.
    pub fn settle_committed(&mut self, fresh: &[SourceLine]) {
        self.refresh_lines(fresh);
        for staged in &mut self.lines {
            staged.entries = vec![AllocationEntry::blank()];
        }
    }

    fn position(&self, key: &SourceLineKey) -> Option<usize> {
        self.lines.iter().position(|s| s.line.key() == key)
    }

    fn require(&self, key: &SourceLineKey) -> AllocationResult<usize> {
        self.position(key)
            .ok_or_else(|| AllocationError::UnknownLine(key.clone()))
    }

    fn staged_mut(&mut self, key: &SourceLineKey) -> AllocationResult<&mut StagedLine> {
        let idx = self.require(key)?;
        Ok(&mut self.lines[idx])
    }

    fn entry_mut(&mut self, key: &SourceLineKey, row: usize) -> AllocationResult<&mut AllocationEntry> {
        let staged = self.staged_mut(key)?;
        staged
            .entries
            .get_mut(row)
            .ok_or_else(|| AllocationError::EntryIndexOutOfRange {
                line: key.clone(),
                row,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_line::LineContext;

    fn line(doc: &str, ordered: i64, issued: i64) -> SourceLine {
        SourceLine::new(
            SourceLineKey::new(doc, "1", "ITEM", "BATCH", "H-1-1"),
            ordered,
            issued,
            LineContext::default(),
        )
        .unwrap()
    }

    fn target(bin: &str) -> LocationDraft {
        LocationDraft::from_parts("A", "1", bin)
    }

    #[test]
    fn open_line_starts_with_one_blank_row() {
        let mut ledger = AllocationLedger::new();
        let l = line("PS-1", 10, 0);
        ledger.open_line(l.clone());

        assert_eq!(ledger.entries(l.key()).unwrap(), &[AllocationEntry::blank()]);
        assert_eq!(ledger.compute_remaining(l.key()).unwrap(), 10);
    }

    #[test]
    fn compute_remaining_subtracts_staged_rows() {
        let mut ledger = AllocationLedger::new();
        let l = line("PS-1", 10, 2);
        ledger.open_line(l.clone());
        ledger.set_qty(l.key(), 0, 3).unwrap();
        ledger.add_entry(l.key(), target("2"), 4).unwrap();

        assert_eq!(ledger.staged_qty(l.key()).unwrap(), 7);
        assert_eq!(ledger.compute_remaining(l.key()).unwrap(), 1);

        ledger.add_entry(l.key(), target("3"), 5).unwrap();
        assert_eq!(ledger.compute_remaining(l.key()).unwrap(), -4);
    }

    #[test]
    fn removing_the_last_row_is_refused() {
        let mut ledger = AllocationLedger::new();
        let l = line("PS-1", 10, 0);
        ledger.open_line(l.clone());

        let err = ledger.remove_entry(l.key(), 0).unwrap_err();
        assert_eq!(err, AllocationError::LastEntry { line: l.key().clone() });
        assert_eq!(ledger.entries(l.key()).unwrap().len(), 1);
    }

    #[test]
    fn removing_a_middle_row_keeps_the_others_intact() {
        let mut ledger = AllocationLedger::new();
        let l = line("PS-1", 10, 0);
        ledger.open_line(l.clone());
        ledger.set_qty(l.key(), 0, 1).unwrap();
        ledger.add_entry(l.key(), target("2"), 2).unwrap();
        ledger.add_entry(l.key(), target("3"), 3).unwrap();

        let removed = ledger.remove_entry(l.key(), 1).unwrap();

        assert_eq!(removed, AllocationEntry::new(target("2"), 2));
        let rows = ledger.entries(l.key()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], AllocationEntry::new(LocationDraft::new(), 1));
        assert_eq!(rows[1], AllocationEntry::new(target("3"), 3));
    }

    #[test]
    fn out_of_range_row_is_reported() {
        let mut ledger = AllocationLedger::new();
        let l = line("PS-1", 10, 0);
        ledger.open_line(l.clone());
        ledger.add_entry(l.key(), target("2"), 2).unwrap();

        assert_eq!(
            ledger.remove_entry(l.key(), 5),
            Err(AllocationError::EntryIndexOutOfRange {
                line: l.key().clone(),
                row: 5,
            })
        );
    }

    #[test]
    fn unknown_line_is_reported() {
        let mut ledger = AllocationLedger::new();
        let l = line("PS-1", 10, 0);
        assert_eq!(
            ledger.add_entry(l.key(), target("1"), 1),
            Err(AllocationError::UnknownLine(l.key().clone()))
        );
    }

    #[test]
    fn editing_a_row_cascades_location_resets() {
        let mut ledger = AllocationLedger::new();
        let l = line("PS-1", 10, 0);
        ledger.open_line(l.clone());
        ledger.add_entry(l.key(), target("2"), 2).unwrap();

        ledger.set_sub_section(l.key(), 1, Some("9".to_string())).unwrap();
        let row = &ledger.entries(l.key()).unwrap()[1];
        assert_eq!(row.target.section(), Some("A"));
        assert_eq!(row.target.bin(), None);

        ledger.set_section(l.key(), 1, Some("B".to_string())).unwrap();
        let row = &ledger.entries(l.key()).unwrap()[1];
        assert_eq!(row.target.sub_section(), None);
        assert_eq!(row.target.bin(), None);
        assert_eq!(row.qty, 2);
    }

    #[test]
    fn reopening_a_line_keeps_rows_and_updates_snapshot() {
        let mut ledger = AllocationLedger::new();
        ledger.open_line(line("PS-1", 10, 0));
        let key = line("PS-1", 10, 0).key().clone();
        ledger.add_entry(&key, target("2"), 2).unwrap();

        ledger.open_line(line("PS-1", 10, 5));

        assert_eq!(ledger.lines().len(), 1);
        assert_eq!(ledger.entries(&key).unwrap().len(), 2);
        assert_eq!(ledger.compute_remaining(&key).unwrap(), 3);
    }

    #[test]
    fn to_submission_preserves_line_order_and_rows() {
        let mut ledger = AllocationLedger::new();
        let a = line("PS-1", 10, 0);
        let b = line("PS-2", 5, 0);
        ledger.open_line(a.clone());
        ledger.open_line(b.clone());
        ledger.set_qty(b.key(), 0, 5).unwrap();

        let submission = ledger.to_submission(MovementKind::HoldRelease);

        assert_eq!(submission.keys(), vec![a.key().clone(), b.key().clone()]);
        assert_eq!(submission.lines()[1].entries[0].qty, 5);
        assert_eq!(ledger.staged_qty(b.key()).unwrap(), 5);
    }

    #[test]
    fn settle_committed_drops_exhausted_lines_and_resets_rows() {
        let mut ledger = AllocationLedger::new();
        let a = line("PS-1", 10, 0);
        let b = line("PS-2", 5, 0);
        ledger.open_line(a.clone());
        ledger.open_line(b.clone());
        ledger.add_entry(a.key(), target("2"), 4).unwrap();

        ledger.settle_committed(&[line("PS-1", 10, 4), line("PS-2", 5, 5)]);

        assert_eq!(ledger.lines().len(), 1);
        assert_eq!(ledger.entries(a.key()).unwrap(), &[AllocationEntry::blank()]);
        assert_eq!(ledger.compute_remaining(a.key()).unwrap(), 6);
        assert!(!ledger.is_open(b.key()));
    }
}
