//! Movement records: the persisted result of committed rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{MovementId, SubmissionId};

use crate::catalog::LocationResolver;
use crate::error::AllocationResult;
use crate::location::LocationCode;
use crate::source_line::{LineContext, SourceLineKey};
use crate::submission::{AllocationSubmission, MovementKind};

/// One committed row. Append-only: never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub movement_id: MovementId,
    pub submission_id: SubmissionId,
    pub kind: MovementKind,
    pub line: SourceLineKey,
    pub from_location: String,
    pub to_location: LocationCode,
    pub qty: i64,
    pub recorded_at: DateTime<Utc>,
    pub context: LineContext,
    /// Line quantities as known immediately before commit.
    pub ordered_qty: i64,
    pub issued_qty_before: i64,
    pub remaining_qty_before: i64,
}

/// Wire shape sent to persistence for each committed row.
///
/// The field set is consumed verbatim by document generation downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOutput {
    pub document_number: String,
    pub line_id: String,
    pub make: Option<String>,
    pub item_code: String,
    pub batch_number: String,
    /// From.
    pub bin_location: String,
    /// To.
    pub new_bin_location: String,
    pub new_allocated_qty: i64,
    pub issued_qty: i64,
    pub remaining_qty: i64,
    pub ordered_qty: i64,
    pub status: String,
    pub customer_name: String,
    pub issued_at: String,
    pub invoice_number: Option<String>,
}

impl MovementRecord {
    pub fn to_output(&self) -> MovementOutput {
        MovementOutput {
            document_number: self.line.document_number.clone(),
            line_id: self.line.line_id.clone(),
            make: self.context.make.clone(),
            item_code: self.line.item_code.clone(),
            batch_number: self.line.batch_number.clone(),
            bin_location: self.from_location.clone(),
            new_bin_location: self.to_location.to_string(),
            new_allocated_qty: self.qty,
            issued_qty: self.issued_qty_before,
            remaining_qty: self.remaining_qty_before,
            ordered_qty: self.ordered_qty,
            status: self.context.status.clone(),
            customer_name: self.context.customer_name.clone(),
            issued_at: self.context.issued_at.clone(),
            invoice_number: self.context.invoice_number.clone(),
        }
    }
}

/// Assemble one record per row, in submission order.
///
/// Every target is resolved before any record is returned, so a single bad
/// location yields no records at all. Callers validate first; resolution
/// failing here means the catalog snapshot changed in between.
pub fn plan_movements(
    submission: &AllocationSubmission,
    resolver: &LocationResolver<'_>,
    recorded_at: DateTime<Utc>,
) -> AllocationResult<Vec<MovementRecord>> {
    let mut records = Vec::with_capacity(submission.entry_count());
    for staged in submission.lines() {
        let line = &staged.line;
        for entry in &staged.entries {
            let to_location = resolver.resolve_draft(&entry.target)?;
            records.push(MovementRecord {
                movement_id: MovementId::new(),
                submission_id: submission.id(),
                kind: submission.kind(),
                line: line.key().clone(),
                from_location: line.origin_location().to_string(),
                to_location,
                qty: entry.qty,
                recorded_at,
                context: line.context().clone(),
                ordered_qty: line.ordered_qty(),
                issued_qty_before: line.issued_qty(),
                remaining_qty_before: line.remaining_qty(),
            });
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::location::LocationDraft;
    use crate::source_line::SourceLine;
    use crate::submission::AllocationEntry;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.add_section("A").unwrap();
        catalog.add_sub_section("A", "1").unwrap();
        catalog.add_bin("A", "1", "1").unwrap();
        catalog.add_bin("A", "1", "2").unwrap();
        catalog
    }

    fn line() -> SourceLine {
        let context = LineContext {
            make: Some("ACME".to_string()),
            status: "HOLD".to_string(),
            customer_name: "Northwind".to_string(),
            issued_at: "2024-05-01".to_string(),
            invoice_number: Some("INV-9".to_string()),
        };
        SourceLine::new(
            SourceLineKey::new("PS-1", "4", "ITEM-1", "BATCH-1", "H-1-1"),
            10,
            2,
            context,
        )
        .unwrap()
    }

    #[test]
    fn one_record_per_row_with_resolved_targets() {
        let catalog = catalog();
        let resolver = LocationResolver::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease).with_line(
            line(),
            vec![
                AllocationEntry::new(LocationDraft::from_parts("A", "1", "1"), 3),
                AllocationEntry::new(LocationDraft::from_parts("A", "1", "2"), 2),
            ],
        );

        let records = plan_movements(&submission, &resolver, Utc::now()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to_location.as_str(), "A-1");
        assert_eq!(records[1].to_location.as_str(), "A-1-2");
        assert!(records.iter().all(|r| r.from_location == "H-1-1"));
        assert!(records.iter().all(|r| r.submission_id == submission.id()));
        assert_ne!(records[0].movement_id, records[1].movement_id);
    }

    #[test]
    fn unresolvable_row_yields_no_records() {
        let catalog = catalog();
        let resolver = LocationResolver::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease).with_line(
            line(),
            vec![
                AllocationEntry::new(LocationDraft::from_parts("A", "1", "1"), 3),
                AllocationEntry::new(LocationDraft::from_parts("A", "1", "8"), 2),
            ],
        );

        assert!(plan_movements(&submission, &resolver, Utc::now()).is_err());
    }

    #[test]
    fn output_carries_the_documented_field_set() {
        let catalog = catalog();
        let resolver = LocationResolver::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease).with_line(
            line(),
            vec![AllocationEntry::new(LocationDraft::from_parts("A", "1", "2"), 3)],
        );
        let records = plan_movements(&submission, &resolver, Utc::now()).unwrap();

        let value = serde_json::to_value(records[0].to_output()).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();

        assert_eq!(
            keys,
            vec![
                "batch_number",
                "bin_location",
                "customer_name",
                "document_number",
                "invoice_number",
                "issued_at",
                "issued_qty",
                "item_code",
                "line_id",
                "make",
                "new_allocated_qty",
                "new_bin_location",
                "ordered_qty",
                "remaining_qty",
                "status",
            ]
        );
        assert_eq!(value["bin_location"], "H-1-1");
        assert_eq!(value["new_bin_location"], "A-1-2");
        assert_eq!(value["new_allocated_qty"], 3);
        assert_eq!(value["issued_qty"], 2);
        assert_eq!(value["remaining_qty"], 8);
    }
}
