//! Field and quantity rules for staged rows and whole submissions.

use std::collections::BTreeMap;

use crate::catalog::{Catalog, LocationResolver};
use crate::error::{AllocationError, AllocationResult};
use crate::source_line::SourceLineKey;
use crate::submission::{AllocationEntry, AllocationSubmission, SubmissionLine};

/// Validates rows and submissions against one catalog snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MovementValidator<'a> {
    resolver: LocationResolver<'a>,
}

impl<'a> MovementValidator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            resolver: LocationResolver::new(catalog),
        }
    }

    pub fn resolver(&self) -> LocationResolver<'a> {
        self.resolver
    }

    /// Check one row: every location part set, positive quantity, and a
    /// location the catalog knows.
    pub fn validate_entry(
        &self,
        line: &SourceLineKey,
        row: usize,
        entry: &AllocationEntry,
    ) -> AllocationResult<()> {
        if let Some(field) = entry.target.missing_field() {
            return Err(AllocationError::MissingField {
                line: line.clone(),
                row,
                field,
            });
        }
        if entry.qty <= 0 {
            return Err(AllocationError::NonPositiveQty {
                line: line.clone(),
                row,
                qty: entry.qty,
            });
        }
        self.resolver
            .resolve_draft(&entry.target)
            .map(|_| ())
            .map_err(|err| match err {
                AllocationError::InvalidLocation {
                    section,
                    sub_section,
                    bin,
                } => AllocationError::UnknownLocation {
                    line: line.clone(),
                    row,
                    location: format!("{section}/{sub_section}/{bin}"),
                },
                other => other,
            })
    }

    /// Check submission-level rules against the line snapshots it carries.
    ///
    /// The snapshots must be the ones read immediately before commit; a
    /// quantity staged against an older snapshot is re-checked here.
    pub fn validate_submission(&self, submission: &AllocationSubmission) -> AllocationResult<()> {
        let any_positive = submission
            .lines()
            .iter()
            .flat_map(|l| l.entries.iter())
            .any(|e| e.qty > 0);
        if !any_positive {
            return Err(AllocationError::EmptySubmission);
        }

        check_capacity(submission.lines())
    }

    /// Submission rules first, then every row in order. Reports the first
    /// violation found.
    pub fn validate(&self, submission: &AllocationSubmission) -> AllocationResult<()> {
        self.validate_submission(submission)?;
        for staged in submission.lines() {
            for (row, entry) in staged.entries.iter().enumerate() {
                self.validate_entry(staged.key(), row, entry)?;
            }
        }
        Ok(())
    }
}

/// Sum requested quantities per line key (a line may be listed more than
/// once) and compare each running total with the line's remaining quantity.
/// Lines are checked in submission order.
fn check_capacity(lines: &[SubmissionLine]) -> AllocationResult<()> {
    let mut totals: BTreeMap<&SourceLineKey, i64> = BTreeMap::new();
    for staged in lines {
        let total = totals.entry(staged.key()).or_insert(0);
        let before = *total;
        *total = staged
            .requested_qty()
            .and_then(|qty| before.checked_add(qty))
            .unwrap_or(i64::MAX);

        let available = staged.line.remaining_qty();
        if *total > available {
            return Err(AllocationError::OverAllocation {
                line: staged.key().clone(),
                requested: *total,
                available,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{LocationDraft, LocationField};
    use crate::source_line::{LineContext, SourceLine};
    use crate::submission::MovementKind;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.add_section("A").unwrap();
        catalog.add_sub_section("A", "1").unwrap();
        catalog.add_bin("A", "1", "1").unwrap();
        catalog.add_bin("A", "1", "2").unwrap();
        catalog
    }

    fn line(ordered: i64, issued: i64) -> SourceLine {
        SourceLine::new(
            SourceLineKey::new("PS-1", "1", "ITEM", "BATCH", "H-1-1"),
            ordered,
            issued,
            LineContext::default(),
        )
        .unwrap()
    }

    fn entry(bin: &str, qty: i64) -> AllocationEntry {
        AllocationEntry::new(LocationDraft::from_parts("A", "1", bin), qty)
    }

    #[test]
    fn rejects_zero_and_negative_quantities() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let key = line(10, 0).key().clone();

        for qty in [0, -3] {
            let err = validator.validate_entry(&key, 0, &entry("1", qty)).unwrap_err();
            assert_eq!(
                err,
                AllocationError::NonPositiveQty {
                    line: key.clone(),
                    row: 0,
                    qty,
                }
            );
        }
    }

    #[test]
    fn reports_the_first_missing_field() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let key = line(10, 0).key().clone();

        let mut target = LocationDraft::new();
        target.set_section(Some("A".to_string()));
        let err = validator
            .validate_entry(&key, 2, &AllocationEntry::new(target, 1))
            .unwrap_err();

        assert_eq!(
            err,
            AllocationError::MissingField {
                line: key,
                row: 2,
                field: LocationField::SubSection,
            }
        );
    }

    #[test]
    fn unknown_location_names_the_triple() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let key = line(10, 0).key().clone();

        let err = validator.validate_entry(&key, 0, &entry("9", 1)).unwrap_err();
        match err {
            AllocationError::UnknownLocation { location, .. } => assert_eq!(location, "A/1/9"),
            other => panic!("expected UnknownLocation, got {other:?}"),
        }
    }

    #[test]
    fn over_allocation_across_rows_is_rejected() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease)
            .with_line(line(10, 5), vec![entry("1", 3), entry("2", 3)]);

        let err = validator.validate(&submission).unwrap_err();
        assert_eq!(
            err,
            AllocationError::OverAllocation {
                line: line(10, 5).key().clone(),
                requested: 6,
                available: 5,
            }
        );
    }

    #[test]
    fn repeated_line_is_checked_against_its_combined_total() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease)
            .with_line(line(10, 5), vec![entry("1", 3)])
            .with_line(line(10, 5), vec![entry("2", 3)]);

        assert_eq!(
            validator.validate(&submission),
            Err(AllocationError::OverAllocation {
                line: line(10, 5).key().clone(),
                requested: 6,
                available: 5,
            })
        );
    }

    #[test]
    fn repeated_line_within_capacity_is_accepted() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease)
            .with_line(line(10, 5), vec![entry("1", 2)])
            .with_line(line(10, 5), vec![entry("2", 3)]);

        assert!(validator.validate(&submission).is_ok());
    }

    #[test]
    fn exact_fit_is_accepted() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::BinTransfer)
            .with_line(line(10, 5), vec![entry("1", 2), entry("2", 3)]);

        assert!(validator.validate(&submission).is_ok());
    }

    #[test]
    fn submission_without_positive_rows_is_empty() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);

        let none = AllocationSubmission::new(MovementKind::Adjustment);
        assert_eq!(validator.validate(&none), Err(AllocationError::EmptySubmission));

        let zeros = AllocationSubmission::new(MovementKind::Adjustment)
            .with_line(line(10, 0), vec![AllocationEntry::blank(), entry("1", 0)]);
        assert_eq!(validator.validate(&zeros), Err(AllocationError::EmptySubmission));
    }

    #[test]
    fn zero_row_next_to_a_positive_row_is_non_positive() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease)
            .with_line(line(10, 0), vec![entry("1", 4), entry("2", 0)]);

        match validator.validate(&submission).unwrap_err() {
            AllocationError::NonPositiveQty { row, qty, .. } => {
                assert_eq!(row, 1);
                assert_eq!(qty, 0);
            }
            other => panic!("expected NonPositiveQty, got {other:?}"),
        }
    }

    #[test]
    fn overflowing_sum_is_over_allocation() {
        let catalog = catalog();
        let validator = MovementValidator::new(&catalog);
        let submission = AllocationSubmission::new(MovementKind::HoldRelease)
            .with_line(line(10, 0), vec![entry("1", i64::MAX), entry("2", 1)]);

        assert!(matches!(
            validator.validate_submission(&submission),
            Err(AllocationError::OverAllocation { requested: i64::MAX, .. })
        ));
    }
}
