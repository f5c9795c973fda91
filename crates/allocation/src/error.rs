//! Allocation error taxonomy.
//!
//! Every variant here is detected locally, before anything is sent to
//! persistence. Messages name the line, the row and the field or quantity
//! involved so they can be shown to the operator as-is.

use thiserror::Error;

use crate::location::LocationField;
use crate::source_line::SourceLineKey;

pub type AllocationResult<T> = Result<T, AllocationError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The (section, sub-section, bin) triple is not in the catalog snapshot.
    #[error("invalid location {section}/{sub_section}/{bin}: not in the current catalog")]
    InvalidLocation {
        section: String,
        sub_section: String,
        bin: String,
    },

    #[error("line {line}, row {row}: {field} is required")]
    MissingField {
        line: SourceLineKey,
        row: usize,
        field: LocationField,
    },

    #[error("line {line}, row {row}: quantity must be greater than zero (got {qty})")]
    NonPositiveQty {
        line: SourceLineKey,
        row: usize,
        qty: i64,
    },

    #[error("line {line}, row {row}: location {location} is not in the current catalog")]
    UnknownLocation {
        line: SourceLineKey,
        row: usize,
        location: String,
    },

    #[error(
        "line {line}: requested {requested} but only {available} remaining (over by {})",
        excess(.requested, .available)
    )]
    OverAllocation {
        line: SourceLineKey,
        requested: i64,
        available: i64,
    },

    #[error("nothing to submit: no row has a quantity greater than zero")]
    EmptySubmission,

    #[error("line {0} is not part of the current allocation")]
    UnknownLine(SourceLineKey),

    #[error("line {line} has no row {row}")]
    EntryIndexOutOfRange { line: SourceLineKey, row: usize },

    #[error("line {line} must keep at least one row")]
    LastEntry { line: SourceLineKey },
}

fn excess(requested: &i64, available: &i64) -> i64 {
    requested.saturating_sub(*available)
}
