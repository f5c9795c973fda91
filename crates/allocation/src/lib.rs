//! Partial allocation & location-resolution engine (domain layer).
//!
//! This crate turns one inventory movement request (releasing held stock,
//! transferring between bins, allocating a receipt, adjusting a lot) into
//! bin-level movement records while conserving quantities, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod error;
pub mod event;
pub mod ledger;
pub mod location;
pub mod movement;
pub mod source_line;
pub mod submission;
pub mod validator;

pub use catalog::{BinNames, BinRow, Catalog, CatalogRecord, LocationResolver, SectionRow, SubSectionRow};
pub use error::{AllocationError, AllocationResult};
pub use event::{AllocationEvent, DocumentGenerationFailed, SubmissionCommitted, SubmissionRejected};
pub use ledger::{AllocationLedger, StagedLine};
pub use location::{Location, LocationCode, LocationDraft, LocationField};
pub use movement::{MovementOutput, MovementRecord, plan_movements};
pub use source_line::{AllocationStatus, LineContext, SourceLine, SourceLineKey, SourceLineRecord};
pub use submission::{AllocationEntry, AllocationSubmission, MovementKind, SubmissionLine};
pub use validator::MovementValidator;
