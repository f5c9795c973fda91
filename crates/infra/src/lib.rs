//! Infrastructure layer: collaborator boundaries, in-memory adapters,
//! configuration and the submission pipeline.

pub mod bootstrap;
pub mod catalog_store;
pub mod config;
pub mod documents;
pub mod movement_store;
pub mod source_lines;
pub mod submission_dispatcher;


pub use catalog_store::{CatalogLoadError, CatalogStore};
pub use config::EngineConfig;
pub use documents::{
    BackgroundDocumentGenerator, DocumentError, DocumentGenerator, DocumentRequest,
    InMemoryDocumentQueue,
};
pub use movement_store::{
    CommitReceipt, InMemoryWarehouse, LineExpectation, MovementBatch, MovementStore,
    MovementStoreError,
};
pub use source_lines::{ProviderError, SourceLineProvider};
pub use submission_dispatcher::{SubmissionDispatcher, SubmitError, SubmitOutcome, SubmitWarning};
