//! Append-only movement persistence boundary.
//!
//! This module defines the infrastructure-facing abstraction the engine
//! commits movement records through, without making storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryWarehouse;
pub use r#trait::{CommitReceipt, LineExpectation, MovementBatch, MovementStore, MovementStoreError};
