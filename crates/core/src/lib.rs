//! `wms-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns)
//! shared by the allocation engine and its infrastructure adapters.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{MovementId, SubmissionId};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
