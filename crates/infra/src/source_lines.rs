//! Source line provider boundary.
//!
//! Source lines are owned by the warehouse API. The engine reads snapshots
//! through this trait and asks for a refresh after every confirmed commit.

use std::sync::Arc;

use thiserror::Error;

use wms_allocation::{SourceLine, SourceLineKey};
use wms_core::DomainError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("malformed source line record: {0}")]
    Malformed(#[from] DomainError),

    #[error("source line provider unavailable: {0}")]
    Unavailable(String),
}

pub trait SourceLineProvider: Send + Sync {
    /// Current snapshot of one line (`None` once the API no longer has it).
    fn get(&self, key: &SourceLineKey) -> Result<Option<SourceLine>, ProviderError>;

    /// Lines still awaiting allocation.
    fn pending(&self) -> Result<Vec<SourceLine>, ProviderError>;

    /// Re-read `keys` from the source of truth. Lines the API no longer has
    /// are omitted; fully allocated lines are returned with their final
    /// quantities.
    fn refresh(&self, keys: &[SourceLineKey]) -> Result<Vec<SourceLine>, ProviderError>;
}

impl<P> SourceLineProvider for Arc<P>
where
    P: SourceLineProvider + ?Sized,
{
    fn get(&self, key: &SourceLineKey) -> Result<Option<SourceLine>, ProviderError> {
        (**self).get(key)
    }

    fn pending(&self) -> Result<Vec<SourceLine>, ProviderError> {
        (**self).pending()
    }

    fn refresh(&self, keys: &[SourceLineKey]) -> Result<Vec<SourceLine>, ProviderError> {
        (**self).refresh(keys)
    }
}
