//! Shared, replaceable catalog snapshot.
//!
//! Submissions take an `Arc<Catalog>` at the start and validate against that
//! snapshot only; a reload swaps the pointer and never mutates a catalog a
//! submission may be reading.

use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use wms_allocation::{Catalog, CatalogRecord};
use wms_core::DomainError;

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog is inconsistent: {0}")]
    Invalid(#[from] DomainError),
}

#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn empty() -> Self {
        Self::new(Catalog::empty())
    }

    /// Parse a catalog JSON document (`{"sections": [...], "sub_sections": [...], "bins": [...]}`).
    pub fn parse(json: &str) -> Result<Catalog, CatalogLoadError> {
        let record: CatalogRecord = serde_json::from_str(json)?;
        Ok(Catalog::from_record(record)?)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let catalog = Self::read_file(path.as_ref())?;
        Ok(Self::new(catalog))
    }

    /// Current snapshot. Cheap; callers hold it for the whole submission.
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the catalog. Snapshots already handed out are unaffected.
    pub fn reload(&self, catalog: Catalog) {
        let locations = catalog.location_count();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
        debug!(locations, "catalog reloaded");
    }

    /// Re-read `path` and swap it in. The current catalog stays in place if
    /// the file cannot be loaded.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<(), CatalogLoadError> {
        let catalog = Self::read_file(path.as_ref())?;
        self.reload(catalog);
        Ok(())
    }

    fn read_file(path: &Path) -> Result<Catalog, CatalogLoadError> {
        let raw = fs::read_to_string(path)?;
        let catalog = Self::parse(&raw)?;
        info!(
            path = %path.display(),
            sections = catalog.sections().len(),
            locations = catalog.location_count(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::empty()
    }
}
