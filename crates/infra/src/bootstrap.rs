//! Process startup: logging plus the initial catalog.

use std::sync::Arc;

use tracing::info;

use crate::catalog_store::CatalogStore;
use crate::config::EngineConfig;

/// Install logging and load the catalog named by `config`.
pub fn bootstrap(config: &EngineConfig) -> anyhow::Result<Arc<CatalogStore>> {
    wms_observability::init();

    let store = config.catalog_store()?;
    info!(
        catalog_path = ?config.catalog_path,
        generate_documents = config.generate_documents,
        enforce_line_versions = config.enforce_line_versions,
        locations = store.snapshot().location_count(),
        "allocation engine ready"
    );
    Ok(Arc::new(store))
}

/// [`bootstrap`] with configuration read from the environment.
pub fn init_from_env() -> anyhow::Result<(EngineConfig, Arc<CatalogStore>)> {
    let config = EngineConfig::from_env()?;
    let catalog = bootstrap(&config)?;
    Ok((config, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_without_catalog_path_starts_empty() {
        let catalog = bootstrap(&EngineConfig::default()).unwrap();
        assert!(catalog.snapshot().is_empty());
    }

    #[test]
    fn bootstrap_fails_on_missing_catalog_file() {
        let config = EngineConfig::default().with_catalog_path("/nonexistent/catalog.json");
        assert!(bootstrap(&config).is_err());
    }
}
