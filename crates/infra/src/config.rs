//! Engine configuration.
//!
//! Read from the environment at startup:
//!
//! - `WMS_CATALOG_PATH`: catalog JSON file (optional; empty catalog otherwise)
//! - `WMS_GENERATE_DOCUMENTS`: request documents after commit (default `true`)
//! - `WMS_ENFORCE_LINE_VERSIONS`: commit with exact line versions (default `true`)

use std::path::PathBuf;

use anyhow::{Context, bail};

use crate::catalog_store::CatalogStore;

pub const CATALOG_PATH_VAR: &str = "WMS_CATALOG_PATH";
pub const GENERATE_DOCUMENTS_VAR: &str = "WMS_GENERATE_DOCUMENTS";
pub const ENFORCE_LINE_VERSIONS_VAR: &str = "WMS_ENFORCE_LINE_VERSIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Catalog file loaded at bootstrap.
    pub catalog_path: Option<PathBuf>,
    /// Hand off a document request after every confirmed commit.
    pub generate_documents: bool,
    /// Commit with `ExpectedVersion::Exact` per line instead of `Any`.
    pub enforce_line_versions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            generate_documents: true,
            enforce_line_versions: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests, embedded hosts).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(CATALOG_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.catalog_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = lookup(GENERATE_DOCUMENTS_VAR) {
            config.generate_documents = parse_bool(&raw)
                .with_context(|| format!("invalid {GENERATE_DOCUMENTS_VAR}"))?;
        }
        if let Some(raw) = lookup(ENFORCE_LINE_VERSIONS_VAR) {
            config.enforce_line_versions = parse_bool(&raw)
                .with_context(|| format!("invalid {ENFORCE_LINE_VERSIONS_VAR}"))?;
        }

        Ok(config)
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn with_generate_documents(mut self, enabled: bool) -> Self {
        self.generate_documents = enabled;
        self
    }

    pub fn with_enforce_line_versions(mut self, enabled: bool) -> Self {
        self.enforce_line_versions = enabled;
        self
    }

    /// Catalog store for this configuration.
    pub fn catalog_store(&self) -> anyhow::Result<CatalogStore> {
        match &self.catalog_path {
            Some(path) => CatalogStore::load_file(path)
                .with_context(|| format!("loading catalog from {}", path.display())),
            None => Ok(CatalogStore::empty()),
        }
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => bail!("expected true/false, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.generate_documents);
        assert!(config.enforce_line_versions);
    }

    #[test]
    fn reads_every_variable() {
        let config = EngineConfig::from_lookup(lookup(&[
            (CATALOG_PATH_VAR, "/etc/wms/catalog.json"),
            (GENERATE_DOCUMENTS_VAR, "no"),
            (ENFORCE_LINE_VERSIONS_VAR, "0"),
        ]))
        .unwrap();

        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/wms/catalog.json"))
        );
        assert!(!config.generate_documents);
        assert!(!config.enforce_line_versions);
    }

    #[test]
    fn rejects_unparseable_flags() {
        let err = EngineConfig::from_lookup(lookup(&[(GENERATE_DOCUMENTS_VAR, "maybe")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains(GENERATE_DOCUMENTS_VAR));
    }

    #[test]
    fn missing_catalog_path_gives_an_empty_catalog() {
        let store = EngineConfig::default().catalog_store().unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn unreadable_catalog_path_is_an_error() {
        let config = EngineConfig::default().with_catalog_path("/nonexistent/catalog.json");
        assert!(config.catalog_store().is_err());
    }
}
