//! Location catalog and resolver.
//!
//! The catalog is a snapshot of the physical storage hierarchy as published by
//! the warehouse API. It is read-mostly: the engine never mutates a snapshot,
//! callers swap in a new one on an explicit reload.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult};

use crate::error::{AllocationError, AllocationResult};
use crate::location::{Location, LocationCode, LocationDraft, SEGMENT_SEPARATOR};

/// Wire row: `{section}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRow {
    pub section: String,
}

/// Wire row: `{section, sub_section}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSectionRow {
    pub section: String,
    pub sub_section: String,
}

/// Bin names of a bin row; the API sends either one name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinNames {
    One(String),
    Many(Vec<String>),
}

impl BinNames {
    fn into_vec(self) -> Vec<String> {
        match self {
            BinNames::One(name) => vec![name],
            BinNames::Many(names) => names,
        }
    }
}

/// Wire row: `{section, sub_section, bins}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRow {
    pub section: String,
    pub sub_section: String,
    pub bins: BinNames,
}

/// Catalog as received from the warehouse API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub sections: Vec<SectionRow>,
    #[serde(default)]
    pub sub_sections: Vec<SubSectionRow>,
    #[serde(default)]
    pub bins: Vec<BinRow>,
}

/// section -> sub-section -> bins
type Hierarchy = BTreeMap<String, BTreeMap<String, BTreeSet<String>>>;

/// Validated catalog snapshot.
///
/// Every sub-section belongs to a known section and every bin to a known
/// (section, sub-section) pair. Listings are returned in sorted order so
/// cascading pickers render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    sections: Hierarchy,
}

/// Names are joined with [`SEGMENT_SEPARATOR`] into location codes, so a
/// name containing it would make two locations share one code.
fn clean(value: &str, what: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be empty")));
    }
    if value.contains(SEGMENT_SEPARATOR) {
        return Err(DomainError::validation(format!(
            "{what} {value:?} cannot contain '{SEGMENT_SEPARATOR}'"
        )));
    }
    Ok(value.to_string())
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from the wire record, rejecting orphan rows.
    pub fn from_record(record: CatalogRecord) -> DomainResult<Self> {
        let mut catalog = Self::empty();
        for row in record.sections {
            catalog.add_section(&row.section)?;
        }
        for row in record.sub_sections {
            catalog.add_sub_section(&row.section, &row.sub_section)?;
        }
        for row in record.bins {
            for bin in row.bins.into_vec() {
                catalog.add_bin(&row.section, &row.sub_section, &bin)?;
            }
        }
        Ok(catalog)
    }

    /// Flatten back into the wire shape (one bin row per sub-section).
    pub fn to_record(&self) -> CatalogRecord {
        let mut record = CatalogRecord::default();
        for (section, subs) in &self.sections {
            record.sections.push(SectionRow {
                section: section.clone(),
            });
            for (sub_section, bins) in subs {
                record.sub_sections.push(SubSectionRow {
                    section: section.clone(),
                    sub_section: sub_section.clone(),
                });
                if !bins.is_empty() {
                    record.bins.push(BinRow {
                        section: section.clone(),
                        sub_section: sub_section.clone(),
                        bins: BinNames::Many(bins.iter().cloned().collect()),
                    });
                }
            }
        }
        record
    }

    pub fn add_section(&mut self, section: &str) -> DomainResult<()> {
        let section = clean(section, "section")?;
        self.sections.entry(section).or_default();
        Ok(())
    }

    pub fn add_sub_section(&mut self, section: &str, sub_section: &str) -> DomainResult<()> {
        let sub_section = clean(sub_section, "sub_section")?;
        let subs = self.sections.get_mut(section.trim()).ok_or_else(|| {
            DomainError::validation(format!(
                "sub_section {sub_section} references unknown section {section}"
            ))
        })?;
        subs.entry(sub_section).or_default();
        Ok(())
    }

    pub fn add_bin(&mut self, section: &str, sub_section: &str, bin: &str) -> DomainResult<()> {
        let bin = clean(bin, "bin")?;
        let bins = self
            .sections
            .get_mut(section.trim())
            .and_then(|subs| subs.get_mut(sub_section.trim()))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "bin {bin} references unknown sub_section {section}/{sub_section}"
                ))
            })?;
        bins.insert(bin);
        Ok(())
    }

    pub fn contains(&self, section: &str, sub_section: &str, bin: &str) -> bool {
        self.sections
            .get(section)
            .and_then(|subs| subs.get(sub_section))
            .is_some_and(|bins| bins.contains(bin))
    }

    pub fn sections(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    /// Sub-sections of `section` (empty when the section is unknown).
    pub fn sub_sections(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .map(|subs| subs.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Bins of `(section, sub_section)` (empty when the pair is unknown).
    pub fn bins(&self, section: &str, sub_section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .and_then(|subs| subs.get(sub_section))
            .map(|bins| bins.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Total number of addressable locations.
    pub fn location_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(|subs| subs.values())
            .map(BTreeSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Resolves location triples to canonical codes against one catalog snapshot.
///
/// Resolution is pure: the same triple against the same snapshot always
/// yields the same result.
#[derive(Debug, Clone, Copy)]
pub struct LocationResolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> LocationResolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn resolve(&self, section: &str, sub_section: &str, bin: &str) -> AllocationResult<LocationCode> {
        self.resolve_location(&Location::new(section, sub_section, bin))
    }

    pub fn resolve_location(&self, location: &Location) -> AllocationResult<LocationCode> {
        if self
            .catalog
            .contains(location.section(), location.sub_section(), location.bin())
        {
            Ok(location.code())
        } else {
            Err(AllocationError::InvalidLocation {
                section: location.section().to_string(),
                sub_section: location.sub_section().to_string(),
                bin: location.bin().to_string(),
            })
        }
    }

    /// Resolve a staged draft; unset parts resolve as blanks (and fail).
    pub fn resolve_draft(&self, draft: &LocationDraft) -> AllocationResult<LocationCode> {
        self.resolve(
            draft.section().unwrap_or_default(),
            draft.sub_section().unwrap_or_default(),
            draft.bin().unwrap_or_default(),
        )
    }
}
