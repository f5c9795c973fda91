//! Storage locations: the section / sub-section / bin hierarchy.

use serde::{Deserialize, Serialize};

use wms_core::ValueObject;

/// Separator between location segments in a canonical code.
pub const SEGMENT_SEPARATOR: char = '-';

/// A fully specified storage location.
///
/// Catalog membership is not checked here; see [`crate::LocationResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    section: String,
    sub_section: String,
    bin: String,
}

impl ValueObject for Location {}

impl Location {
    pub fn new(
        section: impl Into<String>,
        sub_section: impl Into<String>,
        bin: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into().trim().to_string(),
            sub_section: sub_section.into().trim().to_string(),
            bin: bin.into().trim().to_string(),
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn sub_section(&self) -> &str {
        &self.sub_section
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// The catalog marks an undivided sub-section by listing a bin that
    /// repeats the sub-section name.
    pub fn is_whole_sub_section(&self) -> bool {
        self.bin == self.sub_section
    }

    /// Canonical code: `section-subSection` for a whole sub-section,
    /// `section-subSection-bin` otherwise.
    pub fn code(&self) -> LocationCode {
        let code = if self.is_whole_sub_section() {
            format!("{}{SEGMENT_SEPARATOR}{}", self.section, self.sub_section)
        } else {
            format!(
                "{}{SEGMENT_SEPARATOR}{}{SEGMENT_SEPARATOR}{}",
                self.section, self.sub_section, self.bin
            )
        };
        LocationCode(code)
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code().as_str())
    }
}

/// Canonical, catalog-validated location code (e.g. `A-1` or `A-1-3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationCode(String);

impl LocationCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of segments (2 for a whole sub-section, 3 for a bin).
    pub fn segments(&self) -> usize {
        self.0.split(SEGMENT_SEPARATOR).count()
    }
}

impl core::fmt::Display for LocationCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One part of a location, used to name missing fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationField {
    Section,
    SubSection,
    Bin,
}

impl core::fmt::Display for LocationField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            LocationField::Section => "section",
            LocationField::SubSection => "sub_section",
            LocationField::Bin => "bin",
        };
        f.write_str(name)
    }
}

/// A location being edited on a staged row.
///
/// Parents and children cascade: changing the section clears the sub-section
/// and bin, changing the sub-section clears the bin. Blank input is stored as
/// "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDraft {
    section: Option<String>,
    sub_section: Option<String>,
    bin: Option<String>,
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LocationDraft {
    /// An empty draft (nothing picked yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// A draft with all three parts picked.
    pub fn from_parts(
        section: impl Into<String>,
        sub_section: impl Into<String>,
        bin: impl Into<String>,
    ) -> Self {
        Self {
            section: normalize(Some(section.into())),
            sub_section: normalize(Some(sub_section.into())),
            bin: normalize(Some(bin.into())),
        }
    }

    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    pub fn sub_section(&self) -> Option<&str> {
        self.sub_section.as_deref()
    }

    pub fn bin(&self) -> Option<&str> {
        self.bin.as_deref()
    }

    /// Pick a section. Returns `true` when the value changed, in which case
    /// the sub-section and bin have been cleared.
    pub fn set_section(&mut self, section: Option<String>) -> bool {
        let section = normalize(section);
        if section == self.section {
            return false;
        }
        self.section = section;
        self.sub_section = None;
        self.bin = None;
        true
    }

    /// Pick a sub-section. Returns `true` when the value changed, in which
    /// case the bin has been cleared.
    pub fn set_sub_section(&mut self, sub_section: Option<String>) -> bool {
        let sub_section = normalize(sub_section);
        if sub_section == self.sub_section {
            return false;
        }
        self.sub_section = sub_section;
        self.bin = None;
        true
    }

    pub fn set_bin(&mut self, bin: Option<String>) -> bool {
        let bin = normalize(bin);
        if bin == self.bin {
            return false;
        }
        self.bin = bin;
        true
    }

    /// First unset part, top-down.
    pub fn missing_field(&self) -> Option<LocationField> {
        if self.section.is_none() {
            Some(LocationField::Section)
        } else if self.sub_section.is_none() {
            Some(LocationField::SubSection)
        } else if self.bin.is_none() {
            Some(LocationField::Bin)
        } else {
            None
        }
    }

    pub fn is_blank(&self) -> bool {
        self.section.is_none() && self.sub_section.is_none() && self.bin.is_none()
    }

    /// The complete location, if every part is picked.
    pub fn to_location(&self) -> Option<Location> {
        match (&self.section, &self.sub_section, &self.bin) {
            (Some(s), Some(ss), Some(b)) => Some(Location::new(s.as_str(), ss.as_str(), b.as_str())),
            _ => None,
        }
    }
}

impl From<Location> for LocationDraft {
    fn from(value: Location) -> Self {
        Self::from_parts(value.section, value.sub_section, value.bin)
    }
}
