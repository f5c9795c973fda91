//! Source lines: inventory records awaiting allocation.
//!
//! A source line is owned by the warehouse API (a held pickslip line, a
//! pending receipt line, ...). The engine reads snapshots of it and proposes
//! deltas; it never creates or deletes lines.

use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, Entity};

/// Identity of a source line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLineKey {
    pub document_number: String,
    pub line_id: String,
    pub item_code: String,
    pub batch_number: String,
    /// Bin the stock currently sits in (the "from" side of a movement).
    pub origin_location: String,
}

impl SourceLineKey {
    pub fn new(
        document_number: impl Into<String>,
        line_id: impl Into<String>,
        item_code: impl Into<String>,
        batch_number: impl Into<String>,
        origin_location: impl Into<String>,
    ) -> Self {
        Self {
            document_number: document_number.into(),
            line_id: line_id.into(),
            item_code: item_code.into(),
            batch_number: batch_number.into(),
            origin_location: origin_location.into(),
        }
    }
}

impl core::fmt::Display for SourceLineKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.document_number, self.line_id)
    }
}

/// Allocation progress of a line, derived from its quantities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Pending,
    PartiallyAllocated,
    /// Terminal: nothing left to allocate.
    FullyAllocated,
}

impl AllocationStatus {
    pub fn from_quantities(ordered_qty: i64, issued_qty: i64) -> Self {
        if issued_qty >= ordered_qty {
            AllocationStatus::FullyAllocated
        } else if issued_qty == 0 {
            AllocationStatus::Pending
        } else {
            AllocationStatus::PartiallyAllocated
        }
    }

    pub fn is_terminal(self) -> bool {
        self == AllocationStatus::FullyAllocated
    }
}

/// Document context copied verbatim into every movement produced for a line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineContext {
    pub make: Option<String>,
    /// Document status as reported by the API (e.g. "HOLD").
    pub status: String,
    pub customer_name: String,
    /// Kept as the API formats it so generated documents reproduce it exactly.
    pub issued_at: String,
    pub invoice_number: Option<String>,
}

/// Wire shape of a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLineRecord {
    pub document_number: String,
    pub line_id: String,
    #[serde(default)]
    pub make: Option<String>,
    pub item_code: String,
    pub batch_number: String,
    pub bin_location: String,
    pub ordered_qty: i64,
    pub issued_qty: i64,
    pub remaining_qty: i64,
    pub status: String,
    pub customer_name: String,
    pub issued_at: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub version: u64,
}

/// Snapshot of one source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    key: SourceLineKey,
    ordered_qty: i64,
    issued_qty: i64,
    version: u64,
    context: LineContext,
}

impl Entity for SourceLine {
    type Id = SourceLineKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

impl SourceLine {
    pub fn new(
        key: SourceLineKey,
        ordered_qty: i64,
        issued_qty: i64,
        context: LineContext,
    ) -> DomainResult<Self> {
        if ordered_qty < 0 {
            return Err(DomainError::validation(format!(
                "line {key}: ordered_qty cannot be negative"
            )));
        }
        if issued_qty < 0 {
            return Err(DomainError::validation(format!(
                "line {key}: issued_qty cannot be negative"
            )));
        }
        if issued_qty > ordered_qty {
            return Err(DomainError::invariant(format!(
                "line {key}: issued_qty {issued_qty} exceeds ordered_qty {ordered_qty}"
            )));
        }
        Ok(Self {
            key,
            ordered_qty,
            issued_qty,
            version: 0,
            context,
        })
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn key(&self) -> &SourceLineKey {
        &self.key
    }

    pub fn ordered_qty(&self) -> i64 {
        self.ordered_qty
    }

    pub fn issued_qty(&self) -> i64 {
        self.issued_qty
    }

    pub fn remaining_qty(&self) -> i64 {
        self.ordered_qty - self.issued_qty
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn context(&self) -> &LineContext {
        &self.context
    }

    pub fn origin_location(&self) -> &str {
        &self.key.origin_location
    }

    pub fn status(&self) -> AllocationStatus {
        AllocationStatus::from_quantities(self.ordered_qty, self.issued_qty)
    }

    /// Still shown in the pending set.
    pub fn is_pending(&self) -> bool {
        !self.status().is_terminal()
    }

    /// Snapshot after a committed issue of `qty`.
    ///
    /// Only moves forward: `qty` must be positive and fit in the remaining
    /// quantity. The version stamp advances by one.
    pub fn record_issue(&self, qty: i64) -> DomainResult<Self> {
        if qty <= 0 {
            return Err(DomainError::validation(format!(
                "line {}: issued quantity must be positive",
                self.key
            )));
        }
        if qty > self.remaining_qty() {
            return Err(DomainError::invariant(format!(
                "line {}: cannot issue {qty}, only {} remaining",
                self.key,
                self.remaining_qty()
            )));
        }
        Ok(Self {
            issued_qty: self.issued_qty + qty,
            version: self.version + 1,
            ..self.clone()
        })
    }

    pub fn to_record(&self) -> SourceLineRecord {
        SourceLineRecord {
            document_number: self.key.document_number.clone(),
            line_id: self.key.line_id.clone(),
            make: self.context.make.clone(),
            item_code: self.key.item_code.clone(),
            batch_number: self.key.batch_number.clone(),
            bin_location: self.key.origin_location.clone(),
            ordered_qty: self.ordered_qty,
            issued_qty: self.issued_qty,
            remaining_qty: self.remaining_qty(),
            status: self.context.status.clone(),
            customer_name: self.context.customer_name.clone(),
            issued_at: self.context.issued_at.clone(),
            invoice_number: self.context.invoice_number.clone(),
            version: self.version,
        }
    }
}

impl TryFrom<SourceLineRecord> for SourceLine {
    type Error = DomainError;

    fn try_from(record: SourceLineRecord) -> Result<Self, Self::Error> {
        let key = SourceLineKey::new(
            record.document_number,
            record.line_id,
            record.item_code,
            record.batch_number,
            record.bin_location,
        );
        if record.remaining_qty < 0 {
            return Err(DomainError::invariant(format!(
                "line {key}: remaining_qty cannot be negative"
            )));
        }
        if record.ordered_qty.checked_sub(record.issued_qty) != Some(record.remaining_qty) {
            return Err(DomainError::invariant(format!(
                "line {key}: remaining_qty {} does not equal ordered_qty {} - issued_qty {}",
                record.remaining_qty, record.ordered_qty, record.issued_qty
            )));
        }
        let context = LineContext {
            make: record.make,
            status: record.status,
            customer_name: record.customer_name,
            issued_at: record.issued_at,
            invoice_number: record.invoice_number,
        };
        Ok(SourceLine::new(key, record.ordered_qty, record.issued_qty, context)?
            .with_version(record.version))
    }
}
