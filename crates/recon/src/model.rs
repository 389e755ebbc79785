use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One data line of a tabular input: an open column → value mapping.
///
/// Columns are whatever the source header declared; nothing here assumes a
/// schema. `ordinal` is the 0-based data-row index within its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub ordinal: usize,
    pub fields: HashMap<String, String>,
}

impl Row {
    pub fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            fields: HashMap::new(),
        }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<'a>(ordinal: usize, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { ordinal, fields }
    }

    /// Trimmed value of `column`, `""` when absent.
    pub fn get(&self, column: &str) -> String {
        crate::normalize::normalize(self.fields.get(column).map(String::as_str))
    }

    /// First non-empty trimmed value among `columns`, in order.
    pub fn first_of(&self, columns: &[&str]) -> String {
        columns
            .iter()
            .map(|c| self.get(c))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Which rule of a key chain produced an [`InvoiceKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyBasis {
    InvoiceNumber,
    InvoiceId,
    XeroNumber,
    InternalKey,
    DateContactAmount,
    DateContact,
    RowOrdinal,
}

impl fmt::Display for KeyBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvoiceNumber => write!(f, "invoice_number"),
            Self::InvoiceId => write!(f, "invoice_id"),
            Self::XeroNumber => write!(f, "xero_number"),
            Self::InternalKey => write!(f, "internal_key"),
            Self::DateContactAmount => write!(f, "date+contact+amount"),
            Self::DateContact => write!(f, "date+contact"),
            Self::RowOrdinal => write!(f, "row_ordinal"),
        }
    }
}

/// Derived invoice identity. Rows with equal keys are the same invoice.
///
/// The rendered value embeds a tag for its basis, so equal values always
/// share a basis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvoiceKey {
    pub value: String,
    pub basis: KeyBasis,
}

impl InvoiceKey {
    pub fn new(value: impl Into<String>, basis: KeyBasis) -> Self {
        Self {
            value: value.into(),
            basis,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for InvoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A single output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Amount(f64),
    Count(usize),
}

impl Cell {
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Amount(v) => format!("{v:.2}"),
            Self::Count(n) => n.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One flattened output row: an open column → cell mapping.
pub type OutputRecord = BTreeMap<String, Cell>;

/// Three-way join classification of an invoice key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinStatus {
    #[serde(rename = "Both")]
    Both,
    #[serde(rename = "Ledger_Only")]
    LedgerOnly,
    #[serde(rename = "Master_Only")]
    MasterOnly,
}

impl JoinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Both => "Both",
            Self::LedgerOnly => "Ledger_Only",
            Self::MasterOnly => "Master_Only",
        }
    }
}

impl fmt::Display for JoinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Summary records
// ---------------------------------------------------------------------------

/// Partition and row counts for one join run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinSummary {
    pub keys_total: usize,
    pub keys_both: usize,
    pub keys_ledger_only: usize,
    pub keys_master_only: usize,
    pub ledger_rows: usize,
    pub master_rows: usize,
    pub ledger_groups: usize,
    pub master_groups: usize,
    pub output_rows: usize,
}

/// Invoice and line counts for one rollup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollupSummary {
    pub invoices: usize,
    pub lines: usize,
    pub non_iso_dates: usize,
}

/// Structured outcome of a run, success or failure.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunRecord {
    Join {
        ok: bool,
        year: String,
        csv_key: String,
        strategy: String,
        #[serde(flatten)]
        summary: JoinSummary,
    },
    Rollup {
        ok: bool,
        year: String,
        csv_key: String,
        #[serde(flatten)]
        summary: RollupSummary,
    },
    Failure {
        ok: bool,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        which: Option<String>,
        context: BTreeMap<String, String>,
    },
}

impl RunRecord {
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Join { ok, .. } | Self::Rollup { ok, .. } | Self::Failure { ok, .. } => *ok,
        }
    }

    /// Failure record for `err`, echoing the run's input context.
    pub fn failure(err: &crate::error::RunError, context: BTreeMap<String, String>) -> Self {
        Self::Failure {
            ok: false,
            error: err.to_string(),
            which: err.source_role().map(|s| s.as_str().to_string()),
            context,
        }
    }
}
