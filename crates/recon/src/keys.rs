//! Invoice identity derivation.
//!
//! Each chain is evaluated top to bottom and the first satisfied rule wins.
//! The join uses a [`MatchingStrategy`] for both sources; the rollup has its
//! own chain ([`rollup_key`]).

use serde::{Deserialize, Serialize};

use crate::model::{InvoiceKey, KeyBasis, Row};
use crate::normalize::{amount_key, invoice_core};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const DATE: &str = "Date";
pub const CONTACT: &str = "Contact";

pub const LEDGER_AMOUNT: &[&str] = &["Gross (AUD)", "Net (AUD)"];
pub const LEDGER_INVOICE_NUMBER: &[&str] = &["Invoice Number", "InvoiceNumber", "Reference"];

pub const MASTER_AMOUNT: &[&str] = &["Amount aud", "Line amount"];
pub const MASTER_INVOICE_NUMBER: &[&str] = &["Xero number", "Invoice number", "Invoice Number"];
pub const MASTER_INVOICE_ID: &str = "Invoice ID";
pub const MASTER_XERO_NUMBER: &str = "Xero number";
pub const MASTER_INTERNAL_KEY: &str = "Key";

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Derives comparable keys for ledger and master rows.
///
/// Both sides of a join must be keyed by the same strategy.
pub trait MatchingStrategy {
    fn name(&self) -> &'static str;
    fn ledger_key(&self, row: &Row, idx: usize) -> InvoiceKey;
    fn master_key(&self, row: &Row, idx: usize) -> InvoiceKey;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    DateContactAmount,
    InvoiceNumber,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateContactAmount => "date_contact_amount",
            Self::InvoiceNumber => "invoice_number",
        }
    }

    pub fn strategy(&self) -> Box<dyn MatchingStrategy> {
        match self {
            Self::DateContactAmount => Box::new(DateContactAmount),
            Self::InvoiceNumber => Box::new(InvoiceNumber),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "date_contact_amount" => Ok(Self::DateContactAmount),
            "invoice_number" => Ok(Self::InvoiceNumber),
            other => Err(format!(
                "unknown strategy \"{other}\" (expected \"date_contact_amount\" or \"invoice_number\")"
            )),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date + contact + exact amount, then date + contact, then row ordinal.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateContactAmount;

impl MatchingStrategy for DateContactAmount {
    fn name(&self) -> &'static str {
        StrategyKind::DateContactAmount.as_str()
    }

    fn ledger_key(&self, row: &Row, idx: usize) -> InvoiceKey {
        composite_key(row, LEDGER_AMOUNT).unwrap_or_else(|| ordinal_key("LEDGER_ROW", idx))
    }

    fn master_key(&self, row: &Row, idx: usize) -> InvoiceKey {
        composite_key(row, MASTER_AMOUNT).unwrap_or_else(|| ordinal_key("MASTER_ROW", idx))
    }
}

/// Invoice number core first, then the date/contact/amount chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvoiceNumber;

impl MatchingStrategy for InvoiceNumber {
    fn name(&self) -> &'static str {
        StrategyKind::InvoiceNumber.as_str()
    }

    fn ledger_key(&self, row: &Row, idx: usize) -> InvoiceKey {
        invoice_number_key(row, LEDGER_INVOICE_NUMBER)
            .unwrap_or_else(|| DateContactAmount.ledger_key(row, idx))
    }

    fn master_key(&self, row: &Row, idx: usize) -> InvoiceKey {
        if let Some(key) = invoice_number_key(row, MASTER_INVOICE_NUMBER) {
            return key;
        }
        let inv_id = row.get(MASTER_INVOICE_ID);
        if !inv_id.is_empty() {
            return InvoiceKey::new(format!("INVID::{inv_id}"), KeyBasis::InvoiceId);
        }
        DateContactAmount.master_key(row, idx)
    }
}

fn invoice_number_key(row: &Row, columns: &[&str]) -> Option<InvoiceKey> {
    let raw = row.first_of(columns);
    if raw.is_empty() {
        return None;
    }
    let core = invoice_core(&raw);
    if core.is_empty() {
        return None;
    }
    Some(InvoiceKey::new(format!("INV::{core}"), KeyBasis::InvoiceNumber))
}

fn composite_key(row: &Row, amount_columns: &[&str]) -> Option<InvoiceKey> {
    let date = row.get(DATE);
    let contact = row.get(CONTACT);
    if date.is_empty() || contact.is_empty() {
        return None;
    }

    let cents = amount_key(&row.first_of(amount_columns));
    if !cents.is_empty() {
        return Some(InvoiceKey::new(
            format!("D+C+A::{date}::{contact}::{cents}"),
            KeyBasis::DateContactAmount,
        ));
    }

    Some(InvoiceKey::new(
        format!("D+C::{date}::{contact}"),
        KeyBasis::DateContact,
    ))
}

fn ordinal_key(tag: &str, idx: usize) -> InvoiceKey {
    InvoiceKey::new(format!("{tag}::{idx}"), KeyBasis::RowOrdinal)
}

// ---------------------------------------------------------------------------
// Rollup chain
// ---------------------------------------------------------------------------

/// Invoice ID, then `XNO::` Xero number, then `KEY::` internal key, then
/// `ROW::` ordinal.
pub fn rollup_key(row: &Row, idx: usize) -> InvoiceKey {
    let inv_id = row.get(MASTER_INVOICE_ID);
    if !inv_id.is_empty() {
        return InvoiceKey::new(inv_id, KeyBasis::InvoiceId);
    }
    let xno = row.get(MASTER_XERO_NUMBER);
    if !xno.is_empty() {
        return InvoiceKey::new(format!("XNO::{xno}"), KeyBasis::XeroNumber);
    }
    let internal = row.get(MASTER_INTERNAL_KEY);
    if !internal.is_empty() {
        return InvoiceKey::new(format!("KEY::{internal}"), KeyBasis::InternalKey);
    }
    ordinal_key("ROW", idx)
}
