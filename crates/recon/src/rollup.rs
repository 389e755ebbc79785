//! Invoice-level rollup over master rows alone.
//!
//! Each invoice is a [`RollupRecord`] reduced with [`RollupRecord::fold`].
//! Records built over disjoint, in-order chunks combine with
//! [`RollupRecord::merge`] to the same result as a single sequential fold.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::keys::rollup_key;
use crate::model::{Cell, InvoiceKey, OutputRecord, RollupSummary, Row};
use crate::normalize::{is_truthy, parse_amount};

/// `(source column, output column)`; first non-empty value, backfilled.
pub const ROLLUP_DESCRIPTIVE: &[(&str, &str)] = &[
    ("Invoice ID", "Invoice_ID"),
    ("Xero number", "Xero_Number"),
    ("Key", "Key"),
    ("Type", "Type"),
    ("Year", "Source_Year"),
    ("Contact", "Contact"),
    ("Description", "Description"),
    ("Reference", "Reference"),
    ("Currency", "Currency"),
    ("Attributed to", "Attributed_To"),
    ("Attribution method", "Attribution_Method"),
    ("Untracked reason", "Untracked_Reason"),
    ("Reviewer decision", "Reviewer_Decision"),
    ("Doc ID", "Doc_ID"),
];

pub const ROLLUP_SUMS: &[(&str, &str)] = &[
    ("Line amount", "Line_Amount_Sum"),
    ("Amount aud", "Amount_AUD_Sum"),
    ("Gst aud", "GST_AUD_Sum"),
    ("Tax amount", "Tax_Amount_Sum"),
];

pub const ROLLUP_SETS: &[(&str, &str)] = &[
    ("Horse", "Horses"),
    ("Tracking horse", "Tracking_Horses"),
    ("Progeny", "Progeny"),
    ("Category bucket", "Categories"),
    ("Account code", "Account_Codes"),
    ("Reviewer notes", "Reviewer_Notes"),
];

pub const ROLLUP_FLAGS: &[(&str, &str)] = &[
    ("Untracked flag", "Untracked"),
    ("Has attachments", "Has_Attachments"),
];

pub const ROLLUP_LINKS: &[(&str, &str)] = &[
    ("Xero link", "Xero_Link"),
    ("Source Doc", "Source_Doc"),
];

pub const COL_YEAR: &str = "Year";
pub const COL_INVOICE_KEY: &str = "Invoice_Key";
pub const COL_EARLIEST_DATE: &str = "Earliest_Date";
pub const COL_LINE_COUNT: &str = "Line_count";

/// Output column order for the rollup table.
pub fn rollup_columns() -> Vec<&'static str> {
    let mut cols = vec![COL_YEAR, COL_INVOICE_KEY];
    cols.extend(ROLLUP_DESCRIPTIVE.iter().map(|(_, c)| *c));
    cols.push(COL_EARLIEST_DATE);
    cols.push(COL_LINE_COUNT);
    cols.extend(ROLLUP_SUMS.iter().map(|(_, c)| *c));
    cols.extend(ROLLUP_SETS.iter().map(|(_, c)| *c));
    cols.extend(ROLLUP_FLAGS.iter().map(|(_, c)| *c));
    cols.extend(ROLLUP_LINKS.iter().map(|(_, c)| *c));
    cols
}

/// Accumulated state for one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupRecord {
    pub key: InvoiceKey,
    pub descriptive: Vec<String>,
    pub sums: Vec<f64>,
    pub line_count: usize,
    pub sets: Vec<BTreeSet<String>>,
    pub flags: Vec<bool>,
    pub links: Vec<String>,
    /// Lexicographic minimum of non-empty `Date` values.
    pub earliest_date: String,
    /// Non-empty dates that are not `YYYY-MM-DD`; these make
    /// `earliest_date` unreliable.
    pub non_iso_dates: usize,
}

impl RollupRecord {
    pub fn empty(key: InvoiceKey) -> Self {
        Self {
            key,
            descriptive: vec![String::new(); ROLLUP_DESCRIPTIVE.len()],
            sums: vec![0.0; ROLLUP_SUMS.len()],
            line_count: 0,
            sets: vec![BTreeSet::new(); ROLLUP_SETS.len()],
            flags: vec![false; ROLLUP_FLAGS.len()],
            links: vec![String::new(); ROLLUP_LINKS.len()],
            earliest_date: String::new(),
            non_iso_dates: 0,
        }
    }

    /// Absorb one master line.
    pub fn fold(mut self, row: &Row) -> Self {
        for (slot, (src, _)) in self.descriptive.iter_mut().zip(ROLLUP_DESCRIPTIVE) {
            backfill(slot, row.get(src));
        }
        for (sum, (src, _)) in self.sums.iter_mut().zip(ROLLUP_SUMS) {
            *sum += parse_amount(&row.get(src));
        }
        self.line_count += 1;
        for (set, (src, _)) in self.sets.iter_mut().zip(ROLLUP_SETS) {
            let v = row.get(src);
            if !v.is_empty() {
                set.insert(v);
            }
        }
        for (flag, (src, _)) in self.flags.iter_mut().zip(ROLLUP_FLAGS) {
            *flag |= is_truthy(&row.get(src));
        }
        for (slot, (src, _)) in self.links.iter_mut().zip(ROLLUP_LINKS) {
            backfill(slot, row.get(src));
        }

        let date = row.get("Date");
        if !date.is_empty() {
            if !is_iso_date(&date) {
                self.non_iso_dates += 1;
            }
            self.earliest_date = min_date(std::mem::take(&mut self.earliest_date), date);
        }
        self
    }

    /// Combine with a record for the same key built from later rows.
    pub fn merge(mut self, later: RollupRecord) -> Self {
        for (slot, v) in self.descriptive.iter_mut().zip(later.descriptive) {
            backfill(slot, v);
        }
        for (sum, v) in self.sums.iter_mut().zip(later.sums) {
            *sum += v;
        }
        self.line_count += later.line_count;
        for (set, other) in self.sets.iter_mut().zip(later.sets) {
            set.extend(other);
        }
        for (flag, other) in self.flags.iter_mut().zip(later.flags) {
            *flag |= other;
        }
        for (slot, v) in self.links.iter_mut().zip(later.links) {
            backfill(slot, v);
        }
        self.earliest_date = if later.earliest_date.is_empty() {
            self.earliest_date
        } else {
            min_date(self.earliest_date, later.earliest_date)
        };
        self.non_iso_dates += later.non_iso_dates;
        self
    }

    /// Flatten for output. Sets render sorted and `"; "`-joined; flags render
    /// `"Y"` or empty.
    pub fn to_record(&self, year: &str) -> OutputRecord {
        let mut out = OutputRecord::new();
        out.insert(COL_YEAR.into(), Cell::from(year));
        out.insert(COL_INVOICE_KEY.into(), Cell::from(self.key.as_str()));
        for (v, (_, col)) in self.descriptive.iter().zip(ROLLUP_DESCRIPTIVE) {
            out.insert(col.to_string(), Cell::Text(v.clone()));
        }
        out.insert(COL_EARLIEST_DATE.into(), Cell::Text(self.earliest_date.clone()));
        out.insert(COL_LINE_COUNT.into(), Cell::Count(self.line_count));
        for (v, (_, col)) in self.sums.iter().zip(ROLLUP_SUMS) {
            out.insert(col.to_string(), Cell::Amount(*v));
        }
        for (set, (_, col)) in self.sets.iter().zip(ROLLUP_SETS) {
            let joined = set.iter().map(String::as_str).collect::<Vec<_>>().join("; ");
            out.insert(col.to_string(), Cell::Text(joined));
        }
        for (flag, (_, col)) in self.flags.iter().zip(ROLLUP_FLAGS) {
            let rendered = if *flag { "Y" } else { "" };
            out.insert(col.to_string(), Cell::from(rendered));
        }
        for (v, (_, col)) in self.links.iter().zip(ROLLUP_LINKS) {
            out.insert(col.to_string(), Cell::Text(v.clone()));
        }
        out
    }

    pub fn descriptive_value(&self, column: &str) -> Option<&str> {
        ROLLUP_DESCRIPTIVE
            .iter()
            .position(|(src, _)| *src == column)
            .map(|i| self.descriptive[i].as_str())
    }

    pub fn sum_value(&self, column: &str) -> Option<f64> {
        ROLLUP_SUMS
            .iter()
            .position(|(src, _)| *src == column)
            .map(|i| self.sums[i])
    }

    pub fn set_values(&self, column: &str) -> Option<&BTreeSet<String>> {
        ROLLUP_SETS
            .iter()
            .position(|(src, _)| *src == column)
            .map(|i| &self.sets[i])
    }
}

fn backfill(slot: &mut String, value: String) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value;
    }
}

fn min_date(current: String, candidate: String) -> String {
    if current.is_empty() || candidate < current {
        candidate
    } else {
        current
    }
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Rollup records keyed by invoice identity, in key order.
pub type Rollup = BTreeMap<InvoiceKey, RollupRecord>;

/// Fold `rows` into one record per invoice key.
pub fn rollup(rows: &[Row]) -> Rollup {
    let mut out = Rollup::new();
    for (idx, row) in rows.iter().enumerate() {
        let key = rollup_key(row, idx);
        let current = out
            .remove(&key)
            .unwrap_or_else(|| RollupRecord::empty(key.clone()));
        out.insert(key, current.fold(row));
    }
    out
}

/// Combine two rollups; `later` must come from rows after those of `earlier`.
pub fn merge_rollups(mut earlier: Rollup, later: Rollup) -> Rollup {
    for (key, record) in later {
        let merged = match earlier.remove(&key) {
            Some(existing) => existing.merge(record),
            None => record,
        };
        earlier.insert(key, merged);
    }
    earlier
}

pub fn summarize_rollup(rollup: &Rollup) -> RollupSummary {
    RollupSummary {
        invoices: rollup.len(),
        lines: rollup.values().map(|r| r.line_count).sum(),
        non_iso_dates: rollup.values().map(|r| r.non_iso_dates).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeyBasis;

    fn line(idx: usize, pairs: &[(&str, &str)]) -> Row {
        Row::from_pairs(idx, pairs.iter().copied())
    }

    #[test]
    fn shared_invoice_id_collapses() {
        let rows = vec![
            line(0, &[("Invoice ID", "inv-1"), ("Horse", "Comet"), ("Amount aud", "100"), ("Gst aud", "10")]),
            line(1, &[("Invoice ID", "inv-1"), ("Horse", "Bolt"), ("Amount aud", "1,000.50"), ("Gst aud", "")]),
        ];
        let r = rollup(&rows);
        assert_eq!(r.len(), 1);
        let rec = r.values().next().unwrap();
        assert_eq!(rec.line_count, 2);
        assert_eq!(rec.sum_value("Amount aud"), Some(1100.5));
        assert_eq!(rec.sum_value("Gst aud"), Some(10.0));

        let out = rec.to_record("2016");
        assert_eq!(out["Horses"], Cell::from("Bolt; Comet"));
        assert_eq!(out[COL_LINE_COUNT], Cell::Count(2));
        assert_eq!(out[COL_INVOICE_KEY], Cell::from("inv-1"));
    }

    #[test]
    fn descriptive_fields_backfill() {
        let rows = vec![
            line(0, &[("Invoice ID", "inv-1"), ("Contact", ""), ("Description", "first")]),
            line(1, &[("Invoice ID", "inv-1"), ("Contact", "Acme"), ("Description", "second")]),
            line(2, &[("Invoice ID", "inv-1"), ("Contact", "Other")]),
        ];
        let r = rollup(&rows);
        let rec = r.values().next().unwrap();
        assert_eq!(rec.descriptive_value("Contact"), Some("Acme"));
        assert_eq!(rec.descriptive_value("Description"), Some("first"));
    }

    #[test]
    fn flags_render_y_or_empty() {
        let rows = vec![
            line(0, &[("Invoice ID", "a"), ("Untracked flag", "N"), ("Has attachments", "")]),
            line(1, &[("Invoice ID", "a"), ("Untracked flag", "yes")]),
            line(2, &[("Invoice ID", "b"), ("Untracked flag", "no")]),
        ];
        let r = rollup(&rows);
        let a = r[&InvoiceKey::new("a", KeyBasis::InvoiceId)].to_record("2016");
        let b = r[&InvoiceKey::new("b", KeyBasis::InvoiceId)].to_record("2016");
        assert_eq!(a["Untracked"], Cell::from("Y"));
        assert_eq!(a["Has_Attachments"], Cell::from(""));
        assert_eq!(b["Untracked"], Cell::from(""));
    }

    #[test]
    fn earliest_date_is_lexicographic() {
        let rows = vec![
            line(0, &[("Invoice ID", "a"), ("Date", "2016-03-01")]),
            line(1, &[("Invoice ID", "a"), ("Date", "")]),
            line(2, &[("Invoice ID", "a"), ("Date", "2016-01-15")]),
        ];
        let r = rollup(&rows);
        let rec = r.values().next().unwrap();
        assert_eq!(rec.earliest_date, "2016-01-15");
        assert_eq!(rec.non_iso_dates, 0);
    }

    #[test]
    fn non_iso_dates_are_counted() {
        let rows = vec![
            line(0, &[("Invoice ID", "a"), ("Date", "15/01/2016")]),
            line(1, &[("Invoice ID", "a"), ("Date", "2016-02-01")]),
        ];
        let r = rollup(&rows);
        let rec = r.values().next().unwrap();
        // "15/..." sorts before "2016-..." as plain strings.
        assert_eq!(rec.earliest_date, "15/01/2016");
        assert_eq!(rec.non_iso_dates, 1);
        assert_eq!(summarize_rollup(&r).non_iso_dates, 1);
    }

    #[test]
    fn unidentified_lines_stay_separate() {
        let rows = vec![line(0, &[("Description", "x")]), line(1, &[("Description", "x")])];
        let r = rollup(&rows);
        assert_eq!(r.len(), 2);
        assert!(r.keys().all(|k| k.basis == KeyBasis::RowOrdinal));
    }

    #[test]
    fn links_take_first_non_empty() {
        let rows = vec![
            line(0, &[("Xero number", "INV-1"), ("Xero link", "")]),
            line(1, &[("Xero number", "INV-1"), ("Xero link", "https://go.xero.com/1")]),
            line(2, &[("Xero number", "INV-1"), ("Xero link", "https://go.xero.com/2")]),
        ];
        let r = rollup(&rows);
        let out = r.values().next().unwrap().to_record("2016");
        assert_eq!(out["Xero_Link"], Cell::from("https://go.xero.com/1"));
        assert_eq!(out[COL_INVOICE_KEY], Cell::from("XNO::INV-1"));
    }

    #[test]
    fn chunked_merge_matches_sequential_fold() {
        let rows = vec![
            line(0, &[("Invoice ID", "a"), ("Contact", ""), ("Horse", "Z"), ("Line amount", "1"), ("Date", "2016-05-01")]),
            line(1, &[("Invoice ID", "b"), ("Contact", "B"), ("Has attachments", "Y")]),
            line(2, &[("Invoice ID", "a"), ("Contact", "A"), ("Horse", "Y"), ("Line amount", "2"), ("Date", "2016-04-01")]),
            line(3, &[("Invoice ID", "a"), ("Contact", "late"), ("Reviewer notes", "ok")]),
        ];
        let sequential = rollup(&rows);

        // Chunks keep their input ordinals for the row fallback key.
        let first = rollup(&rows[..2]);
        let second: Rollup = rows[2..]
            .iter()
            .fold(Rollup::new(), |mut acc, row| {
                let key = rollup_key(row, row.ordinal);
                let rec = acc.remove(&key).unwrap_or_else(|| RollupRecord::empty(key.clone()));
                acc.insert(key, rec.fold(row));
                acc
            });
        let merged = merge_rollups(first, second);

        assert_eq!(merged, sequential);
        let a = &merged[&InvoiceKey::new("a", KeyBasis::InvoiceId)];
        assert_eq!(a.descriptive_value("Contact"), Some("A"));
        assert_eq!(a.earliest_date, "2016-04-01");
        assert_eq!(a.line_count, 3);
    }

    #[test]
    fn column_order_is_fixed() {
        let cols = rollup_columns();
        assert_eq!(cols[0], "Year");
        assert_eq!(cols[1], "Invoice_Key");
        assert_eq!(cols.last().copied(), Some("Source_Doc"));
        assert_eq!(cols.len(), 2 + 14 + 2 + 4 + 6 + 2 + 2);
    }
}
