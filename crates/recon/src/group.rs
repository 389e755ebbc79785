use std::collections::BTreeMap;

use crate::model::{Cell, InvoiceKey, OutputRecord, Row};
use crate::normalize::parse_amount;

/// Rows sharing one key within one source, in input order.
pub type Groups = BTreeMap<InvoiceKey, Vec<Row>>;

/// Group rows by derived key. Order within each group follows input order.
pub fn group_by<F>(rows: &[Row], mut key_fn: F) -> Groups
where
    F: FnMut(&Row, usize) -> InvoiceKey,
{
    let mut groups: Groups = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let key = key_fn(row, idx);
        groups.entry(key).or_default().push(row.clone());
    }
    groups
}

// ---------------------------------------------------------------------------
// Summary layouts
// ---------------------------------------------------------------------------

/// Which source columns a group summary reads and what it names them.
pub struct SummaryLayout {
    /// `(source column, output column)`, copied from the first row.
    pub descriptive: &'static [(&'static str, &'static str)],
    /// `(source column, output column)`, summed over the group.
    pub sums: &'static [(&'static str, &'static str)],
    pub count_column: &'static str,
}

pub const LEDGER_LAYOUT: SummaryLayout = SummaryLayout {
    descriptive: &[
        ("Date", "Ledger_Date"),
        ("Source", "Ledger_Source"),
        ("Contact", "Ledger_Contact"),
        ("Contact Group", "Ledger_Contact_Group"),
        ("Description", "Ledger_Description"),
        ("Invoice Number", "Ledger_Invoice_Number"),
        ("Reference", "Ledger_Reference"),
        ("Currency", "Ledger_Currency"),
        ("Account Code", "Ledger_Account_Code"),
        ("Account", "Ledger_Account"),
        ("Account Type", "Ledger_Account_Type"),
        ("Horse", "Ledger_Horse"),
        ("Related account", "Ledger_Related_Account"),
    ],
    sums: &[
        ("Gross (AUD)", "Ledger_Gross_AUD_Sum"),
        ("Net (AUD)", "Ledger_Net_AUD_Sum"),
        ("GST (AUD)", "Ledger_GST_AUD_Sum"),
    ],
    count_column: "Ledger_Row_Count",
};

pub const MASTER_LAYOUT: SummaryLayout = SummaryLayout {
    descriptive: &[
        ("Date", "Master_Date"),
        ("Type", "Master_Type"),
        ("Year", "Master_Year"),
        ("Xero number", "Master_Xero_Number"),
        ("Invoice ID", "Master_Invoice_ID"),
        ("Contact", "Master_Contact"),
        ("Description", "Master_Description"),
        ("Reference", "Master_Reference"),
        ("Account code", "Master_Account_Code"),
        ("Tracking horse", "Master_Tracking_Horse"),
        ("Currency", "Master_Currency"),
        ("Attributed to", "Master_Attributed_To"),
        ("Attribution method", "Master_Attribution_Method"),
        ("Horse", "Master_Horse"),
        ("Progeny", "Master_Progeny"),
        ("Category bucket", "Master_Category_Bucket"),
        ("Likely related", "Master_Likely_Related"),
        ("Xero link", "Master_Xero_Link"),
        ("Source", "Master_Source"),
        ("Untracked flag", "Master_Untracked_Flag"),
        ("Untracked reason", "Master_Untracked_Reason"),
        ("Reviewer decision", "Master_Reviewer_Decision"),
        ("Reviewer notes", "Master_Reviewer_Notes"),
        ("Doc ID", "Master_Doc_ID"),
        ("Has attachments", "Master_Has_Attachments"),
        ("Source Doc", "Master_Source_Doc"),
    ],
    sums: &[
        ("Amount aud", "Master_Amount_AUD_Sum"),
        ("Gst aud", "Master_GST_AUD_Sum"),
        ("Line amount", "Master_Line_Amount_Sum"),
    ],
    count_column: "Master_Row_Count",
};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// One group reduced to a single record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSummary {
    pub descriptive: Vec<(&'static str, String)>,
    pub sums: Vec<(&'static str, f64)>,
    pub row_count: Option<(&'static str, usize)>,
}

impl GroupSummary {
    pub fn is_empty(&self) -> bool {
        self.descriptive.is_empty() && self.sums.is_empty() && self.row_count.is_none()
    }

    /// Summary columns as output cells.
    pub fn cells(&self) -> impl Iterator<Item = (String, Cell)> + '_ {
        let descriptive = self
            .descriptive
            .iter()
            .map(|(col, v)| (col.to_string(), Cell::Text(v.clone())));
        let sums = self
            .sums
            .iter()
            .map(|(col, v)| (col.to_string(), Cell::Amount(*v)));
        let count = self
            .row_count
            .iter()
            .map(|(col, n)| (col.to_string(), Cell::Count(*n)));
        descriptive.chain(sums).chain(count)
    }

    /// Insert every summary column into `record`, overwriting.
    pub fn write_into(&self, record: &mut OutputRecord) {
        for (col, cell) in self.cells() {
            record.insert(col, cell);
        }
    }

    /// Insert summary columns not already present in `record`.
    pub fn fill_into(&self, record: &mut OutputRecord) {
        for (col, cell) in self.cells() {
            record.entry(col).or_insert(cell);
        }
    }
}

/// Descriptive fields come from the first row only (even when blank there);
/// numeric fields sum across the group. An empty group yields an empty
/// summary.
pub fn summarize(rows: &[Row], layout: &SummaryLayout) -> GroupSummary {
    let Some(first) = rows.first() else {
        return GroupSummary::default();
    };

    let descriptive = layout
        .descriptive
        .iter()
        .map(|(src, dst)| (*dst, first.get(src)))
        .collect();

    let sums = layout
        .sums
        .iter()
        .map(|(src, dst)| {
            let total: f64 = rows.iter().map(|r| parse_amount(&r.get(src))).sum();
            (*dst, total)
        })
        .collect();

    GroupSummary {
        descriptive,
        sums,
        row_count: Some((layout.count_column, rows.len())),
    }
}

pub fn summarize_ledger(rows: &[Row]) -> GroupSummary {
    summarize(rows, &LEDGER_LAYOUT)
}

pub fn summarize_master(rows: &[Row]) -> GroupSummary {
    summarize(rows, &MASTER_LAYOUT)
}
