use crate::group::{summarize_ledger, summarize_master, GroupSummary, Groups};
use crate::model::{Cell, InvoiceKey, JoinStatus, JoinSummary, OutputRecord, Row};

pub const COL_YEAR: &str = "Year";
pub const COL_INVOICE_KEY: &str = "Invoice_Key";
pub const COL_JOIN_STATUS: &str = "Join_Status";

pub const MASTER_ROW_PREFIX: &str = "MasterRow_";

/// Keys split by presence in each source. Pairwise disjoint; together they
/// cover every key seen in either source exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPartition {
    pub both: Vec<InvoiceKey>,
    pub ledger_only: Vec<InvoiceKey>,
    pub master_only: Vec<InvoiceKey>,
}

impl KeyPartition {
    pub fn total(&self) -> usize {
        self.both.len() + self.ledger_only.len() + self.master_only.len()
    }
}

/// Partition the union of keys by membership. Each list is key-ordered.
pub fn partition(ledger: &Groups, master: &Groups) -> KeyPartition {
    let mut out = KeyPartition::default();

    for key in ledger.keys() {
        if master.contains_key(key) {
            out.both.push(key.clone());
        } else {
            out.ledger_only.push(key.clone());
        }
    }

    for key in master.keys() {
        if !ledger.contains_key(key) {
            out.master_only.push(key.clone());
        }
    }

    out
}

#[derive(Debug, Clone, Default)]
pub struct JoinOutput {
    pub records: Vec<OutputRecord>,
    pub partition: KeyPartition,
    pub summary: JoinSummary,
}

/// Join ledger and master groups keyed by the same strategy.
///
/// "Both" and "Master_Only" keys emit one record per master row, in group
/// order. "Ledger_Only" keys emit one summarized record per key.
pub fn join(year: &str, ledger: &Groups, master: &Groups) -> JoinOutput {
    let partition = partition(ledger, master);
    let mut records = Vec::new();

    for key in &partition.both {
        let (Some(lg), Some(mg)) = (ledger.get(key), master.get(key)) else {
            continue;
        };
        let ledger_summary = summarize_ledger(lg);
        let master_summary = summarize_master(mg);
        for mrow in mg {
            records.push(master_line_record(
                year,
                key,
                JoinStatus::Both,
                Some(&ledger_summary),
                mrow,
                &master_summary,
            ));
        }
    }

    for key in &partition.ledger_only {
        let Some(lg) = ledger.get(key) else { continue };
        let mut record = identity(year, key, JoinStatus::LedgerOnly);
        summarize_ledger(lg).write_into(&mut record);
        records.push(record);
    }

    for key in &partition.master_only {
        let Some(mg) = master.get(key) else { continue };
        let master_summary = summarize_master(mg);
        for mrow in mg {
            records.push(master_line_record(
                year,
                key,
                JoinStatus::MasterOnly,
                None,
                mrow,
                &master_summary,
            ));
        }
    }

    let summary = JoinSummary {
        keys_total: partition.total(),
        keys_both: partition.both.len(),
        keys_ledger_only: partition.ledger_only.len(),
        keys_master_only: partition.master_only.len(),
        ledger_rows: ledger.values().map(Vec::len).sum(),
        master_rows: master.values().map(Vec::len).sum(),
        ledger_groups: ledger.len(),
        master_groups: master.len(),
        output_rows: records.len(),
    };

    JoinOutput {
        records,
        partition,
        summary,
    }
}

/// Output column for a raw master field: prefixed, spaces as underscores.
pub fn master_row_column(field: &str) -> String {
    format!("{MASTER_ROW_PREFIX}{}", field.replace(' ', "_"))
}

fn identity(year: &str, key: &InvoiceKey, status: JoinStatus) -> OutputRecord {
    let mut record = OutputRecord::new();
    record.insert(COL_YEAR.into(), Cell::from(year));
    record.insert(COL_INVOICE_KEY.into(), Cell::from(key.as_str()));
    record.insert(COL_JOIN_STATUS.into(), Cell::from(status.as_str()));
    record
}

fn master_line_record(
    year: &str,
    key: &InvoiceKey,
    status: JoinStatus,
    ledger_summary: Option<&GroupSummary>,
    mrow: &Row,
    master_summary: &GroupSummary,
) -> OutputRecord {
    let mut record = identity(year, key, status);

    if let Some(ls) = ledger_summary {
        ls.write_into(&mut record);
    }

    for (field, value) in &mrow.fields {
        if field.starts_with("__") {
            continue;
        }
        record.insert(master_row_column(field), Cell::Text(value.clone()));
    }

    master_summary.fill_into(&mut record);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::group_by;
    use crate::keys::{DateContactAmount, MatchingStrategy};

    fn ledger_rows() -> Vec<Row> {
        vec![
            Row::from_pairs(0, [("Date", "2016-01-01"), ("Contact", "Acme"), ("Gross (AUD)", "1,000.00")]),
            Row::from_pairs(1, [("Date", "2016-01-05"), ("Contact", "Feedco"), ("Gross (AUD)", "55.00")]),
            Row::from_pairs(2, [("Date", "2016-01-05"), ("Contact", "Feedco"), ("Gross (AUD)", "55.00")]),
        ]
    }

    fn master_rows() -> Vec<Row> {
        vec![
            Row::from_pairs(0, [("Date", "2016-01-01"), ("Contact", "Acme"), ("Amount aud", "1000.00"), ("Horse", "Bolt")]),
            Row::from_pairs(1, [("Date", "2016-01-01"), ("Contact", "Acme"), ("Amount aud", "1000"), ("Horse", "Comet")]),
            Row::from_pairs(2, [("Description", "orphan")]),
        ]
    }

    fn groups() -> (Groups, Groups) {
        let s = DateContactAmount;
        let lg = group_by(&ledger_rows(), |r, i| s.ledger_key(r, i));
        let mg = group_by(&master_rows(), |r, i| s.master_key(r, i));
        (lg, mg)
    }

    #[test]
    fn partition_is_exact() {
        let (lg, mg) = groups();
        let p = partition(&lg, &mg);
        assert_eq!(p.both.len(), 1);
        assert_eq!(p.ledger_only.len(), 1);
        assert_eq!(p.master_only.len(), 1);
        assert_eq!(p.total(), 3);
        assert!(p.both.iter().all(|k| !p.ledger_only.contains(k) && !p.master_only.contains(k)));
    }

    #[test]
    fn join_expands_master_lines() {
        let (lg, mg) = groups();
        let out = join("2016", &lg, &mg);

        let both: Vec<_> = out
            .records
            .iter()
            .filter(|r| r[COL_JOIN_STATUS] == Cell::from("Both"))
            .collect();
        assert_eq!(both.len(), 2);
        assert_eq!(both[0]["MasterRow_Horse"], Cell::from("Bolt"));
        assert_eq!(both[1]["MasterRow_Horse"], Cell::from("Comet"));
        assert_eq!(both[0]["Ledger_Row_Count"], Cell::Count(1));
        assert_eq!(both[0]["Master_Row_Count"], Cell::Count(2));
        assert_eq!(both[0]["Master_Amount_AUD_Sum"], Cell::Amount(2000.0));
        assert_eq!(both[0][COL_YEAR], Cell::from("2016"));
    }

    #[test]
    fn ledger_only_is_one_record_per_key() {
        let (lg, mg) = groups();
        let out = join("2016", &lg, &mg);
        let ledger_only: Vec<_> = out
            .records
            .iter()
            .filter(|r| r[COL_JOIN_STATUS] == Cell::from("Ledger_Only"))
            .collect();
        assert_eq!(ledger_only.len(), 1);
        assert_eq!(ledger_only[0]["Ledger_Row_Count"], Cell::Count(2));
        assert_eq!(ledger_only[0]["Ledger_Gross_AUD_Sum"], Cell::Amount(110.0));
        assert!(!ledger_only[0].keys().any(|k| k.starts_with("Master")));
    }

    #[test]
    fn master_only_has_no_ledger_columns() {
        let (lg, mg) = groups();
        let out = join("2016", &lg, &mg);
        let orphan: Vec<_> = out
            .records
            .iter()
            .filter(|r| r[COL_JOIN_STATUS] == Cell::from("Master_Only"))
            .collect();
        assert_eq!(orphan.len(), 1);
        assert_eq!(orphan[0][COL_INVOICE_KEY], Cell::from("MASTER_ROW::2"));
        assert_eq!(orphan[0]["MasterRow_Description"], Cell::from("orphan"));
        assert!(!orphan[0].keys().any(|k| k.starts_with("Ledger_")));
    }

    #[test]
    fn summary_counts() {
        let (lg, mg) = groups();
        let out = join("2016", &lg, &mg);
        assert_eq!(
            out.summary,
            JoinSummary {
                keys_total: 3,
                keys_both: 1,
                keys_ledger_only: 1,
                keys_master_only: 1,
                ledger_rows: 3,
                master_rows: 3,
                ledger_groups: 2,
                master_groups: 2,
                output_rows: 4,
            }
        );
    }

    #[test]
    fn copied_master_field_beats_summary_column() {
        let master = vec![Row::from_pairs(0, [("Date", "2016-01-01"), ("Contact", "Acme"), ("Amount aud", "5")])];
        let mut record = OutputRecord::new();
        record.insert("Master_Row_Count".into(), Cell::from("from source"));
        summarize_master(&master).fill_into(&mut record);
        assert_eq!(record["Master_Row_Count"], Cell::from("from source"));
    }

    #[test]
    fn internal_fields_are_not_copied() {
        let master = vec![Row::from_pairs(0, [("__invoice_key", "x"), ("Contact", "Acme")])];
        let mg = group_by(&master, |r, i| DateContactAmount.master_key(r, i));
        let out = join("2016", &Groups::new(), &mg);
        assert!(!out.records[0].keys().any(|k| k.contains("__")));
        assert_eq!(out.records[0]["MasterRow_Contact"], Cell::from("Acme"));
    }

    #[test]
    fn master_row_column_names() {
        assert_eq!(master_row_column("Amount aud"), "MasterRow_Amount_aud");
        assert_eq!(master_row_column("Source Doc"), "MasterRow_Source_Doc");
    }
}
