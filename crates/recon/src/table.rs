//! Column layout and rendering for heterogeneous output records.

use std::collections::BTreeSet;

use unicode_width::UnicodeWidthStr;

use crate::error::RunError;
use crate::model::OutputRecord;

/// How to order the union of record columns.
///
/// Order: `fixed` (those present), then each prefix group sorted, then the
/// rest sorted. A column belongs to the first prefix group it matches.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    pub fixed: Vec<String>,
    pub prefix_groups: Vec<Vec<String>>,
}

impl ColumnLayout {
    /// Layout of the ledger/master join table.
    pub fn join() -> Self {
        Self {
            fixed: vec!["Year".into(), "Invoice_Key".into(), "Join_Status".into()],
            prefix_groups: vec![
                vec!["Ledger_".into()],
                vec!["Master_".into(), "MasterRow_".into()],
            ],
        }
    }

    /// Fully fixed layout; unknown columns still land at the end, sorted.
    pub fn fixed(columns: &[&str]) -> Self {
        Self {
            fixed: columns.iter().map(|c| c.to_string()).collect(),
            prefix_groups: Vec::new(),
        }
    }

    /// Deterministic column order for `records`.
    pub fn columns(&self, records: &[OutputRecord]) -> Vec<String> {
        let all: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.keys().map(String::as_str))
            .collect();

        let mut columns: Vec<String> = self
            .fixed
            .iter()
            .filter(|c| all.contains(c.as_str()))
            .cloned()
            .collect();

        let mut groups: Vec<Vec<String>> = vec![Vec::new(); self.prefix_groups.len()];
        let mut rest = Vec::new();

        for col in all {
            if self.fixed.iter().any(|f| f == col) {
                continue;
            }
            let group = self
                .prefix_groups
                .iter()
                .position(|prefixes| prefixes.iter().any(|p| col.starts_with(p.as_str())));
            match group {
                Some(i) => groups[i].push(col.to_string()),
                None => rest.push(col.to_string()),
            }
        }

        // BTreeSet iteration already yields each bucket sorted.
        for group in groups {
            columns.extend(group);
        }
        columns.extend(rest);
        columns
    }
}

/// Render cells for `record` in `columns` order; absent columns are empty.
fn row_cells(record: &OutputRecord, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| record.get(c).map(|cell| cell.render()).unwrap_or_default())
        .collect()
}

/// Delimited text with a header row. No records yields an empty string.
pub fn to_csv(records: &[OutputRecord], layout: &ColumnLayout) -> Result<String, RunError> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let columns = layout.columns(records);
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(&columns)
        .map_err(|e| RunError::Io(format!("CSV write error: {e}")))?;
    for record in records {
        writer
            .write_record(row_cells(record, &columns))
            .map_err(|e| RunError::Io(format!("CSV write error: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RunError::Io(format!("CSV flush error: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RunError::Io(format!("CSV encoding error: {e}")))
}

/// Padded text table of at most `limit` records (all when `None`).
pub fn render_fixed_width(
    records: &[OutputRecord],
    layout: &ColumnLayout,
    limit: Option<usize>,
) -> String {
    let columns = layout.columns(records);
    if columns.is_empty() {
        return String::new();
    }

    let shown = limit.unwrap_or(records.len()).min(records.len());
    let rows: Vec<Vec<String>> = records[..shown]
        .iter()
        .map(|r| row_cells(r, &columns))
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &columns, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    if shown < records.len() {
        out.push_str(&format!("... {} more row(s)\n", records.len() - shown));
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let pad = widths[i].saturating_sub(cell.width());
        line.extend(std::iter::repeat(' ').take(pad));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;

    fn record(pairs: &[(&str, Cell)]) -> OutputRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn join_layout_orders_columns() {
        let records = vec![
            record(&[
                ("Zeta", Cell::from("z")),
                ("MasterRow_Date", Cell::from("d")),
                ("Join_Status", Cell::from("Both")),
                ("Ledger_Contact", Cell::from("c")),
                ("Year", Cell::from("2016")),
                ("Master_Row_Count", Cell::Count(1)),
                ("Invoice_Key", Cell::from("k")),
                ("Alpha", Cell::from("a")),
            ]),
            record(&[("Ledger_Account", Cell::from("200"))]),
        ];
        let cols = ColumnLayout::join().columns(&records);
        assert_eq!(
            cols,
            vec![
                "Year",
                "Invoice_Key",
                "Join_Status",
                "Ledger_Account",
                "Ledger_Contact",
                "MasterRow_Date",
                "Master_Row_Count",
                "Alpha",
                "Zeta",
            ]
        );
    }

    #[test]
    fn csv_fills_missing_cells() {
        let records = vec![
            record(&[("Year", Cell::from("2016")), ("Ledger_Contact", Cell::from("Acme"))]),
            record(&[("Year", Cell::from("2016")), ("Master_Amount_AUD_Sum", Cell::Amount(12.5))]),
        ];
        let text = to_csv(&records, &ColumnLayout::join()).unwrap();
        assert_eq!(
            text,
            "Year,Ledger_Contact,Master_Amount_AUD_Sum\n2016,Acme,\n2016,,12.50\n"
        );
    }

    #[test]
    fn csv_quotes_embedded_delimiters() {
        let records = vec![record(&[("Year", Cell::from("2016")), ("Note", Cell::from("a, b"))])];
        let text = to_csv(&records, &ColumnLayout::join()).unwrap();
        assert_eq!(text, "Year,Note\n2016,\"a, b\"\n");
    }

    #[test]
    fn csv_empty_records() {
        assert_eq!(to_csv(&[], &ColumnLayout::join()).unwrap(), "");
    }

    #[test]
    fn fixed_layout_keeps_declared_order() {
        let records = vec![record(&[
            ("b", Cell::from("2")),
            ("extra", Cell::from("x")),
            ("a", Cell::from("1")),
        ])];
        let cols = ColumnLayout::fixed(&["b", "a", "missing"]).columns(&records);
        assert_eq!(cols, vec!["b", "a", "extra"]);
    }

    #[test]
    fn fixed_width_pads_and_truncates() {
        let records = vec![
            record(&[("Year", Cell::from("2016")), ("Invoice_Key", Cell::from("INV::1"))]),
            record(&[("Year", Cell::from("2016")), ("Invoice_Key", Cell::from("D+C::2016-01-01::Acme"))]),
            record(&[("Year", Cell::from("2016"))]),
        ];
        let text = render_fixed_width(&records, &ColumnLayout::join(), Some(2));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Year  Invoice_Key");
        assert_eq!(lines[1], "----  ---------------------");
        assert_eq!(lines[2], "2016  INV::1");
        assert_eq!(lines[3], "2016  D+C::2016-01-01::Acme");
        assert_eq!(lines[4], "... 1 more row(s)");
    }
}
