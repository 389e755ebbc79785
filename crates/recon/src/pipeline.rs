//! End-to-end runs over already-fetched source text.

use std::collections::BTreeMap;

use crate::config::RunConfig;
use crate::error::{RunError, SourceRole};
use crate::group::{group_by, Groups};
use crate::join::join;
use crate::model::{KeyBasis, OutputRecord, Row, RunRecord};
use crate::normalize::normalize_newlines;
use crate::report::Reporter;
use crate::rollup::{rollup, rollup_columns, summarize_rollup};
use crate::table::{to_csv, ColumnLayout};

/// Parse delimited text with a header row into rows.
///
/// Line endings are normalized first. Empty lines are skipped by the reader,
/// but a delimiter-only line (`,,`) is a row. Every header column is present
/// in every row: short rows get `""` for the missing cells, and cells beyond
/// the header are dropped.
pub fn parse_rows(source: SourceRole, text: &str) -> Result<Vec<Row>, RunError> {
    let text = normalize_newlines(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| RunError::Decode {
            source,
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| RunError::Decode {
            source,
            message: e.to_string(),
        })?;

        let mut row = Row::new(rows.len());
        for (i, h) in headers.iter().enumerate() {
            let val = record.get(i).unwrap_or_default();
            row.fields.insert(h.clone(), val.to_string());
        }
        rows.push(row);
    }

    Ok(rows)
}

pub const JOIN_ARTIFACT: &str = "invoice_master";
pub const ROLLUP_ARTIFACT: &str = "invoice_rollup";

/// Artifact name for a year label.
pub fn artifact_name(stem: &str, year: &str) -> String {
    if year.is_empty() {
        format!("{stem}.csv")
    } else {
        format!("{stem}_{year}.csv")
    }
}

/// A completed pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub csv_key: String,
    pub csv: String,
    pub records: Vec<OutputRecord>,
    pub layout: ColumnLayout,
    pub record: RunRecord,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Key, group, join and render both sources.
pub fn run_join(
    config: &RunConfig,
    ledger_text: &str,
    master_text: &str,
    reporter: &dyn Reporter,
) -> Result<RunOutput, RunError> {
    config.require_join()?;

    let ledger_rows = parse_rows(SourceRole::Ledger, ledger_text)?;
    reporter.info(&format!("ledger rows: {}", ledger_rows.len()));
    let master_rows = parse_rows(SourceRole::Master, master_text)?;
    reporter.info(&format!("master rows: {}", master_rows.len()));

    if ledger_rows.is_empty() && master_rows.is_empty() {
        return Err(RunError::EmptyInput(
            "both ledger and master CSVs are empty".into(),
        ));
    }

    let strategy = config.strategy.strategy();
    let ledger_groups = group_by(&ledger_rows, |r, i| strategy.ledger_key(r, i));
    let master_groups = group_by(&master_rows, |r, i| strategy.master_key(r, i));
    report_bases(reporter, SourceRole::Ledger, &ledger_groups);
    report_bases(reporter, SourceRole::Master, &master_groups);

    let output = join(&config.year, &ledger_groups, &master_groups);
    let s = &output.summary;
    reporter.info(&format!(
        "merge summary ({}): keys_total={}, both={}, ledger_only={}, master_only={}, output_rows={}",
        strategy.name(),
        s.keys_total,
        s.keys_both,
        s.keys_ledger_only,
        s.keys_master_only,
        s.output_rows,
    ));

    let layout = ColumnLayout::join();
    let csv = to_csv(&output.records, &layout)?;
    let csv_key = artifact_name(JOIN_ARTIFACT, &config.year);

    Ok(RunOutput {
        record: RunRecord::Join {
            ok: true,
            year: config.year.clone(),
            csv_key: csv_key.clone(),
            strategy: strategy.name().to_string(),
            summary: output.summary,
        },
        csv_key,
        csv,
        records: output.records,
        layout,
    })
}

fn report_bases(reporter: &dyn Reporter, source: SourceRole, groups: &Groups) {
    let mut counts: BTreeMap<KeyBasis, usize> = BTreeMap::new();
    for (key, rows) in groups {
        *counts.entry(key.basis).or_insert(0) += rows.len();
    }
    let parts: Vec<String> = counts
        .iter()
        .map(|(basis, n)| format!("{basis}={n}"))
        .collect();
    reporter.info(&format!("{source} key bases: {}", parts.join(", ")));
}

// ---------------------------------------------------------------------------
// Rollup
// ---------------------------------------------------------------------------

/// Fold master lines into one record per invoice and render.
pub fn run_rollup(
    config: &RunConfig,
    master_text: &str,
    reporter: &dyn Reporter,
) -> Result<RunOutput, RunError> {
    config.require_rollup()?;

    let master_rows = parse_rows(SourceRole::Master, master_text)?;
    reporter.info(&format!("master rows: {}", master_rows.len()));
    if master_rows.is_empty() {
        return Err(RunError::EmptyInput("master CSV has no data rows".into()));
    }

    let invoices = rollup(&master_rows);
    let summary = summarize_rollup(&invoices);

    for record in invoices.values().filter(|r| r.non_iso_dates > 0) {
        reporter.warn(&format!(
            "invoice {}: {} date(s) not in YYYY-MM-DD form; earliest date \"{}\" is a plain string minimum",
            record.key, record.non_iso_dates, record.earliest_date,
        ));
    }
    reporter.info(&format!(
        "rollup summary: invoices={}, lines={}",
        summary.invoices, summary.lines
    ));

    let records: Vec<OutputRecord> = invoices
        .values()
        .map(|r| r.to_record(&config.year))
        .collect();
    let layout = ColumnLayout::fixed(&rollup_columns());
    let csv = to_csv(&records, &layout)?;
    let csv_key = artifact_name(ROLLUP_ARTIFACT, &config.year);

    Ok(RunOutput {
        record: RunRecord::Rollup {
            ok: true,
            year: config.year.clone(),
            csv_key: csv_key.clone(),
            summary,
        },
        csv_key,
        csv,
        records,
        layout,
    })
}
