//! Writes run artifacts into the output directory.
//!
//! Success: `<csv_key>` (the CSV) plus `<stem>.summary.json`.
//! Failure: `<stem>.summary.json` only, holding the failure record.

use std::path::{Path, PathBuf};

use invoice_recon::{RunError, RunRecord};

/// Stem of an artifact name (`invoice_master_2016.csv` → `invoice_master_2016`).
pub(crate) fn artifact_stem(csv_key: &str) -> &str {
    csv_key.strip_suffix(".csv").unwrap_or(csv_key)
}

pub(crate) fn summary_name(csv_key: &str) -> String {
    format!("{}.summary.json", artifact_stem(csv_key))
}

fn ensure_dir(dir: &Path) -> Result<(), RunError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| RunError::Io(format!("cannot create {}: {e}", dir.display())))
}

/// Write the CSV artifact. Returns its path.
pub(crate) fn write_artifact(dir: &Path, csv_key: &str, csv: &str) -> Result<PathBuf, RunError> {
    ensure_dir(dir)?;
    let path = dir.join(csv_key);
    std::fs::write(&path, csv)
        .map_err(|e| RunError::Io(format!("cannot write {}: {e}", path.display())))?;
    log::info!("Wrote {} ({} bytes)", path.display(), csv.len());
    Ok(path)
}

/// Write the run record as pretty JSON next to the artifact. Returns its path.
pub(crate) fn write_summary(
    dir: &Path,
    csv_key: &str,
    record: &RunRecord,
) -> Result<PathBuf, RunError> {
    ensure_dir(dir)?;
    let path = dir.join(summary_name(csv_key));
    let mut json = serde_json::to_string_pretty(record)
        .map_err(|e| RunError::Io(format!("cannot serialize run record: {e}")))?;
    json.push('\n');
    std::fs::write(&path, json)
        .map_err(|e| RunError::Io(format!("cannot write {}: {e}", path.display())))?;
    Ok(path)
}
