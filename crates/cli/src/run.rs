//! `invrecon join` / `invrecon rollup`: config merge, fetch, engine, persist.

use std::path::{Path, PathBuf};

use invoice_recon::pipeline::{artifact_name, JOIN_ARTIFACT, ROLLUP_ARTIFACT};
use invoice_recon::table::render_fixed_width;
use invoice_recon::{
    run_join, run_rollup, ConfigOverrides, LogReporter, RunConfig, RunError, RunOutput, RunRecord,
    SourceRole,
};

use crate::fetch::fetch_text;
use crate::persist::{write_artifact, write_summary};
use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pipeline {
    Join,
    Rollup,
}

impl Pipeline {
    fn artifact_stem(self) -> &'static str {
        match self {
            Self::Join => JOIN_ARTIFACT,
            Self::Rollup => ROLLUP_ARTIFACT,
        }
    }
}

/// Load the optional TOML file, then apply flag/env overrides on top.
pub(crate) fn load_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<RunConfig, RunError> {
    let base = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                RunError::ConfigParse(format!("cannot read {}: {e}", path.display()))
            })?;
            RunConfig::from_toml(&text)?
        }
        None => RunConfig::default(),
    };
    Ok(base.overlay(overrides))
}

/// Fetch sources sequentially and run the engine. No retries.
pub(crate) fn execute(pipeline: Pipeline, config: &RunConfig) -> Result<RunOutput, RunError> {
    match pipeline {
        Pipeline::Join => {
            config.require_join()?;
            let ledger_url = config.ledger_url.as_deref().unwrap_or_default();
            let ledger = fetch_text(ledger_url, SourceRole::Ledger)?;
            let master = fetch_text(&config.master_url, SourceRole::Master)?;
            run_join(config, &ledger, &master, &LogReporter)
        }
        Pipeline::Rollup => {
            config.require_rollup()?;
            let master = fetch_text(&config.master_url, SourceRole::Master)?;
            run_rollup(config, &master, &LogReporter)
        }
    }
}

fn output_dir(config: &RunConfig) -> PathBuf {
    config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Run a pipeline end to end. Every outcome, success or failure, leaves a
/// summary record in the output directory.
pub(crate) fn cmd_run(
    pipeline: Pipeline,
    config: RunConfig,
    json: bool,
) -> Result<(), CliError> {
    let dir = output_dir(&config);

    match execute(pipeline, &config) {
        Ok(output) => {
            write_artifact(&dir, &output.csv_key, &output.csv).map_err(|e| CliError::run(&e))?;
            let summary = write_summary(&dir, &output.csv_key, &output.record)
                .map_err(|e| CliError::run(&e))?;
            log::info!("Wrote {}", summary.display());

            if config.preview_rows > 0 {
                eprint!(
                    "{}",
                    render_fixed_width(&output.records, &output.layout, Some(config.preview_rows))
                );
            }
            if json {
                print_record(&output.record)?;
            }
            Ok(())
        }
        Err(err) => Err(record_failure(pipeline, &config, &err, json)),
    }
}

/// Load the config and run. A config that cannot be loaded still leaves a
/// failure record, with the flag/env values as its context.
pub(crate) fn cmd_start(
    pipeline: Pipeline,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
    json: bool,
) -> Result<(), CliError> {
    match load_config(config_path, overrides.clone()) {
        Ok(config) => cmd_run(pipeline, config, json),
        Err(err) => {
            let fallback = RunConfig::default().overlay(overrides);
            Err(record_failure(pipeline, &fallback, &err, json))
        }
    }
}

/// Persist (and optionally print) the failure record for `err`.
fn record_failure(pipeline: Pipeline, config: &RunConfig, err: &RunError, json: bool) -> CliError {
    let record = RunRecord::failure(err, config.context());
    // A year label that failed validation must not reach a file name.
    let year = if config.validate().is_ok() { config.year.as_str() } else { "" };
    let csv_key = artifact_name(pipeline.artifact_stem(), year);
    match write_summary(&output_dir(config), &csv_key, &record) {
        Ok(path) => log::info!("Wrote failure record {}", path.display()),
        Err(e) => log::warn!("could not persist failure record: {e}"),
    }
    if json {
        if let Err(e) = print_record(&record) {
            return e;
        }
    }
    CliError::run(err)
}

fn print_record(record: &RunRecord) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| CliError::io(format!("cannot serialize run record: {e}")))?;
    println!("{json}");
    Ok(())
}

/// `invrecon validate`: parse and check a config without running anything.
pub(crate) fn cmd_validate(path: &Path) -> Result<(), CliError> {
    if !path.is_file() {
        return Err(CliError::args(format!("config file not found: {}", path.display()))
            .with_hint("usage: invrecon validate <config.toml>"));
    }
    let config = load_config(Some(path), ConfigOverrides::default()).map_err(|e| CliError::run(&e))?;

    println!("config ok: {}", path.display());
    println!("  year:     {}", display_or_unset(&config.year));
    println!("  strategy: {}", config.strategy);
    for (name, check) in [("join", config.require_join()), ("rollup", config.require_rollup())] {
        match check {
            Ok(()) => println!("  {name:<8}  ready"),
            Err(e) => println!("  {name:<8}  {e}"),
        }
    }
    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
