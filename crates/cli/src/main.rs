// invrecon - ledger / master-financials invoice reconciliation

mod exit_codes;
mod fetch;
mod persist;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use invoice_recon::{ConfigOverrides, RunError, StrategyKind};

use exit_codes::{run_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use run::{cmd_start, cmd_validate, Pipeline};

#[derive(Parser)]
#[command(name = "invrecon")]
#[command(about = "Reconcile general-ledger rows against master invoice lines")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Three-way join of ledger and master rows by derived invoice key
    #[command(after_help = "\
Examples:
  invrecon join --year 2016 --ledger-url https://host/ledger.csv --master-url https://host/master.csv
  invrecon join --config recon.toml --strategy invoice_number --preview 20
  INVRECON_YEAR=2016 invrecon join --ledger-url ledger.csv --master-url master.csv --json")]
    Join {
        #[command(flatten)]
        run: RunArgs,

        /// Ledger CSV: http(s) URL, file:// URL or local path
        #[arg(long, env = "INVRECON_LEDGER_URL")]
        ledger_url: Option<String>,

        /// Key scheme: date_contact_amount (default) or invoice_number
        #[arg(long)]
        strategy: Option<StrategyKind>,
    },

    /// Roll master lines up to one record per invoice
    #[command(after_help = "\
Examples:
  invrecon rollup --year 2016 --master-url https://host/master.csv
  invrecon rollup --config recon.toml --out-dir out --preview 10")]
    Rollup {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Parse and check a config file without running
    Validate {
        /// TOML config file
        config: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// TOML config file; flags and environment override its values
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Year label for the run (used in output names)
    #[arg(long, env = "INVRECON_YEAR")]
    year: Option<String>,

    /// Master financials CSV: http(s) URL, file:// URL or local path
    #[arg(long, env = "INVRECON_MASTER_URL")]
    master_url: Option<String>,

    /// Directory for the CSV artifact and summary record (default: .)
    #[arg(long = "out-dir", env = "INVRECON_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Print the first N output rows as a table to stderr
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    /// Print the run record as JSON to stdout
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            year: self.year.clone(),
            master_url: self.master_url.clone(),
            output_dir: self.out_dir.clone(),
            preview_rows: self.preview,
            ..ConfigOverrides::default()
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("INVRECON_GIT_HASH"), ")",
        "\nengine:  invoice-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("INVRECON_TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match cli.command {
        Commands::Join {
            run,
            ledger_url,
            strategy,
        } => {
            let overrides = ConfigOverrides {
                ledger_url,
                strategy,
                ..run.overrides()
            };
            start(Pipeline::Join, &run, overrides)
        }
        Commands::Rollup { run } => start(Pipeline::Rollup, &run, run.overrides()),
        Commands::Validate { config } => cmd_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn start(pipeline: Pipeline, args: &RunArgs, overrides: ConfigOverrides) -> Result<(), CliError> {
    cmd_start(pipeline, args.config.as_deref(), overrides, args.json)
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a run failure with its category exit code.
    pub fn run(err: &RunError) -> Self {
        let hint = match err {
            RunError::MissingInput(_) => Some(
                "pass --year / --ledger-url / --master-url, set INVRECON_* variables, or use --config"
                    .to_string(),
            ),
            RunError::ConfigParse(_) | RunError::ConfigValidation(_) => {
                Some("check the file with `invrecon validate <config>`".to_string())
            }
            _ => None,
        };
        Self { code: run_exit_code(err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
