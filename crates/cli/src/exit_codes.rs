//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 60-69   | recon            | Join / rollup run failures               |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`run_exit_code`]

use invoice_recon::RunError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon runs (60-69)
// =============================================================================

/// Year, ledger or master locator absent or blank.
pub const EXIT_RECON_MISSING_INPUT: u8 = 60;

/// A source could not be downloaded or read (network, non-2xx, bad path).
pub const EXIT_RECON_FETCH: u8 = 61;

/// A source was retrieved but is not parseable CSV.
pub const EXIT_RECON_DECODE: u8 = 62;

/// Nothing to reconcile (both sources empty, or empty master for rollup).
pub const EXIT_RECON_EMPTY: u8 = 63;

/// Config file unreadable, malformed or invalid.
pub const EXIT_RECON_CONFIG: u8 = 64;

/// Writing the artifact or summary record failed.
pub const EXIT_RECON_IO: u8 = 65;

/// Map a RunError to its exit code.
pub fn run_exit_code(err: &RunError) -> u8 {
    match err {
        RunError::MissingInput(_) => EXIT_RECON_MISSING_INPUT,
        RunError::Fetch { .. } => EXIT_RECON_FETCH,
        RunError::Decode { .. } => EXIT_RECON_DECODE,
        RunError::EmptyInput(_) => EXIT_RECON_EMPTY,
        RunError::ConfigParse(_) | RunError::ConfigValidation(_) => EXIT_RECON_CONFIG,
        RunError::Io(_) => EXIT_RECON_IO,
    }
}
