//! CLI Exit Code Registry
//!
//! Single source of truth for `scoutmerge` exit codes. Scripts that chain a
//! reconciliation run into later pipeline steps rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                              |
//! |---------|------------|------------------------------------------|
//! | 0       | Universal  | Success                                  |
//! | 1       | Universal  | General error (unspecified)              |
//! | 2       | Universal  | CLI usage error (bad args, missing file) |
//! | 60-69   | recon      | Reconciliation run codes                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `recon_exit_code` or the command's error handling

use scoutmerge_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, config file not found.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config failed to parse or validate (threshold range, synonyms, columns).
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// A source CSV could not be read or is missing a required column.
pub const EXIT_RECON_INPUT: u8 = 61;

/// Strict mode hit a record without a usable name.
pub const EXIT_RECON_MALFORMED: u8 = 62;

/// An output file or directory could not be written.
pub const EXIT_RECON_OUTPUT: u8 = 63;

/// Map an engine error to its exit code.
///
/// `Io` and `Csv` are only produced while reading or writing tables; callers
/// that know they were writing use `EXIT_RECON_OUTPUT` directly.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. } => EXIT_RECON_INPUT,
        ReconError::MalformedRecord { .. } => EXIT_RECON_MALFORMED,
        ReconError::Csv(_) | ReconError::Io(_) => EXIT_RECON_INPUT,
    }
}
