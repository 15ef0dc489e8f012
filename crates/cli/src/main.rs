// scoutmerge CLI - reconcile SoFIFA ratings with Transfermarkt valuations

mod exit_codes;
mod recon;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use exit_codes::{EXIT_RECON_INVALID_CONFIG, EXIT_SUCCESS, EXIT_USAGE};
use scoutmerge_recon::normalize::{normalize, ClubNormalizer, LeagueNormalizer};

#[derive(Parser)]
#[command(name = "scoutmerge")]
#[command(about = "Link SoFIFA and Transfermarkt player records into one table")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the two sources described by a TOML config
    #[command(after_help = "\
Examples:
  scoutmerge run recon.toml
  scoutmerge run recon.toml --out Merged --json
  scoutmerge run recon.toml --a sofifa.csv --b tm.csv --threshold 0.85")]
    Run {
        /// Path to the recon .toml config
        config: PathBuf,

        /// SoFIFA CSV (overrides sources.a.file)
        #[arg(long)]
        a: Option<PathBuf>,

        /// Transfermarkt CSV (overrides sources.b.file)
        #[arg(long)]
        b: Option<PathBuf>,

        /// Output directory (overrides output.dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Fuzzy acceptance threshold in (0, 1] (overrides threshold)
        #[arg(long, env = "SCOUTMERGE_THRESHOLD")]
        threshold: Option<f64>,
    },

    /// Parse and validate a recon config without running
    #[command(after_help = "\
Examples:
  scoutmerge validate recon.toml")]
    Validate {
        /// Path to the recon .toml config
        config: PathBuf,
    },

    /// Print the normalized matching key of a text value
    #[command(after_help = "\
Examples:
  scoutmerge normalize 'Martin Ødegaard'
  scoutmerge normalize 'FC Bayern München' --kind club
  scoutmerge normalize 'Man City' --kind club --config recon.toml
  scoutmerge normalize 'Pro League' --kind league --country Belgium")]
    Normalize {
        /// Text to normalize
        text: String,

        /// Which key to compute
        #[arg(long, value_enum, default_value_t = KeyKind::Name)]
        kind: KeyKind,

        /// Recon config whose [clubs] and [leagues] tables to apply
        #[arg(long)]
        config: Option<PathBuf>,

        /// League country, for league names several countries share
        #[arg(long)]
        country: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyKind {
    Name,
    Club,
    League,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  scoutmerge-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  scoutmerge-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
        )
    }
}

/// Logs go to stderr so `--json` stdout stays a single JSON value.
/// `RUST_LOG` overrides the default `info` level; engine `log` records are bridged.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Run { config, a, b, out, json, threshold } => {
            recon::cmd_run(recon::RunArgs { config, a, b, out, json, threshold })
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Normalize { text, kind, config, country } => {
            cmd_normalize(&text, kind, config.as_deref(), country.as_deref())
        }
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

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// normalize
// ============================================================================

fn cmd_normalize(
    text: &str,
    kind: KeyKind,
    config: Option<&Path>,
    country: Option<&str>,
) -> Result<(), CliError> {
    let (clubs, leagues) = match config {
        Some(path) => {
            let config = recon::read_config(path)?;
            let invalid = |e: scoutmerge_recon::ReconError| {
                CliError { code: EXIT_RECON_INVALID_CONFIG, message: e.to_string(), hint: None }
            };
            (
                ClubNormalizer::from_config(&config.clubs).map_err(invalid)?,
                LeagueNormalizer::from_config(&config.leagues).map_err(invalid)?,
            )
        }
        None => (ClubNormalizer::default(), LeagueNormalizer::default()),
    };

    let key = match kind {
        KeyKind::Name => normalize(text),
        KeyKind::Club => clubs.club_key(text),
        KeyKind::League => leagues.league_key(text, country),
    };
    if key.is_empty() {
        return Err(CliError::args(format!("{text:?} has no usable characters"))
            .with_hint("names need at least one letter or digit"));
    }
    println!("{key}");
    Ok(())
}
