//! `scoutmerge run` / `scoutmerge validate`: config-driven reconciliation.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use scoutmerge_recon::export::{
    retain_with_market_value, write_merged_csv, write_summary_json, write_unresolved_a_csv,
    write_unresolved_b_csv,
};
use scoutmerge_recon::load::{load_source_a, load_source_b};
use scoutmerge_recon::{ReconError, ReconInput, ReconciliationConfig};

use crate::exit_codes::{
    recon_exit_code, EXIT_RECON_INPUT, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_OUTPUT, EXIT_USAGE,
};
use crate::CliError;

/// Flags of `scoutmerge run` that override the config file.
pub struct RunArgs {
    pub config: PathBuf,
    pub a: Option<PathBuf>,
    pub b: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub json: bool,
    pub threshold: Option<f64>,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: ReconError) -> CliError {
    recon_err(recon_exit_code(&err), err.to_string())
}

pub(crate) fn read_config(config_path: &Path) -> Result<ReconciliationConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(EXIT_USAGE, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    ReconciliationConfig::from_toml(&config_str).map_err(|e| {
        recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string())
            .with_hint("scoutmerge validate <config> checks a config without running")
    })
}

fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| recon_err(EXIT_RECON_INPUT, format!("cannot read {}: {e}", path.display())))
}

fn create_output(path: &Path) -> Result<BufWriter<File>, CliError> {
    File::create(path).map(BufWriter::new).map_err(|e| {
        recon_err(EXIT_RECON_OUTPUT, format!("cannot write {}: {e}", path.display()))
    })
}

fn output_err(path: &Path) -> impl Fn(ReconError) -> CliError + '_ {
    move |e| recon_err(EXIT_RECON_OUTPUT, format!("cannot write {}: {e}", path.display()))
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = read_config(&args.config)?;
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
        config
            .validate()
            .map_err(|e| recon_err(EXIT_USAGE, format!("--threshold {threshold}: {e}")))?;
    }

    // Config-relative paths resolve against the config file's directory
    let base_dir = args.config.parent().unwrap_or_else(|| Path::new("."));
    let a_path = args.a.unwrap_or_else(|| base_dir.join(&config.sources.a.file));
    let b_path = args.b.unwrap_or_else(|| base_dir.join(&config.sources.b.file));
    let out_dir = args.out.unwrap_or_else(|| base_dir.join(&config.output.dir));

    let table_a = load_source_a(&read_source(&a_path)?, &config.sources.a).map_err(engine_err)?;
    let table_b = load_source_b(&read_source(&b_path)?, &config.sources.b).map_err(engine_err)?;
    tracing::info!(
        a = %a_path.display(),
        b = %b_path.display(),
        records_a = table_a.records.len(),
        records_b = table_b.records.len(),
        "loaded sources"
    );

    let mut malformed = table_a.malformed;
    malformed.extend(table_b.malformed);
    let input = ReconInput { table_a: table_a.records, table_b: table_b.records, malformed };

    let output = scoutmerge_recon::run(&config, &input).map_err(engine_err)?;
    let summary = output.summary();

    std::fs::create_dir_all(&out_dir).map_err(|e| {
        recon_err(EXIT_RECON_OUTPUT, format!("cannot create {}: {e}", out_dir.display()))
    })?;

    let merged_path = out_dir.join(&config.output.merged);
    if config.output.drop_missing_market_value {
        let (kept, dropped) = retain_with_market_value(&output.merged);
        tracing::info!(dropped, "merged rows without a market value left out of the file");
        write_merged_csv(&kept, create_output(&merged_path)?).map_err(output_err(&merged_path))?;
    } else {
        write_merged_csv(&output.merged, create_output(&merged_path)?)
            .map_err(output_err(&merged_path))?;
    }

    let ua_path = out_dir.join(&config.output.unresolved_a);
    write_unresolved_a_csv(&output.unresolved_a, create_output(&ua_path)?)
        .map_err(output_err(&ua_path))?;

    let ub_path = out_dir.join(&config.output.unresolved_b);
    write_unresolved_b_csv(&output.unresolved_b, create_output(&ub_path)?)
        .map_err(output_err(&ub_path))?;

    let summary_path = out_dir.join(&config.output.summary);
    write_summary_json(&summary, create_output(&summary_path)?)
        .map_err(output_err(&summary_path))?;

    tracing::info!(dir = %out_dir.display(), "wrote outputs");

    if args.json {
        let json_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| recon_err(EXIT_RECON_OUTPUT, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let d = &summary.diagnostics;
    eprintln!(
        "recon '{}': {} merged ({} exact, {} fuzzy), {} unresolved sofifa, {} unresolved transfermarkt, {} malformed",
        summary.meta.config_name,
        summary.merged,
        d.exact_matches,
        d.fuzzy_matches,
        summary.unresolved_a,
        summary.unresolved_b,
        d.malformed_count,
    );
    if d.ambiguous_exact > 0 {
        eprintln!("ambiguous exact keys routed to fuzzy: {}", d.ambiguous_exact);
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: recon '{}' (threshold {}, date tolerance {}d, club bonus {}, {} synonym(s){})",
        config.name,
        config.threshold,
        config.date_tolerance_days,
        config.scoring.club_bonus,
        config.clubs.synonyms.len(),
        if config.strict { ", strict" } else { "" },
    );
    Ok(())
}
