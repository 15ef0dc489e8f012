use crate::config::ReconciliationConfig;
use crate::error::ReconError;
use crate::fuzzy::{fuzzy_match, FuzzyParams};
use crate::matcher::{exact_match, KeyedTables};
use crate::model::{
    Diagnostics, MalformedRecord, MatchCandidatePair, MatchMethod, MergedRecord, PlayerRecordA,
    PlayerRecordB, ReconInput, ReconMeta, ReconOutput, SourceSide, UnresolvedRecord,
};
use crate::normalize::{normalize, ClubNormalizer, LeagueNormalizer};

/// Run reconciliation on pre-loaded input, carrying loader rejects into the diagnostics.
pub fn run(config: &ReconciliationConfig, input: &ReconInput) -> Result<ReconOutput, ReconError> {
    config.validate()?;
    if config.strict {
        if let Some(first) = input.malformed.first() {
            return Err(malformed_error(first));
        }
    }

    let mut output = reconcile(&input.table_a, &input.table_b, config)?;

    let mut malformed = input.malformed.clone();
    malformed.append(&mut output.diagnostics.malformed);
    malformed.sort_by_key(|m| (m.side, m.row));
    output.diagnostics.input_a += input.malformed.iter().filter(|m| m.side == SourceSide::A).count();
    output.diagnostics.input_b += input.malformed.iter().filter(|m| m.side == SourceSide::B).count();
    output.diagnostics.malformed_count = malformed.len();
    output.diagnostics.malformed = malformed;

    Ok(output)
}

/// Exact stage, then fuzzy stage on its leftovers.
///
/// Every well-formed record ends up either on one side of exactly one merged
/// row or in the unresolved list of its source. Rows without a usable name
/// are listed in the diagnostics (or abort the run in strict mode).
pub fn reconcile(
    table_a: &[PlayerRecordA],
    table_b: &[PlayerRecordB],
    config: &ReconciliationConfig,
) -> Result<ReconOutput, ReconError> {
    config.validate()?;
    let clubs = ClubNormalizer::from_config(&config.clubs)?;
    let leagues = LeagueNormalizer::from_config(&config.leagues)?;

    let mut malformed = Vec::new();
    let mut rows_a = Vec::with_capacity(table_a.len());
    for record in table_a {
        if normalize(record.match_name()).is_empty() {
            malformed.push(MalformedRecord {
                side: SourceSide::A,
                row: record.row,
                reason: format!("name '{}' has no usable characters", record.match_name()),
            });
        } else {
            rows_a.push(record);
        }
    }
    let mut rows_b = Vec::with_capacity(table_b.len());
    for record in table_b {
        if normalize(&record.name).is_empty() {
            malformed.push(MalformedRecord {
                side: SourceSide::B,
                row: record.row,
                reason: format!("name '{}' has no usable characters", record.name),
            });
        } else {
            rows_b.push(record);
        }
    }

    if let Some(first) = malformed.first() {
        if config.strict {
            return Err(malformed_error(first));
        }
        for m in &malformed {
            log::warn!("excluding malformed record: source {}, row {}: {}", m.side, m.row, m.reason);
        }
    }

    let tables = KeyedTables::new(rows_a, rows_b, &clubs);

    let exact = exact_match(&tables);
    log::info!(
        "exact stage: {} matched, {} ambiguous routed, {} A / {} B left",
        exact.pairs.len(),
        exact.ambiguous,
        exact.leftover_a.len(),
        exact.leftover_b.len()
    );

    let params = FuzzyParams::from_config(config);
    let fuzzy = fuzzy_match(&tables, &exact.leftover_a, &exact.leftover_b, &params);
    log::info!(
        "fuzzy stage: {} matched, {} A / {} B unresolved",
        fuzzy.pairs.len(),
        fuzzy.leftover_a.len(),
        fuzzy.leftover_b.len()
    );

    let merged: Vec<MergedRecord> = exact
        .pairs
        .iter()
        .chain(fuzzy.pairs.iter())
        .map(|p| merged_record(&tables, &leagues, p))
        .collect();

    let unresolved_a = fuzzy
        .leftover_a
        .iter()
        .map(|&i| UnresolvedRecord { source: SourceSide::A, record: tables.a[i].clone() })
        .collect();
    let unresolved_b = fuzzy
        .leftover_b
        .iter()
        .map(|&i| UnresolvedRecord { source: SourceSide::B, record: canonical_b(tables.b[i], &leagues) })
        .collect();

    let diagnostics = Diagnostics {
        input_a: table_a.len(),
        input_b: table_b.len(),
        exact_matches: exact.pairs.len(),
        fuzzy_matches: fuzzy.pairs.len(),
        ambiguous_exact: exact.ambiguous,
        malformed_count: malformed.len(),
        malformed,
    };

    Ok(ReconOutput {
        meta: ReconMeta {
            config_name: config.name.clone(),
            threshold: config.threshold,
            date_tolerance_days: config.date_tolerance_days,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        merged,
        unresolved_a,
        unresolved_b,
        diagnostics,
    })
}

fn merged_record(
    tables: &KeyedTables,
    leagues: &LeagueNormalizer,
    pair: &MatchCandidatePair,
) -> MergedRecord {
    MergedRecord {
        method: pair.method,
        score: match pair.method {
            MatchMethod::Exact => None,
            MatchMethod::Fuzzy => Some(pair.score),
        },
        a: tables.a[pair.a].clone(),
        b: canonical_b(tables.b[pair.b], leagues),
    }
}

/// Written copy of a B record with its league under the canonical name.
fn canonical_b(record: &PlayerRecordB, leagues: &LeagueNormalizer) -> PlayerRecordB {
    let mut record = record.clone();
    if let Some(league) = record.league_name.take() {
        record.league_name = Some(leagues.canonical(&league, record.league_country.as_deref()));
    }
    record
}

fn malformed_error(m: &MalformedRecord) -> ReconError {
    ReconError::MalformedRecord { side: m.side, row: m.row, reason: m.reason.clone() }
}
