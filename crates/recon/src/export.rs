//! Output tables -> CSV / JSON text.
//!
//! Every written row carries enough columns to rebuild its source record(s).

use std::collections::BTreeSet;
use std::io::Write;

use chrono::NaiveDate;

use crate::error::ReconError;
use crate::model::{MergedRecord, PlayerRecordA, PlayerRecordB, ReconSummary, UnresolvedRecord};

const A_COLUMNS: &[&str] = &[
    "player_id",
    "name",
    "full_name",
    "dob",
    "nationality",
    "club_name",
    "positions",
    "overall_rating",
    "potential",
];

const B_COLUMNS: &[&str] = &[
    "player_id",
    "name",
    "dob",
    "age",
    "nationality",
    "club_name",
    "league_name",
    "league_country",
    "position",
    "market_value_eur",
];

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer)
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn fmt_opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn a_fields(a: &PlayerRecordA, attribute_columns: &[String]) -> Vec<String> {
    let mut fields = vec![
        a.player_id.clone(),
        a.name.clone(),
        a.full_name.clone().unwrap_or_default(),
        fmt_date(a.dob),
        a.nationality.clone().unwrap_or_default(),
        a.club_name.clone().unwrap_or_default(),
        a.positions.join(","),
        fmt_opt(a.overall_rating),
        fmt_opt(a.potential),
    ];
    fields.extend(
        attribute_columns
            .iter()
            .map(|c| fmt_opt(a.attributes.get(c))),
    );
    fields
}

fn b_fields(b: &PlayerRecordB) -> Vec<String> {
    vec![
        b.player_id.clone().unwrap_or_default(),
        b.name.clone(),
        fmt_date(b.dob),
        fmt_opt(b.age),
        b.nationality.clone().unwrap_or_default(),
        b.club_name.clone().unwrap_or_default(),
        b.league_name.clone().unwrap_or_default(),
        b.league_country.clone().unwrap_or_default(),
        b.position.clone().unwrap_or_default(),
        fmt_opt(b.market_value_eur),
    ]
}

/// Union of attribute column names, sorted.
fn attribute_columns<'a>(records: impl Iterator<Item = &'a PlayerRecordA>) -> Vec<String> {
    let set: BTreeSet<&String> = records.flat_map(|a| a.attributes.keys()).collect();
    set.into_iter().cloned().collect()
}

fn prefixed<'a>(prefix: &str, columns: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    let prefix = prefix.to_string();
    columns.iter().map(move |c| format!("{prefix}{c}"))
}

/// `method, score, a_*, <attributes>, b_*`.
pub fn write_merged_csv(merged: &[MergedRecord], writer: impl Write) -> Result<(), ReconError> {
    let attrs = attribute_columns(merged.iter().map(|m| &m.a));

    let mut header: Vec<String> = vec!["method".into(), "score".into()];
    header.extend(prefixed("a_", A_COLUMNS));
    header.extend(attrs.iter().cloned());
    header.extend(prefixed("b_", B_COLUMNS));

    let mut csv = csv_writer(writer);
    csv.write_record(&header)?;

    for m in merged {
        let mut row = vec![
            m.method.to_string(),
            m.score.map(|s| s.to_string()).unwrap_or_default(),
        ];
        row.extend(a_fields(&m.a, &attrs));
        row.extend(b_fields(&m.b));
        csv.write_record(&row)?;
    }

    csv.flush().map_err(|e| ReconError::Io(e.to_string()))?;
    Ok(())
}

/// `source, row, <A columns>, <attributes>`.
pub fn write_unresolved_a_csv(
    unresolved: &[UnresolvedRecord<PlayerRecordA>],
    writer: impl Write,
) -> Result<(), ReconError> {
    let attrs = attribute_columns(unresolved.iter().map(|u| &u.record));

    let mut header: Vec<String> = vec!["source".into(), "row".into()];
    header.extend(A_COLUMNS.iter().map(|c| c.to_string()));
    header.extend(attrs.iter().cloned());

    let mut csv = csv_writer(writer);
    csv.write_record(&header)?;

    for u in unresolved {
        let mut row = vec![u.source.to_string(), u.record.row.to_string()];
        row.extend(a_fields(&u.record, &attrs));
        csv.write_record(&row)?;
    }

    csv.flush().map_err(|e| ReconError::Io(e.to_string()))?;
    Ok(())
}

/// `source, row, <B columns>`.
pub fn write_unresolved_b_csv(
    unresolved: &[UnresolvedRecord<PlayerRecordB>],
    writer: impl Write,
) -> Result<(), ReconError> {
    let mut header: Vec<String> = vec!["source".into(), "row".into()];
    header.extend(B_COLUMNS.iter().map(|c| c.to_string()));

    let mut csv = csv_writer(writer);
    csv.write_record(&header)?;

    for u in unresolved {
        let mut row = vec![u.source.to_string(), u.record.row.to_string()];
        row.extend(b_fields(&u.record));
        csv.write_record(&row)?;
    }

    csv.flush().map_err(|e| ReconError::Io(e.to_string()))?;
    Ok(())
}

pub fn write_summary_json(summary: &ReconSummary, writer: impl Write) -> Result<(), ReconError> {
    serde_json::to_writer_pretty(writer, summary)
        .map_err(|e| ReconError::Io(format!("JSON serialization error: {e}")))
}

/// Merged rows that carry a market value, plus how many were dropped.
///
/// Only for the persisted file; the in-memory partition is left alone.
pub fn retain_with_market_value(merged: &[MergedRecord]) -> (Vec<MergedRecord>, usize) {
    let kept: Vec<MergedRecord> = merged
        .iter()
        .filter(|m| m.b.market_value_eur.is_some())
        .cloned()
        .collect();
    let dropped = merged.len() - kept.len();
    (kept, dropped)
}
