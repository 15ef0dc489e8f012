//! CSV text -> typed player tables.
//!
//! Cell cleanup follows what the scrapers emit: blank cells are null, dates
//! come in a handful of formats, market values may still be raw `€12.50m`
//! text. A row without a name is reported as malformed, never dropped silently.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{SourceAColumns, SourceBColumns};
use crate::error::ReconError;
use crate::model::{MalformedRecord, PlayerRecordA, PlayerRecordB, SourceSide};

/// Column prefixes of the game-rating sub-attributes.
pub const ATTRIBUTE_PREFIXES: &[&str] = &[
    "attacking_",
    "skill_",
    "movement_",
    "power_",
    "mentality_",
    "defending_",
    "goalkeeping_",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%b %d, %Y", "%d %b %Y"];

#[derive(Debug, Clone)]
pub struct LoadedTable<R> {
    pub records: Vec<R>,
    pub malformed: Vec<MalformedRecord>,
}

impl<R> Default for LoadedTable<R> {
    fn default() -> Self {
        Self { records: Vec::new(), malformed: Vec::new() }
    }
}

struct Header {
    side: SourceSide,
    columns: Vec<String>,
}

impl Header {
    fn required(&self, name: &str) -> Result<usize, ReconError> {
        self.optional(name).ok_or_else(|| ReconError::MissingColumn {
            side: self.side,
            column: name.into(),
        })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.columns.iter().position(|h| h == name)
    }
}

fn read_header(side: SourceSide, reader: &mut csv::Reader<&[u8]>) -> Result<Header, ReconError> {
    let columns = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    Ok(Header { side, columns })
}

/// Trimmed cell text, `None` when blank or the column is absent.
fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes())
}

// ---------------------------------------------------------------------------
// Source A
// ---------------------------------------------------------------------------

pub fn load_source_a(
    csv_data: &str,
    cols: &SourceAColumns,
) -> Result<LoadedTable<PlayerRecordA>, ReconError> {
    let mut reader = reader(csv_data);
    let header = read_header(SourceSide::A, &mut reader)?;

    let id_idx = header.required(&cols.player_id)?;
    let name_idx = header.required(&cols.name)?;
    let full_name_idx = header.optional(&cols.full_name);
    let dob_idx = header.optional(&cols.dob);
    let nationality_idx = header.optional(&cols.nationality);
    let club_idx = header.optional(&cols.club_name);
    let positions_idx = header.optional(&cols.positions);
    let overall_idx = header.optional(&cols.overall_rating);
    let potential_idx = header.optional(&cols.potential);

    let attribute_columns: Vec<(usize, &str)> = header
        .columns
        .iter()
        .enumerate()
        .filter(|(_, h)| ATTRIBUTE_PREFIXES.iter().any(|p| h.starts_with(p)))
        .map(|(i, h)| (i, h.as_str()))
        .collect();

    let mut table = LoadedTable::default();

    for (row, record) in reader.records().enumerate() {
        let record = record?;

        let name = cell(&record, Some(name_idx));
        let full_name = cell(&record, full_name_idx);
        let Some(name) = name.or_else(|| full_name.clone()) else {
            log::warn!("source a, row {row}: no name, excluded");
            table.malformed.push(MalformedRecord {
                side: SourceSide::A,
                row,
                reason: format!("missing '{}'", cols.name),
            });
            continue;
        };

        let mut attributes = BTreeMap::new();
        for &(i, column) in &attribute_columns {
            if let Some(v) = cell(&record, Some(i)).and_then(|v| parse_number(&v)) {
                attributes.insert(column.to_string(), v);
            }
        }

        table.records.push(PlayerRecordA {
            row,
            player_id: cell(&record, Some(id_idx)).unwrap_or_default(),
            name,
            full_name,
            dob: cell(&record, dob_idx).and_then(|v| parse_date(&v)),
            nationality: cell(&record, nationality_idx),
            club_name: cell(&record, club_idx),
            positions: cell(&record, positions_idx)
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            overall_rating: cell(&record, overall_idx).and_then(|v| parse_leading_int(&v)),
            potential: cell(&record, potential_idx).and_then(|v| parse_leading_int(&v)),
            attributes,
        });
    }

    log::info!(
        "source a: {} records, {} malformed",
        table.records.len(),
        table.malformed.len()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Source B
// ---------------------------------------------------------------------------

pub fn load_source_b(
    csv_data: &str,
    cols: &SourceBColumns,
) -> Result<LoadedTable<PlayerRecordB>, ReconError> {
    let mut reader = reader(csv_data);
    let header = read_header(SourceSide::B, &mut reader)?;

    let name_idx = header.required(&cols.name)?;
    let id_idx = header.optional(&cols.player_id);
    let dob_idx = header.optional(&cols.dob);
    let age_idx = header.optional(&cols.age);
    let nationality_idx = header.optional(&cols.nationality);
    let club_idx = header.optional(&cols.club_name);
    let league_idx = header.optional(&cols.league_name);
    let league_country_idx = header.optional(&cols.league_country);
    let position_idx = header.optional(&cols.position);
    let value_eur_idx = header.optional(&cols.market_value_eur);
    let value_raw_idx = header.optional(&cols.market_value);

    let mut table = LoadedTable::default();

    for (row, record) in reader.records().enumerate() {
        let record = record?;

        let Some(name) = cell(&record, Some(name_idx)) else {
            log::warn!("source b, row {row}: no name, excluded");
            table.malformed.push(MalformedRecord {
                side: SourceSide::B,
                row,
                reason: format!("missing '{}'", cols.name),
            });
            continue;
        };

        let market_value_eur = cell(&record, value_eur_idx)
            .and_then(|v| parse_number(&v))
            .or_else(|| cell(&record, value_raw_idx).and_then(|v| parse_market_value(&v)));

        table.records.push(PlayerRecordB {
            row,
            player_id: cell(&record, id_idx),
            name,
            dob: cell(&record, dob_idx).and_then(|v| parse_date(&v)),
            age: cell(&record, age_idx).and_then(|v| parse_leading_int(&v)),
            nationality: cell(&record, nationality_idx),
            club_name: cell(&record, club_idx),
            league_name: cell(&record, league_idx),
            league_country: cell(&record, league_country_idx),
            position: cell(&record, position_idx),
            market_value_eur,
        });
    }

    log::info!(
        "source b: {} records, {} malformed",
        table.records.len(),
        table.malformed.len()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Cell parsers
// ---------------------------------------------------------------------------

/// Birth date in any of the scraped formats; a trailing `(34)` age is ignored.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = match value.find('(') {
        Some(pos) => value[..pos].trim(),
        None => value.trim(),
    };
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }

    log::debug!("unparseable date '{value}', treated as missing");
    None
}

/// Plain number, tolerating thousands separators.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = value.replace(',', "");
    let parsed = cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    if parsed.is_none() {
        log::debug!("unparseable number '{value}', treated as missing");
    }
    parsed
}

/// Leading digits of a cell (`"91+2"` -> 91, `"34 years"` -> 34).
fn parse_leading_int<T: std::str::FromStr>(value: &str) -> Option<T> {
    let digits: String = value.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Market value text (`€1.50m`, `€750k`, `€1.2bn`) in euros. `-` means unknown.
pub fn parse_market_value(value: &str) -> Option<f64> {
    let v = value.replace('€', "").replace(',', "").trim().to_lowercase();
    if v.is_empty() || v == "-" {
        return None;
    }

    let (number, multiplier) = if let Some(n) = v.strip_suffix("bn") {
        (n, 1_000_000_000.0)
    } else if let Some(n) = v.strip_suffix('m') {
        (n, 1_000_000.0)
    } else if let Some(n) = v.strip_suffix('k') {
        (n, 1_000.0)
    } else {
        (v.as_str(), 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n * multiplier),
        _ => {
            log::debug!("unparseable market value '{value}', treated as missing");
            None
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
