use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which scraped table a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSide {
    /// Game-rating source (SoFIFA).
    A,
    /// Market-valuation source (Transfermarkt).
    B,
}

impl std::fmt::Display for SourceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// One player row from the game-rating source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecordA {
    /// 0-based position in the input table.
    pub row: usize,
    pub player_id: String,
    pub name: String,
    pub full_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub club_name: Option<String>,
    pub positions: Vec<String>,
    pub overall_rating: Option<u8>,
    pub potential: Option<u8>,
    /// Numeric sub-ratings keyed by column name (`attacking_crossing`, ...).
    pub attributes: BTreeMap<String, f64>,
}

impl PlayerRecordA {
    /// Name used for matching: the full name when scraped, else the display name.
    pub fn match_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(full) if !full.trim().is_empty() => full,
            _ => &self.name,
        }
    }
}

/// One player row from the market-valuation source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecordB {
    /// 0-based position in the input table.
    pub row: usize,
    pub player_id: Option<String>,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub age: Option<u32>,
    pub nationality: Option<String>,
    pub club_name: Option<String>,
    pub league_name: Option<String>,
    pub league_country: Option<String>,
    pub position: Option<String>,
    pub market_value_eur: Option<f64>,
}

/// A row excluded from matching because a required identity field is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRecord {
    pub side: SourceSide,
    pub row: usize,
    pub reason: String,
}

/// Pre-loaded tables for one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub table_a: Vec<PlayerRecordA>,
    pub table_b: Vec<PlayerRecordB>,
    /// Rows the loader already rejected; carried into the diagnostics.
    pub malformed: Vec<MalformedRecord>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Comparison key derived for one matching pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey {
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub club: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// A linked (A, B) pair, by index into the tables handed to the matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidatePair {
    pub a: usize,
    pub b: usize,
    pub score: f64,
    pub method: MatchMethod,
}

/// Output of one matching stage. The three sets are disjoint.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub pairs: Vec<MatchCandidatePair>,
    pub leftover_a: Vec<usize>,
    pub leftover_b: Vec<usize>,
    /// Exact stage only: records routed onward because of same-key contention.
    pub ambiguous: usize,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub method: MatchMethod,
    /// Present for fuzzy matches only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub a: PlayerRecordA,
    pub b: PlayerRecordB,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedRecord<R> {
    pub source: SourceSide,
    pub record: R,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub input_a: usize,
    pub input_b: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    /// Records routed from the exact to the fuzzy stage because of key contention.
    pub ambiguous_exact: usize,
    pub malformed_count: usize,
    pub malformed: Vec<MalformedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub threshold: f64,
    pub date_tolerance_days: u32,
    pub engine_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconOutput {
    pub meta: ReconMeta,
    pub merged: Vec<MergedRecord>,
    pub unresolved_a: Vec<UnresolvedRecord<PlayerRecordA>>,
    pub unresolved_b: Vec<UnresolvedRecord<PlayerRecordB>>,
    pub diagnostics: Diagnostics,
}

/// Serializable run summary (everything except the row payloads).
#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub meta: ReconMeta,
    pub merged: usize,
    pub unresolved_a: usize,
    pub unresolved_b: usize,
    pub diagnostics: Diagnostics,
}

impl ReconOutput {
    pub fn summary(&self) -> ReconSummary {
        ReconSummary {
            meta: self.meta.clone(),
            merged: self.merged.len(),
            unresolved_a: self.unresolved_a.len(),
            unresolved_b: self.unresolved_b.len(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}
