use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::normalize::{ClubNormalizer, LeagueNormalizer};

pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_CLUB_BONUS: f64 = 0.15;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Minimum fuzzy score for a pair to be accepted. Must lie in (0, 1].
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Birth dates further apart than this never match.
    #[serde(default)]
    pub date_tolerance_days: u32,
    /// Abort on the first malformed row instead of reporting it.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub clubs: ClubConfig,
    #[serde(default)]
    pub leagues: LeagueConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "reconciliation".into()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            threshold: DEFAULT_THRESHOLD,
            date_tolerance_days: 0,
            strict: false,
            scoring: ScoringConfig::default(),
            clubs: ClubConfig::default(),
            leagues: LeagueConfig::default(),
            sources: SourcesConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring + clubs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Added when both normalized club names agree. Name similarity gets the rest.
    #[serde(default = "default_club_bonus")]
    pub club_bonus: f64,
}

fn default_club_bonus() -> f64 {
    DEFAULT_CLUB_BONUS
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { club_bonus: DEFAULT_CLUB_BONUS }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClubConfig {
    /// Overrides the built-in list of legal-form tokens (`fc`, `cf`, ...).
    #[serde(default)]
    pub legal_forms: Option<Vec<String>>,
    /// Raw club name -> canonical club name.
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
}

/// League canonicalization. Either table given in the config replaces its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LeagueConfig {
    /// Scraped league name -> canonical league name.
    pub synonyms: BTreeMap<String, String>,
    /// League name used in several countries -> country -> canonical name.
    pub by_country: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        let synonyms = [("Ligue 1", "Ligue 1 Uber Eats"), ("Ligue 2", "Ligue 2 BKT")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let table = |entries: &[(&str, &str)]| -> BTreeMap<String, String> {
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        let mut by_country = BTreeMap::new();
        by_country.insert(
            "Pro League".to_string(),
            table(&[
                ("Belgium", "Belgian Pro League"),
                ("Saudi Arabia", "Saudi Pro League"),
                ("Saudi", "Saudi Pro League"),
                ("United Arab Emirates", "UAE Pro League"),
                ("UAE", "UAE Pro League"),
            ]),
        );
        by_country.insert(
            "Super League".to_string(),
            table(&[
                ("Greece", "Greek Super League"),
                ("India", "Indian Super League"),
                ("Switzerland", "Swiss Super League"),
                ("China", "Chinese Super League"),
            ]),
        );

        Self { synonyms, by_country }
    }
}

// ---------------------------------------------------------------------------
// Column mappings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub a: SourceAColumns,
    #[serde(default)]
    pub b: SourceBColumns,
}

/// Game-rating source columns. `player_id` and `name` are required.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceAColumns {
    pub file: String,
    pub player_id: String,
    pub name: String,
    pub full_name: String,
    pub dob: String,
    pub nationality: String,
    pub club_name: String,
    pub positions: String,
    pub overall_rating: String,
    pub potential: String,
}

impl Default for SourceAColumns {
    fn default() -> Self {
        Self {
            file: "player_stats_cleaned_light.csv".into(),
            player_id: "player_id".into(),
            name: "name".into(),
            full_name: "full_name".into(),
            dob: "dob".into(),
            nationality: "nationality".into(),
            club_name: "club_name".into(),
            positions: "positions".into(),
            overall_rating: "overall_rating".into(),
            potential: "potential".into(),
        }
    }
}

/// Market-valuation source columns. Only `name` is required.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceBColumns {
    pub file: String,
    pub player_id: String,
    pub name: String,
    pub dob: String,
    pub age: String,
    pub nationality: String,
    pub club_name: String,
    pub league_name: String,
    /// Country of the league, used to tell apart same-named leagues.
    pub league_country: String,
    pub position: String,
    pub market_value_eur: String,
    /// Raw "€12.50m" text, used when `market_value_eur` is empty.
    pub market_value: String,
}

impl Default for SourceBColumns {
    fn default() -> Self {
        Self {
            file: "transfermarkt_players.csv".into(),
            player_id: "player_id".into(),
            name: "player_name".into(),
            dob: "dob".into(),
            age: "age".into(),
            nationality: "nationality".into(),
            club_name: "club".into(),
            league_name: "league_name".into(),
            league_country: "league_country".into(),
            position: "position".into(),
            market_value_eur: "market_value_eur".into(),
            market_value: "market_value".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub merged: String,
    pub unresolved_a: String,
    pub unresolved_b: String,
    pub summary: String,
    /// Drop merged rows without a market value from the written file.
    pub drop_missing_market_value: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: ".".into(),
            merged: "merged_players.csv".into(),
            unresolved_a: "unresolved_sofifa.csv".into(),
            unresolved_b: "unresolved_transfermarkt.csv".into(),
            summary: "summary.json".into(),
            drop_missing_market_value: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconciliationConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconciliationConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ReconError::ConfigValidation(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }

        let bonus = self.scoring.club_bonus;
        if !(0.0..1.0).contains(&bonus) {
            return Err(ReconError::ConfigValidation(format!(
                "scoring.club_bonus must be in [0, 1), got {bonus}"
            )));
        }

        if self.sources.a.player_id.is_empty() || self.sources.a.name.is_empty() {
            return Err(ReconError::ConfigValidation(
                "sources.a: player_id and name columns are required".into(),
            ));
        }
        if self.sources.b.name.is_empty() {
            return Err(ReconError::ConfigValidation(
                "sources.b: name column is required".into(),
            ));
        }

        // Synonym table problems surface here, before any matching work.
        ClubNormalizer::from_config(&self.clubs)?;
        LeagueNormalizer::from_config(&self.leagues)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
