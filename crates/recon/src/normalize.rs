//! Free-text canonicalization for identity comparison.
//!
//! All functions here are total: any input yields a (possibly empty) key, and
//! an empty key never matches anything.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::config::{ClubConfig, LeagueConfig};
use crate::error::ReconError;
use crate::model::NormalizedKey;

/// Legal-form and filler tokens the two sources disagree on.
pub const DEFAULT_LEGAL_FORMS: &[&str] = &[
    "ac", "afc", "as", "bk", "ca", "cd", "cf", "club", "de", "fc", "fk", "if", "rc", "rcd",
    "sc", "sd", "sk", "ssc", "sv", "ud", "us",
];

/// Canonicalize a person/club/league name.
///
/// Transliterates to ASCII, lowercases, deletes periods and apostrophes,
/// turns any other punctuation into a space and keeps hyphens only inside
/// compound tokens (`alexander-arnold`).
pub fn normalize(text: &str) -> String {
    let ascii = deunicode::deunicode(text);

    let mut cleaned = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        match c {
            '.' | '\'' | '`' => {}
            c if c.is_ascii_alphanumeric() || c == '-' => cleaned.push(c.to_ascii_lowercase()),
            _ => cleaned.push(' '),
        }
    }

    cleaned
        .split_whitespace()
        .filter_map(clean_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse hyphen runs and trim hyphens off the token ends.
fn clean_token(token: &str) -> Option<String> {
    let parts: Vec<&str> = token.split('-').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("-"))
    }
}

// ---------------------------------------------------------------------------
// Clubs
// ---------------------------------------------------------------------------

/// Club-name canonicalizer: legal-form stripping plus a synonym table.
///
/// Synonym keys and values are stored in club-key form, and no canonical
/// value maps onward to a different club, so `club_key` is idempotent.
#[derive(Debug, Clone)]
pub struct ClubNormalizer {
    legal_forms: HashSet<String>,
    synonyms: HashMap<String, String>,
}

impl Default for ClubNormalizer {
    fn default() -> Self {
        Self {
            legal_forms: DEFAULT_LEGAL_FORMS.iter().map(|s| s.to_string()).collect(),
            synonyms: HashMap::new(),
        }
    }
}

impl ClubNormalizer {
    pub fn from_config(config: &ClubConfig) -> Result<Self, ReconError> {
        let mut normalizer = Self::default();

        if let Some(ref forms) = config.legal_forms {
            normalizer.legal_forms = forms
                .iter()
                .map(|f| normalize(f))
                .filter(|f| !f.is_empty())
                .collect();
        }

        let mut synonyms: HashMap<String, String> = HashMap::new();
        for (raw, canonical) in &config.synonyms {
            let key = normalizer.strip_legal_forms(&normalize(raw));
            let value = normalizer.strip_legal_forms(&normalize(canonical));
            if key.is_empty() || value.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "club synonym '{raw}' = '{canonical}' normalizes to an empty name"
                )));
            }
            if let Some(existing) = synonyms.get(&key) {
                if *existing != value {
                    return Err(ReconError::ConfigValidation(format!(
                        "conflicting club synonyms for '{key}': '{existing}' and '{value}'"
                    )));
                }
            }
            synonyms.insert(key, value);
        }

        for (key, value) in &synonyms {
            if let Some(next) = synonyms.get(value) {
                if next != value {
                    return Err(ReconError::ConfigValidation(format!(
                        "club synonym chain: '{key}' -> '{value}' -> '{next}'"
                    )));
                }
            }
        }

        normalizer.synonyms = synonyms;
        Ok(normalizer)
    }

    /// Comparable club key; empty when the input has no usable text.
    pub fn club_key(&self, text: &str) -> String {
        let stripped = self.strip_legal_forms(&normalize(text));
        match self.synonyms.get(&stripped) {
            Some(canonical) => canonical.clone(),
            None => stripped,
        }
    }

    /// Drop legal-form tokens; keeps the input when nothing else would remain.
    fn strip_legal_forms(&self, normalized: &str) -> String {
        let kept: Vec<&str> = normalized
            .split(' ')
            .filter(|t| !t.is_empty() && !self.legal_forms.contains(*t))
            .collect();
        if kept.is_empty() {
            normalized.to_string()
        } else {
            kept.join(" ")
        }
    }

    /// Optional club text -> optional non-empty key.
    pub fn optional_club_key(&self, text: Option<&str>) -> Option<String> {
        text.map(|t| self.club_key(t)).filter(|k| !k.is_empty())
    }

    pub fn normalized_key(
        &self,
        name: &str,
        dob: Option<NaiveDate>,
        club: Option<&str>,
    ) -> NormalizedKey {
        NormalizedKey {
            name: normalize(name),
            dob,
            club: self.optional_club_key(club),
        }
    }
}

// ---------------------------------------------------------------------------
// Leagues
// ---------------------------------------------------------------------------

/// League-name canonicalizer.
///
/// Lookups go through `normalize`, so `LIGUE 1` and `Ligue 1` hit the same
/// entry; results are display names (`Ligue 1 Uber Eats`).
#[derive(Debug, Clone)]
pub struct LeagueNormalizer {
    synonyms: HashMap<String, String>,
    by_country: HashMap<String, HashMap<String, String>>,
}

impl Default for LeagueNormalizer {
    fn default() -> Self {
        Self::build(&LeagueConfig::default())
    }
}

impl LeagueNormalizer {
    pub fn from_config(config: &LeagueConfig) -> Result<Self, ReconError> {
        let blank = |s: &str| normalize(s).is_empty();
        for (raw, canonical) in &config.synonyms {
            if blank(raw) || blank(canonical) {
                return Err(ReconError::ConfigValidation(format!(
                    "league synonym '{raw}' = '{canonical}' normalizes to an empty name"
                )));
            }
        }
        for (league, countries) in &config.by_country {
            for (country, canonical) in countries {
                if blank(league) || blank(country) || blank(canonical) {
                    return Err(ReconError::ConfigValidation(format!(
                        "league '{league}' for country '{country}' = '{canonical}' has an empty name"
                    )));
                }
            }
        }
        Ok(Self::build(config))
    }

    fn build(config: &LeagueConfig) -> Self {
        let synonyms = config
            .synonyms
            .iter()
            .map(|(raw, canonical)| (normalize(raw), collapse_whitespace(canonical)))
            .collect();
        let by_country = config
            .by_country
            .iter()
            .map(|(league, countries)| {
                let table = countries
                    .iter()
                    .map(|(country, canonical)| (normalize(country), collapse_whitespace(canonical)))
                    .collect();
                (normalize(league), table)
            })
            .collect();
        Self { synonyms, by_country }
    }

    /// Canonical display name of a league; `country` resolves names such as
    /// `Pro League` that several countries use. Unknown leagues come back
    /// with whitespace collapsed.
    pub fn canonical(&self, league: &str, country: Option<&str>) -> String {
        let name = self
            .synonyms
            .get(&normalize(league))
            .cloned()
            .unwrap_or_else(|| collapse_whitespace(league));

        let resolved = country.and_then(|c| {
            self.by_country
                .get(&normalize(&name))
                .and_then(|table| table.get(&normalize(c)))
        });
        match resolved {
            Some(canonical) => canonical.clone(),
            None => name,
        }
    }

    /// Comparable league key.
    pub fn league_key(&self, league: &str, country: Option<&str>) -> String {
        normalize(&self.canonical(league, country))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn folds_accents_and_case() {
        assert_eq!(normalize("Kylian Mbappé"), "kylian mbappe");
        assert_eq!(normalize("Martin Ødegaard"), "martin odegaard");
        assert_eq!(normalize("Robert Lewandowski"), "robert lewandowski");
        assert_eq!(normalize("Łukasz Fabiański"), "lukasz fabianski");
        assert_eq!(normalize("JOSÉ MARÍA GIMÉNEZ"), "jose maria gimenez");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  Lionel \t  Messi  "), "lionel messi");
    }

    #[test]
    fn drops_periods_and_apostrophes() {
        assert_eq!(normalize("L. Messi"), "l messi");
        assert_eq!(normalize("N'Golo Kanté"), "ngolo kante");
        assert_eq!(normalize("Dara O’Shea"), "dara oshea");
    }

    #[test]
    fn keeps_compound_hyphens() {
        assert_eq!(normalize("Trent Alexander-Arnold"), "trent alexander-arnold");
        assert_eq!(normalize("Pierre-Emerick  Aubameyang"), "pierre-emerick aubameyang");
        assert_eq!(normalize("Foo - Bar"), "foo bar");
        assert_eq!(normalize("-Foo--Bar-"), "foo-bar");
    }

    #[test]
    fn other_punctuation_splits_tokens() {
        assert_eq!(normalize("Silva, David (ESP)"), "silva david esp");
        assert_eq!(normalize("FC Schalke 04"), "fc schalke 04");
    }

    #[test]
    fn empty_and_noise_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("..."), "");
        assert_eq!(normalize("- -"), "");
    }

    #[test]
    fn club_key_strips_legal_forms() {
        let clubs = ClubNormalizer::default();
        assert_eq!(clubs.club_key("Inter Miami CF"), "inter miami");
        assert_eq!(clubs.club_key("Inter Miami"), "inter miami");
        assert_eq!(clubs.club_key("FC Bayern München"), "bayern munchen");
        assert_eq!(clubs.club_key("Real Sociedad de Fútbol"), "real sociedad futbol");
    }

    #[test]
    fn club_key_keeps_name_made_only_of_legal_forms() {
        let clubs = ClubNormalizer::default();
        assert_eq!(clubs.club_key("F.C."), "fc");
        assert_eq!(clubs.club_key("fc"), "fc");
    }

    #[test]
    fn club_key_applies_synonyms() {
        let config = ClubConfig {
            legal_forms: None,
            synonyms: BTreeMap::from([
                ("Man Utd".to_string(), "Manchester United FC".to_string()),
                ("Bayern Munich".to_string(), "FC Bayern München".to_string()),
            ]),
        };
        let clubs = ClubNormalizer::from_config(&config).unwrap();
        assert_eq!(clubs.club_key("Man Utd"), "manchester united");
        assert_eq!(clubs.club_key("Manchester United"), "manchester united");
        assert_eq!(clubs.club_key("Bayern Munich"), "bayern munchen");
        assert_eq!(clubs.club_key("FC Bayern München"), "bayern munchen");
    }

    #[test]
    fn custom_legal_forms_replace_defaults() {
        let config = ClubConfig {
            legal_forms: Some(vec!["calcio".into()]),
            synonyms: BTreeMap::new(),
        };
        let clubs = ClubNormalizer::from_config(&config).unwrap();
        assert_eq!(clubs.club_key("Genoa CFC Calcio"), "genoa cfc");
        assert_eq!(clubs.club_key("Inter Miami CF"), "inter miami cf");
    }

    #[test]
    fn conflicting_synonyms_rejected() {
        let config = ClubConfig {
            legal_forms: None,
            synonyms: BTreeMap::from([
                ("Inter".to_string(), "Internazionale".to_string()),
                ("FC Inter".to_string(), "Inter Miami".to_string()),
            ]),
        };
        let err = ClubNormalizer::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("conflicting"));
    }

    #[test]
    fn optional_club_key_drops_empty() {
        let clubs = ClubNormalizer::default();
        assert_eq!(clubs.optional_club_key(None), None);
        assert_eq!(clubs.optional_club_key(Some("  ")), None);
        assert_eq!(clubs.optional_club_key(Some("Arsenal FC")), Some("arsenal".into()));
    }

    #[test]
    fn normalized_key_combines_fields() {
        let clubs = ClubNormalizer::default();
        let dob = NaiveDate::from_ymd_opt(1987, 6, 24);
        let key = clubs.normalized_key("Lionel Andrés Messi", dob, Some("Inter Miami CF"));
        assert_eq!(key.name, "lionel andres messi");
        assert_eq!(key.dob, dob);
        assert_eq!(key.club.as_deref(), Some("inter miami"));
    }

    #[test]
    fn league_synonyms_applied() {
        let leagues = LeagueNormalizer::default();
        assert_eq!(leagues.canonical("Ligue 1", None), "Ligue 1 Uber Eats");
        assert_eq!(leagues.canonical("  LIGUE   2 ", None), "Ligue 2 BKT");
        assert_eq!(leagues.canonical("Ligue 1 Uber Eats", None), "Ligue 1 Uber Eats");
        assert_eq!(leagues.canonical("Premier  League", None), "Premier League");
        assert_eq!(leagues.league_key("Süper Lig", None), "super lig");
    }

    #[test]
    fn shared_league_names_resolved_by_country() {
        let leagues = LeagueNormalizer::default();
        assert_eq!(leagues.canonical("Pro League", Some("Belgium")), "Belgian Pro League");
        assert_eq!(leagues.canonical("Pro League", Some("Saudi")), "Saudi Pro League");
        assert_eq!(leagues.canonical("Pro League", Some("UAE")), "UAE Pro League");
        assert_eq!(leagues.canonical("Super League", Some("switzerland")), "Swiss Super League");
        assert_eq!(leagues.canonical("Super League", Some("China")), "Chinese Super League");
        // Unknown or missing country leaves the name as scraped
        assert_eq!(leagues.canonical("Super League", Some("Norway")), "Super League");
        assert_eq!(leagues.canonical("Pro League", None), "Pro League");
    }

    #[test]
    fn league_country_table_from_config() {
        let mut config = LeagueConfig::default();
        config.by_country.insert(
            "Premier League".into(),
            [("Egypt".to_string(), "Egyptian Premier League".to_string())].into_iter().collect(),
        );
        let leagues = LeagueNormalizer::from_config(&config).unwrap();
        assert_eq!(leagues.canonical("Premier League", Some("Egypt")), "Egyptian Premier League");
        assert_eq!(leagues.canonical("Premier League", Some("England")), "Premier League");
    }

    #[test]
    fn empty_league_entries_rejected() {
        let mut config = LeagueConfig::default();
        config.synonyms.insert("???".into(), "Somewhere".into());
        assert!(LeagueNormalizer::from_config(&config).is_err());
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn club_key_is_idempotent(s in "[a-zA-Z .'éøü-]{0,30}") {
            let clubs = ClubNormalizer::default();
            let once = clubs.club_key(&s);
            prop_assert_eq!(clubs.club_key(&once), once);
        }
    }
}
