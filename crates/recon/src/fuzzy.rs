//! Similarity scoring and one-to-one assignment for records the exact stage
//! could not pair.
//!
//! Assignment is a deterministic greedy approximation of maximum-weight
//! bipartite matching: qualifying candidates are sorted by score (then by a
//! fixed tie-break) and accepted while both sides are still free. A pair that
//! scores slightly higher can block a later pair whose acceptance would have
//! produced a larger total weight; that outcome is the documented behavior.

use rayon::prelude::*;

use crate::config::ReconciliationConfig;
use crate::matcher::KeyedTables;
use crate::model::{MatchCandidatePair, MatchMethod, NormalizedKey, StageOutput};

/// Similarity given to names that agree on the surname and differ only by
/// initials or omitted middle names (`l messi` / `lionel andres messi`).
pub const ABBREVIATED_NAME_SIMILARITY: f64 = 0.9;

#[derive(Debug, Clone, Copy)]
pub struct FuzzyParams {
    pub threshold: f64,
    pub date_tolerance_days: u32,
    pub club_bonus: f64,
}

impl FuzzyParams {
    pub fn from_config(config: &ReconciliationConfig) -> Self {
        Self {
            threshold: config.threshold,
            date_tolerance_days: config.date_tolerance_days,
            club_bonus: config.scoring.club_bonus,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Name similarity in [0, 1] between two normalized names.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let edit = strsim::normalized_levenshtein(&token_sort(a), &token_sort(b));

    let ta: Vec<&str> = a.split(' ').collect();
    let tb: Vec<&str> = b.split(' ').collect();
    if abbreviates(&ta, &tb) || abbreviates(&tb, &ta) {
        edit.max(ABBREVIATED_NAME_SIMILARITY)
    } else {
        edit
    }
}

fn token_sort(name: &str) -> String {
    let mut tokens: Vec<&str> = name.split(' ').collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// `short` is `long` with the same surname and every given name kept whole
/// or cut to its initial, in order.
fn abbreviates(short: &[&str], long: &[&str]) -> bool {
    if short.len() < 2 || short.len() > long.len() {
        return false;
    }
    let (Some(s_last), Some(l_last)) = (short.last(), long.last()) else {
        return false;
    };
    if s_last != l_last {
        return false;
    }

    let mut remaining = long[..long.len() - 1].iter();
    short[..short.len() - 1].iter().all(|s| {
        remaining.any(|l| l == s || (s.len() == 1 && l.starts_with(s)))
    })
}

/// Composite score for one pair, or `None` when the birth dates rule it out.
pub fn score_pair(a: &NormalizedKey, b: &NormalizedKey, params: &FuzzyParams) -> Option<f64> {
    if let (Some(da), Some(db)) = (a.dob, b.dob) {
        if (da - db).num_days().unsigned_abs() > u64::from(params.date_tolerance_days) {
            return None;
        }
    }

    let name = name_similarity(&a.name, &b.name);
    if name == 0.0 {
        return Some(0.0);
    }

    let bonus = match (&a.club, &b.club) {
        (Some(ca), Some(cb)) if ca == cb => params.club_bonus,
        _ => 0.0,
    };

    Some(((1.0 - params.club_bonus) * name + bonus).min(1.0))
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Score `leftover_a x leftover_b`, then accept greedily one-to-one.
pub fn fuzzy_match(
    tables: &KeyedTables,
    leftover_a: &[usize],
    leftover_b: &[usize],
    params: &FuzzyParams,
) -> StageOutput {
    let mut candidates: Vec<MatchCandidatePair> = leftover_a
        .par_iter()
        .flat_map_iter(|&ai| {
            leftover_b.iter().filter_map(move |&bi| {
                score_pair(&tables.keys_a[ai], &tables.keys_b[bi], params)
                    .filter(|score| *score >= params.threshold)
                    .map(|score| MatchCandidatePair {
                        a: ai,
                        b: bi,
                        score,
                        method: MatchMethod::Fuzzy,
                    })
            })
        })
        .collect();

    log::debug!(
        "fuzzy stage: {} x {} pairs scored, {} at or above {}",
        leftover_a.len(),
        leftover_b.len(),
        candidates.len(),
        params.threshold
    );

    // Total order, so the outcome never depends on scoring order.
    candidates.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then_with(|| tables.a[x.a].player_id.cmp(&tables.a[y.a].player_id))
            .then_with(|| tables.b[x.b].name.cmp(&tables.b[y.b].name))
            .then_with(|| x.a.cmp(&y.a))
            .then_with(|| x.b.cmp(&y.b))
    });

    let mut used_a = vec![false; tables.a.len()];
    let mut used_b = vec![false; tables.b.len()];
    let mut pairs = Vec::new();

    for cand in candidates {
        if used_a[cand.a] || used_b[cand.b] {
            continue;
        }
        used_a[cand.a] = true;
        used_b[cand.b] = true;
        pairs.push(cand);
    }

    StageOutput {
        pairs,
        leftover_a: leftover_a.iter().copied().filter(|&i| !used_a[i]).collect(),
        leftover_b: leftover_b.iter().copied().filter(|&i| !used_b[i]).collect(),
        ambiguous: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayerRecordA, PlayerRecordB};
    use crate::normalize::ClubNormalizer;
    use crate::test_support::{date, rec_a, rec_b};

    fn params(threshold: f64) -> FuzzyParams {
        FuzzyParams { threshold, date_tolerance_days: 0, club_bonus: 0.15 }
    }

    fn key(name: &str, dob: Option<&str>, club: Option<&str>) -> NormalizedKey {
        ClubNormalizer::default().normalized_key(name, dob.map(date), club)
    }

    fn run(a: &[PlayerRecordA], b: &[PlayerRecordB], p: &FuzzyParams) -> StageOutput {
        let clubs = ClubNormalizer::default();
        let tables = KeyedTables::new(a.iter().collect(), b.iter().collect(), &clubs);
        fuzzy_match(&tables, &tables.all_a(), &tables.all_b(), p)
    }

    #[test]
    fn identical_names_score_one() {
        assert_eq!(name_similarity("lionel messi", "lionel messi"), 1.0);
    }

    #[test]
    fn empty_name_scores_zero() {
        assert_eq!(name_similarity("", "lionel messi"), 0.0);
        assert_eq!(name_similarity("", ""), 0.0);
    }

    #[test]
    fn token_order_ignored() {
        assert_eq!(name_similarity("son heung-min", "heung-min son"), 1.0);
    }

    #[test]
    fn initials_recognized() {
        assert_eq!(name_similarity("l messi", "lionel messi"), ABBREVIATED_NAME_SIMILARITY);
        assert_eq!(name_similarity("lionel messi", "l messi"), ABBREVIATED_NAME_SIMILARITY);
        assert_eq!(
            name_similarity("lionel messi", "lionel andres messi"),
            ABBREVIATED_NAME_SIMILARITY
        );
    }

    #[test]
    fn different_surname_is_not_an_abbreviation() {
        assert!(name_similarity("l messi", "lionel scaloni") < 0.6);
    }

    #[test]
    fn bare_surname_is_not_an_abbreviation() {
        assert!(name_similarity("messi", "lionel messi") < ABBREVIATED_NAME_SIMILARITY);
    }

    #[test]
    fn small_typo_scores_high() {
        let s = name_similarity("zlatan ibrahimovic", "zlatan ibrahimovich");
        assert!(s > 0.9 && s < 1.0);
    }

    #[test]
    fn club_bonus_added() {
        let p = params(0.8);
        let with = score_pair(
            &key("Lionel Messi", None, Some("Inter Miami CF")),
            &key("L. Messi", None, Some("Inter Miami")),
            &p,
        )
        .unwrap();
        let without = score_pair(
            &key("Lionel Messi", None, Some("Inter Miami CF")),
            &key("L. Messi", None, Some("Barcelona")),
            &p,
        )
        .unwrap();
        assert!((with - (0.85 * 0.9 + 0.15)).abs() < 1e-12);
        assert!((without - 0.85 * 0.9).abs() < 1e-12);
    }

    #[test]
    fn score_never_exceeds_one() {
        let p = params(0.5);
        let s = score_pair(
            &key("David Silva", None, Some("Real Sociedad")),
            &key("David Silva", None, Some("Real Sociedad")),
            &p,
        )
        .unwrap();
        assert!(s <= 1.0 && s > 0.99);
    }

    #[test]
    fn differing_dob_disqualifies() {
        let p = params(0.1);
        let a = key("Danilo", Some("1991-07-15"), Some("Juventus"));
        let b = key("Danilo", Some("1991-07-17"), Some("Juventus"));
        assert_eq!(score_pair(&a, &b, &p), None);

        let tolerant = FuzzyParams { date_tolerance_days: 2, ..p };
        assert!(score_pair(&a, &b, &tolerant).is_some());
    }

    #[test]
    fn messi_fuzzy_match() {
        let a = vec![rec_a(0, "158023", "Lionel Messi", Some("1987-06-24"), Some("Inter Miami CF"))];
        let b = vec![rec_b(0, "L. Messi", Some("1987-06-24"), Some("Inter Miami"))];
        let out = run(&a, &b, &params(0.8));
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].method, MatchMethod::Fuzzy);
        assert!(out.pairs[0].score >= 0.8);
        assert!(out.leftover_a.is_empty() && out.leftover_b.is_empty());
    }

    #[test]
    fn below_threshold_left_over() {
        let a = vec![rec_a(0, "1", "Lionel Messi", None, None)];
        let b = vec![rec_b(0, "Cristiano Ronaldo", None, None)];
        let out = run(&a, &b, &params(0.8));
        assert!(out.pairs.is_empty());
        assert_eq!(out.leftover_a, vec![0]);
        assert_eq!(out.leftover_b, vec![0]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let a = vec![rec_a(0, "1", "Lionel Messi", None, Some("Inter Miami"))];
        let b = vec![rec_b(0, "L. Messi", None, Some("Inter Miami CF"))];
        let clubs = ClubNormalizer::default();
        let tables = KeyedTables::new(a.iter().collect(), b.iter().collect(), &clubs);
        let exact_score = score_pair(&tables.keys_a[0], &tables.keys_b[0], &params(0.5)).unwrap();

        let at = run(&a, &b, &params(exact_score));
        assert_eq!(at.pairs.len(), 1);
        assert_eq!(at.pairs[0].score, exact_score);

        let above = run(&a, &b, &params(exact_score + 1e-9));
        assert!(above.pairs.is_empty());
    }

    #[test]
    fn one_to_one_best_score_wins() {
        let a = vec![rec_a(0, "1", "David Silva", None, Some("Real Sociedad"))];
        let b = vec![
            rec_b(0, "David Silva", None, Some("Valencia CF")),
            rec_b(1, "David Silva", None, Some("Real Sociedad")),
        ];
        let out = run(&a, &b, &params(0.8));
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].b, 1);
        assert_eq!(out.leftover_b, vec![0]);
    }

    #[test]
    fn ties_broken_by_player_id() {
        let a = vec![
            rec_a(0, "20", "Joao Silva", None, None),
            rec_a(1, "10", "Joao Silva", None, None),
        ];
        let b = vec![rec_b(0, "João Silva", None, None)];
        let out = run(&a, &b, &params(0.8));
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].a, 1);
        assert_eq!(out.leftover_a, vec![0]);
    }

    #[test]
    fn greedy_can_block_better_total() {
        // a0-b0 (1.0) is taken first and blocks both a0-b1 (0.765) and
        // a1-b0 (0.773), whose sum a maximum-weight assignment would prefer.
        let a = vec![
            rec_a(0, "1", "Marco Reus", None, Some("Dortmund")),
            rec_a(1, "2", "Marco Reuss", None, None),
        ];
        let b = vec![
            rec_b(0, "Marco Reus", None, Some("Dortmund")),
            rec_b(1, "Marco Reu", None, None),
        ];
        let out = run(&a, &b, &params(0.7));
        assert_eq!(out.pairs.len(), 1);
        assert_eq!((out.pairs[0].a, out.pairs[0].b), (0, 0));
        assert_eq!(out.leftover_a, vec![1]);
        assert_eq!(out.leftover_b, vec![1]);
    }
}
