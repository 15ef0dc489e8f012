use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::model::{
    MatchCandidatePair, MatchMethod, NormalizedKey, PlayerRecordA, PlayerRecordB, StageOutput,
};
use crate::normalize::ClubNormalizer;

/// Both tables plus their normalized keys, computed once per run.
///
/// Stage outputs refer to records by index into `a` / `b`.
pub struct KeyedTables<'a> {
    pub a: Vec<&'a PlayerRecordA>,
    pub b: Vec<&'a PlayerRecordB>,
    pub keys_a: Vec<NormalizedKey>,
    pub keys_b: Vec<NormalizedKey>,
}

impl<'a> KeyedTables<'a> {
    pub fn new(
        a: Vec<&'a PlayerRecordA>,
        b: Vec<&'a PlayerRecordB>,
        clubs: &ClubNormalizer,
    ) -> Self {
        let keys_a = a
            .iter()
            .map(|r| clubs.normalized_key(r.match_name(), r.dob, r.club_name.as_deref()))
            .collect();
        let keys_b = b
            .iter()
            .map(|r| clubs.normalized_key(&r.name, r.dob, r.club_name.as_deref()))
            .collect();
        Self { a, b, keys_a, keys_b }
    }

    pub fn all_a(&self) -> Vec<usize> {
        (0..self.a.len()).collect()
    }

    pub fn all_b(&self) -> Vec<usize> {
        (0..self.b.len()).collect()
    }
}

/// Dates can belong to the same person: equal, or at least one unknown.
fn dates_compatible(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

/// Same-name pair is the same person: equal dates, or a missing date backed by the club.
fn identity_agrees(a: &NormalizedKey, b: &NormalizedKey) -> bool {
    match (a.dob, b.dob) {
        (Some(x), Some(y)) => x == y,
        _ => a.club.is_some() && a.club == b.club,
    }
}

/// Match on identical normalized names with compatible birth dates.
///
/// Any B with several A candidates, and any A claimed by several Bs, is left
/// for the fuzzy stage untouched instead of guessing.
pub fn exact_match(tables: &KeyedTables) -> StageOutput {
    let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (ai, key) in tables.keys_a.iter().enumerate() {
        if !key.name.is_empty() {
            by_name.entry(key.name.as_str()).or_default().push(ai);
        }
    }

    let candidates: Vec<Vec<usize>> = tables
        .keys_b
        .iter()
        .map(|kb| {
            if kb.name.is_empty() {
                return Vec::new();
            }
            by_name
                .get(kb.name.as_str())
                .map(|list| {
                    list.iter()
                        .copied()
                        .filter(|&ai| dates_compatible(tables.keys_a[ai].dob, kb.dob))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let mut contenders = vec![0usize; tables.a.len()];
    for cands in &candidates {
        for &ai in cands {
            contenders[ai] += 1;
        }
    }

    let mut used_a = vec![false; tables.a.len()];
    let mut used_b = vec![false; tables.b.len()];
    let mut pairs = Vec::new();
    let mut ambiguous_a: BTreeSet<usize> = BTreeSet::new();
    let mut ambiguous_b = 0;

    for (bi, cands) in candidates.iter().enumerate() {
        match cands.as_slice() {
            [] => {}
            [ai] if contenders[*ai] == 1 => {
                let ai = *ai;
                if identity_agrees(&tables.keys_a[ai], &tables.keys_b[bi]) {
                    used_a[ai] = true;
                    used_b[bi] = true;
                    pairs.push(MatchCandidatePair {
                        a: ai,
                        b: bi,
                        score: 1.0,
                        method: MatchMethod::Exact,
                    });
                }
            }
            _ => {
                log::debug!(
                    "ambiguous exact key '{}': {} candidate(s), routed to fuzzy stage",
                    tables.keys_b[bi].name,
                    cands.len()
                );
                ambiguous_b += 1;
                ambiguous_a.extend(cands.iter().copied());
            }
        }
    }

    StageOutput {
        pairs,
        leftover_a: (0..tables.a.len()).filter(|&i| !used_a[i]).collect(),
        leftover_b: (0..tables.b.len()).filter(|&i| !used_b[i]).collect(),
        ambiguous: ambiguous_a.len() + ambiguous_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{rec_a, rec_b};

    fn run(a: &[PlayerRecordA], b: &[PlayerRecordB]) -> StageOutput {
        let clubs = ClubNormalizer::default();
        let tables = KeyedTables::new(a.iter().collect(), b.iter().collect(), &clubs);
        exact_match(&tables)
    }

    #[test]
    fn same_name_same_dob() {
        let a = vec![
            rec_a(0, "1", "Kevin De Bruyne", Some("1991-06-28"), Some("Manchester City")),
            rec_a(1, "2", "Erling Haaland", Some("2000-07-21"), Some("Manchester City")),
        ];
        let b = vec![
            rec_b(0, "Erling Haaland", Some("2000-07-21"), Some("Man City")),
            rec_b(1, "Kevin De Bruyne", Some("1991-06-28"), None),
        ];
        let out = run(&a, &b);
        assert_eq!(out.pairs.len(), 2);
        // Pairs come out in B order
        assert_eq!((out.pairs[0].a, out.pairs[0].b), (1, 0));
        assert_eq!((out.pairs[1].a, out.pairs[1].b), (0, 1));
        assert!(out.pairs.iter().all(|p| p.method == MatchMethod::Exact));
        assert!(out.leftover_a.is_empty());
        assert!(out.leftover_b.is_empty());
        assert_eq!(out.ambiguous, 0);
    }

    #[test]
    fn accents_and_case_do_not_block_exact() {
        let a = vec![rec_a(0, "1", "Kylian Mbappé Lottin", Some("1998-12-20"), None)];
        let b = vec![rec_b(0, "KYLIAN MBAPPE LOTTIN", Some("1998-12-20"), None)];
        assert_eq!(run(&a, &b).pairs.len(), 1);
    }

    #[test]
    fn different_dob_not_matched() {
        let a = vec![rec_a(0, "1", "Danilo", Some("1991-07-15"), Some("Juventus"))];
        let b = vec![rec_b(0, "Danilo", Some("2001-04-29"), Some("Juventus"))];
        let out = run(&a, &b);
        assert!(out.pairs.is_empty());
        assert_eq!(out.leftover_a, vec![0]);
        assert_eq!(out.leftover_b, vec![0]);
    }

    #[test]
    fn missing_dob_falls_back_to_club() {
        let a = vec![
            rec_a(0, "1", "Rodri", Some("1996-06-22"), Some("Manchester City FC")),
            rec_a(1, "2", "Pedri", Some("2002-11-25"), Some("FC Barcelona")),
        ];
        let b = vec![
            rec_b(0, "Rodri", None, Some("Manchester City")),
            rec_b(1, "Pedri", None, Some("Real Madrid")),
        ];
        let out = run(&a, &b);
        assert_eq!(out.pairs.len(), 1);
        assert_eq!((out.pairs[0].a, out.pairs[0].b), (0, 0));
        assert_eq!(out.leftover_a, vec![1]);
        assert_eq!(out.leftover_b, vec![1]);
    }

    #[test]
    fn missing_dob_and_club_not_matched() {
        let a = vec![rec_a(0, "1", "Rodri", None, None)];
        let b = vec![rec_b(0, "Rodri", None, None)];
        assert!(run(&a, &b).pairs.is_empty());
    }

    #[test]
    fn two_b_for_one_a_is_ambiguous() {
        let a = vec![rec_a(0, "1", "David Silva", None, Some("Real Sociedad"))];
        let b = vec![
            rec_b(0, "David Silva", None, Some("Real Sociedad")),
            rec_b(1, "David Silva", None, Some("Valencia CF")),
        ];
        let out = run(&a, &b);
        assert!(out.pairs.is_empty());
        assert_eq!(out.leftover_a, vec![0]);
        assert_eq!(out.leftover_b, vec![0, 1]);
        assert_eq!(out.ambiguous, 3);
    }

    #[test]
    fn two_a_for_one_b_is_ambiguous() {
        let a = vec![
            rec_a(0, "1", "Vitinha", None, Some("Paris Saint-Germain")),
            rec_a(1, "2", "Vitinha", None, Some("Genoa")),
        ];
        let b = vec![rec_b(0, "Vitinha", None, Some("Paris Saint-Germain"))];
        let out = run(&a, &b);
        assert!(out.pairs.is_empty());
        assert_eq!(out.leftover_a, vec![0, 1]);
        assert_eq!(out.ambiguous, 3);
    }

    #[test]
    fn dob_disambiguates_same_name() {
        let a = vec![
            rec_a(0, "1", "Vitinha", Some("2000-02-13"), None),
            rec_a(1, "2", "Vitinha", Some("2000-03-15"), None),
        ];
        let b = vec![rec_b(0, "Vitinha", Some("2000-03-15"), None)];
        let out = run(&a, &b);
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].a, 1);
        assert_eq!(out.ambiguous, 0);
    }

    #[test]
    fn empty_names_never_match() {
        let a = vec![rec_a(0, "1", "...", Some("2000-01-01"), None)];
        let b = vec![rec_b(0, "", Some("2000-01-01"), None)];
        let out = run(&a, &b);
        assert!(out.pairs.is_empty());
    }
}
