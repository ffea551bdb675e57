//! Enumeration of valid rule combinations.
//!
//! A combination assigns one rule to every verifier. It is valid when the
//! rules together reject all codes but one (that code is the combination's
//! answer) and no rule is redundant: every rule must reject at least one code
//! no other rule rejects. Nightmare mode additionally leaves the
//! verifier-to-card correspondence unknown, so each valid combination is
//! expanded across every permutation of it.

use crate::code::{Code, CodeSet, NUM_CODES};
use crate::cwa_set::CwaSet;
use crate::problems::{Rule, VerifierCard};
use itertools::Itertools;

/// A combination-with-answer: one globally consistent assignment of rules to
/// verifiers, together with the unique code it implies. Generated once per
/// problem and held in an indexed list; all search state refers to these by
/// index only.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cwa {
    /// Rule id checked by each verifier.
    pub assignment: Vec<u16>,
    /// Card slot behind each verifier. Identity outside nightmare mode.
    pub perm: Vec<u8>,
    /// Index of the underlying base combination (shared by its permutations).
    pub combo: u32,
    pub answer: Code,
}

/// Checks the two-part validity test over precomputed reject sets and returns
/// the surviving code if the combination is valid.
fn validate(rules: &[&Rule]) -> Option<Code> {
    let mut union = CodeSet::EMPTY;
    for r in rules {
        union = union.union(r.rejects);
    }
    if union.len() != NUM_CODES - 1 {
        return None;
    }
    // No redundant rule: each one must uniquely reject something.
    for (i, r) in rules.iter().enumerate() {
        let mut others = CodeSet::EMPTY;
        for (j, o) in rules.iter().enumerate() {
            if j != i {
                others = others.union(o.rejects);
            }
        }
        if r.rejects.difference(others).is_empty() {
            return None;
        }
    }
    union.complement().sole()
}

/// Cross-products the rule choices of all cards and keeps the valid
/// combinations. The result order is the lexicographic order of rule choices.
pub fn enumerate_valid_combos(cards: &[VerifierCard]) -> Vec<Cwa> {
    assert!(!cards.is_empty());
    let identity: Vec<u8> = (0..cards.len() as u8).collect();
    let mut out = Vec::new();
    for choice in cards
        .iter()
        .map(|c| c.rules.iter())
        .multi_cartesian_product()
    {
        if let Some(answer) = validate(&choice) {
            out.push(Cwa {
                assignment: choice.iter().map(|r| r.id).collect(),
                perm: identity.clone(),
                combo: out.len() as u32,
                answer,
            });
        }
    }
    out
}

/// Expands each valid base combination across every verifier-to-card
/// permutation. All permutations of a valid combination are themselves valid
/// (validity only depends on the set of rules), so nothing is re-checked.
pub fn enumerate_nightmare_combos(cards: &[VerifierCard]) -> Vec<Cwa> {
    let base = enumerate_valid_combos(cards);
    let v = cards.len();
    let mut out = Vec::with_capacity(base.len() * (1..=v).product::<usize>());
    for cwa in &base {
        for perm in (0..v).permutations(v) {
            out.push(Cwa {
                assignment: perm.iter().map(|&c| cwa.assignment[c]).collect(),
                perm: perm.iter().map(|&c| c as u8).collect(),
                combo: cwa.combo,
                answer: cwa.answer,
            });
        }
    }
    out
}

/// Whether every combination in `set` implies the same answer. On the hot
/// path of every search step, so it short-circuits on the second distinct
/// answer instead of collecting the answer set.
pub fn one_answer_left(cwas: &[Cwa], set: &CwaSet) -> bool {
    let mut first = None;
    for i in set.iter() {
        match first {
            None => first = Some(cwas[i].answer),
            Some(a) if a != cwas[i].answer => return false,
            Some(_) => {}
        }
    }
    true
}
