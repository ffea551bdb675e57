//! The universe of informative questions.
//!
//! A question proposes a code to one verifier; the verifier answers yes iff
//! its secret rule accepts the code. For every (proposal, verifier) pair the
//! partition of the full combination universe is computed once; decision-time
//! refinement only re-intersects those sets against the live state. Proposals
//! carrying no information, or the same information as (or strictly less
//! than) another proposal, are filtered out up front.

use crate::code::Code;
use crate::combos::Cwa;
use crate::cwa_set::{Backend, CwaSet};
use crate::problems::Rule;
use std::collections::BTreeMap;

/// The partition a question induces over the combination universe: the
/// combinations whose rule accepts the proposal (`yes`) and the rest (`no`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryInfo {
    pub yes: CwaSet,
    pub no: CwaSet,
}

/// Proposals to per-verifier partitions, ordered for deterministic iteration.
/// The map order doubles as the documented tie-break between equally good
/// moves: lowest proposal first, then lowest verifier index.
pub type QueryMap = BTreeMap<Code, BTreeMap<usize, QueryInfo>>;

/// Computes the informative question universe against the full combination
/// list, then collapses informationally equivalent proposals.
pub fn build_informative_queries(
    cwas: &[Cwa],
    rules: &[Rule],
    num_verifiers: usize,
    backend: Backend,
) -> QueryMap {
    let universe = cwas.len();
    // Partition the universe by the rule each verifier runs; a proposal's yes
    // side is then a union of these per-rule groups instead of a fresh scan.
    let mut by_rule: Vec<BTreeMap<u16, CwaSet>> = vec![BTreeMap::new(); num_verifiers];
    for (i, cwa) in cwas.iter().enumerate() {
        for v in 0..num_verifiers {
            by_rule[v]
                .entry(cwa.assignment[v])
                .or_insert_with(|| CwaSet::empty(backend, universe))
                .insert(i);
        }
    }

    let mut map = QueryMap::new();
    for &code in Code::all() {
        let mut per_v = BTreeMap::new();
        for (v, groups) in by_rule.iter().enumerate() {
            // A verifier whose rule is already pinned down can never give
            // information.
            if groups.len() < 2 {
                continue;
            }
            let mut yes = CwaSet::empty(backend, universe);
            let mut no = CwaSet::empty(backend, universe);
            for (&id, members) in groups {
                if rules[id as usize].rejects.contains(code) {
                    no = no.union(members);
                } else {
                    yes = yes.union(members);
                }
            }
            if !yes.is_empty() && !no.is_empty() {
                per_v.insert(v, QueryInfo { yes, no });
            }
        }
        if !per_v.is_empty() {
            map.insert(code, per_v);
        }
    }
    filter_dominated(map, 0, None)
}

/// The side of the partition containing `anchor`, the smallest live index.
/// Since both sides partition the same live set, comparing anchored sides is
/// exactly comparing unordered {yes, no} pairs (a question and its negation
/// carry the same information).
fn anchored_side(qi: &QueryInfo, anchor: usize) -> &CwaSet {
    if qi.yes.contains(anchor) {
        &qi.yes
    } else {
        &qi.no
    }
}

type Signature = BTreeMap<usize, CwaSet>;

/// `a` is informative on strictly fewer verifiers than `b` and agrees with it
/// everywhere it is informative.
fn strictly_dominated(a: &Signature, b: &Signature) -> bool {
    a.len() < b.len() && a.iter().all(|(v, side)| b.get(v) == Some(side))
}

/// Incremental grouping of proposals by the partitions they induce. Each new
/// proposal is compared against one representative per existing group;
/// equivalent proposals keep only the first-seen representative and strictly
/// dominated proposals are discarded outright. `reserved` is exempt from both
/// removals: mid-round it is the only proposal with a free continuation, so
/// no equally informative code may stand in for it.
fn filter_dominated(map: QueryMap, anchor: usize, reserved: Option<Code>) -> QueryMap {
    let mut reps: Vec<(Code, Signature)> = Vec::new();
    'proposals: for (&code, per_v) in &map {
        let sig: Signature = per_v
            .iter()
            .map(|(&v, qi)| (v, anchored_side(qi, anchor).clone()))
            .collect();
        if Some(code) != reserved {
            for (_, rep_sig) in &reps {
                if sig == *rep_sig || strictly_dominated(&sig, rep_sig) {
                    continue 'proposals;
                }
            }
        }
        // The newcomer may retroactively dominate earlier representatives.
        reps.retain(|(c, rep_sig)| Some(*c) == reserved || !strictly_dominated(rep_sig, &sig));
        reps.push((code, sig));
    }
    let keep: std::collections::BTreeSet<Code> = reps.into_iter().map(|(c, _)| c).collect();
    map.into_iter().filter(|(c, _)| keep.contains(c)).collect()
}

/// Decision-time refinement: intersects every partition with the live set,
/// drops questions that no longer discriminate, and re-runs the dominance
/// grouping against the narrowed partitions. `reserved` names the proposal
/// still open for this round, if any; narrowing the live set can make it
/// indistinguishable from a lower code, and letting that code replace it
/// would silently charge a round for what is a free continuation.
pub fn full_filter(map: &QueryMap, live: &CwaSet, reserved: Option<Code>) -> QueryMap {
    let anchor = live.min_element().expect("empty live set");
    let mut out = QueryMap::new();
    for (&code, per_v) in map {
        let mut pv = BTreeMap::new();
        for (&v, qi) in per_v {
            let yes = qi.yes.intersect(live);
            if yes.is_empty() {
                continue;
            }
            let no = qi.no.intersect(live);
            if no.is_empty() {
                continue;
            }
            pv.insert(v, QueryInfo { yes, no });
        }
        if !pv.is_empty() {
            out.insert(code, pv);
        }
    }
    filter_dominated(out, anchor, reserved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combos::enumerate_valid_combos;
    use crate::problems::{assign_rule_ids, Rule, VerifierCard};
    use crate::code::CodeSet;

    fn pin_problem() -> (Vec<VerifierCard>, Vec<Cwa>) {
        let mut cards: Vec<VerifierCard> = (0..3)
            .map(|digit| VerifierCard {
                rules: [1u8, 2, 3]
                    .iter()
                    .map(|&val| Rule {
                        name: format!("digit {} is {}", digit, val),
                        card: digit as u16,
                        pos: 0,
                        id: 0,
                        rejects: CodeSet::rejecting(move |c| c.digits()[digit] == val),
                    })
                    .collect(),
            })
            .collect();
        assign_rule_ids(&mut cards);
        let cwas = enumerate_valid_combos(&cards);
        assert_eq!(cwas.len(), 27);
        (cards, cwas)
    }

    fn flat_rules(cards: &[VerifierCard]) -> Vec<Rule> {
        cards.iter().flat_map(|c| c.rules.clone()).collect()
    }

    #[test]
    fn partitions_are_nonempty_and_cover() {
        let (cards, cwas) = pin_problem();
        let qs = build_informative_queries(&cwas, &flat_rules(&cards), 3, Backend::Big);
        assert!(!qs.is_empty());
        let full = CwaSet::full(Backend::Big, cwas.len());
        for per_v in qs.values() {
            for qi in per_v.values() {
                assert!(!qi.yes.is_empty());
                assert!(!qi.no.is_empty());
                assert!(qi.yes.intersect(&qi.no).is_empty());
                assert_eq!(qi.yes.union(&qi.no), full);
            }
        }
    }

    #[test]
    fn equivalent_proposals_are_collapsed() {
        let (cards, cwas) = pin_problem();
        let qs = build_informative_queries(&cwas, &flat_rules(&cards), 3, Backend::Big);
        // With digits pinned to 1..3, proposals 444 and 555 would induce the
        // all-no partition everywhere (dropped as uninformative), and e.g.
        // 145 and 155 carry the same information about verifier 0 only...
        // after grouping, no two retained proposals may share a signature.
        let mut sigs: Vec<Vec<(usize, CwaSet)>> = Vec::new();
        for per_v in qs.values() {
            let sig: Vec<(usize, CwaSet)> = per_v
                .iter()
                .map(|(&v, qi)| {
                    (v, if qi.yes.contains(0) { qi.yes.clone() } else { qi.no.clone() })
                })
                .collect();
            assert!(!sigs.contains(&sig), "two retained proposals are isomorphic");
            sigs.push(sig);
        }
    }

    #[test]
    fn filtering_is_idempotent() {
        let (cards, cwas) = pin_problem();
        let qs = build_informative_queries(&cwas, &flat_rules(&cards), 3, Backend::Big);
        let live = CwaSet::full(Backend::Big, cwas.len());
        let once = full_filter(&qs, &live, None);
        let twice = full_filter(&once, &live, None);
        assert_eq!(once, twice);
    }

    #[test]
    fn refinement_drops_settled_questions() {
        let (cards, cwas) = pin_problem();
        let qs = build_informative_queries(&cwas, &flat_rules(&cards), 3, Backend::Big);
        // Keep only combinations whose verifier-0 rule is rule id 0
        // (triangle pinned to 1): questions about verifier 0 stop being
        // informative while the other verifiers' remain.
        let mut live = CwaSet::empty(Backend::Big, cwas.len());
        for (i, cwa) in cwas.iter().enumerate() {
            if cwa.assignment[0] == 0 {
                live.insert(i);
            }
        }
        let refined = full_filter(&qs, &live, None);
        for per_v in refined.values() {
            assert!(!per_v.contains_key(&0));
            for qi in per_v.values() {
                assert_eq!(qi.yes.union(&qi.no).intersect(&live), qi.yes.union(&qi.no));
                assert!(!qi.yes.is_empty() && !qi.no.is_empty());
            }
        }
        // Something informative must survive: two verifiers are still open.
        assert!(!refined.is_empty());
    }

    #[test]
    fn reserved_proposal_is_kept_through_collapse() {
        let (cards, cwas) = pin_problem();
        let qs = build_informative_queries(&cwas, &flat_rules(&cards), 3, Backend::Big);
        // Once the circle digit is narrowed to {2, 3}, proposals 112 and 113
        // split every verifier identically; plain filtering keeps only the
        // lower code.
        let mut live = CwaSet::empty(Backend::Big, cwas.len());
        for (i, cwa) in cwas.iter().enumerate() {
            if cwa.answer.digits()[2] != 1 {
                live.insert(i);
            }
        }
        let reserved = Code::new(1, 1, 3);
        let plain = full_filter(&qs, &live, None);
        assert!(plain.contains_key(&Code::new(1, 1, 2)));
        assert!(!plain.contains_key(&reserved));
        // Reserving 113 keeps it informative on the same verifiers.
        let kept = full_filter(&qs, &live, Some(reserved));
        assert!(kept.contains_key(&reserved));
        assert_eq!(
            kept[&reserved].keys().collect::<Vec<_>>(),
            plain[&Code::new(1, 1, 2)].keys().collect::<Vec<_>>(),
        );
    }

    #[test]
    fn dominated_proposal_is_discarded() {
        // Hand-built: proposal X splits verifier 0 the same way proposal Y
        // does, but Y additionally splits verifier 1. X must disappear.
        let (cards, cwas) = pin_problem();
        let qs = build_informative_queries(&cwas, &flat_rules(&cards), 3, Backend::Big);
        // 111 splits all three verifiers; 115 splits verifiers 0 and 1 the
        // same way (circle digit 5 is rejected by every verifier-2 rule, so
        // verifier 2 is uninformative for it). 115 is therefore dominated.
        assert!(qs.contains_key(&Code::new(1, 1, 1)));
        assert!(!qs.contains_key(&Code::new(1, 1, 5)));
    }
}
