//! Problem descriptions and verifier-card assembly.
//!
//! A problem is an ordered list of catalog card numbers plus a mode. Standard
//! and nightmare problems put one card behind each verifier; extreme problems
//! put two, concatenated with duplicate criteria removed. In nightmare mode,
//! which verifier holds which card is an unknown permutation resolved by the
//! solver.

use crate::cards;
use crate::code::CodeSet;
use crate::solver::SolverError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Standard,
    Extreme,
    Nightmare,
}

/// One criterion attached to a verifier, with its reject set precomputed.
/// `id` is unique across all rules of a problem, so rules can be compared and
/// stored by identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    /// Catalog card this criterion came from.
    pub card: u16,
    /// Position on the (possibly merged) verifier card.
    pub pos: u8,
    pub id: u16,
    pub rejects: CodeSet,
}

/// The ordered list of mutually exclusive rules one verifier may be checking.
#[derive(Clone, Debug)]
pub struct VerifierCard {
    pub rules: Vec<Rule>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub cards: Vec<u16>,
    pub mode: Mode,
}

/// Assigns globally unique rule ids, sequential across verifiers. Positions
/// within each card are renumbered to match the final layout.
pub fn assign_rule_ids(cards: &mut [VerifierCard]) {
    let mut id = 0u16;
    for card in cards.iter_mut() {
        for (pos, rule) in card.rules.iter_mut().enumerate() {
            rule.pos = pos as u8;
            rule.id = id;
            id += 1;
        }
    }
}

fn catalog_rules(number: u16) -> Result<Vec<Rule>, SolverError> {
    let def = cards::get_card(number).ok_or(SolverError::UnknownCard(number))?;
    Ok(def
        .criteria
        .iter()
        .map(|cr| Rule {
            name: cr.name.to_string(),
            card: number,
            pos: 0,
            id: 0,
            rejects: cr.rejects,
        })
        .collect())
}

/// Materializes the verifier cards for a problem description.
pub fn build_verifier_cards(problem: &Problem) -> Result<Vec<VerifierCard>, SolverError> {
    if problem.cards.is_empty() {
        return Err(SolverError::NoCards);
    }
    let mut out = match problem.mode {
        Mode::Standard | Mode::Nightmare => problem
            .cards
            .iter()
            .map(|&n| Ok(VerifierCard {
                rules: catalog_rules(n)?,
            }))
            .collect::<Result<Vec<_>, SolverError>>()?,
        Mode::Extreme => {
            if problem.cards.len() % 2 != 0 {
                return Err(SolverError::OddExtremeCards(problem.cards.len()));
            }
            let mut cards = Vec::with_capacity(problem.cards.len() / 2);
            for pair in problem.cards.chunks_exact(2) {
                let mut rules = catalog_rules(pair[0])?;
                for rule in catalog_rules(pair[1])? {
                    // A criterion duplicated across the two halves behaves
                    // identically; keep only the first copy.
                    if !rules.iter().any(|r| r.rejects == rule.rejects) {
                        rules.push(rule);
                    }
                }
                cards.push(VerifierCard { rules });
            }
            cards
        }
    };
    assign_rule_ids(&mut out);
    Ok(out)
}

/// A named, bundled problem definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownProblem {
    pub name: &'static str,
    pub cards: &'static [u16],
    pub mode: Mode,
}

impl KnownProblem {
    pub fn problem(&self) -> Problem {
        Problem {
            cards: self.cards.to_vec(),
            mode: self.mode,
        }
    }
}

const PROBLEMS_DATA: &[KnownProblem] = &[
    KnownProblem {
        name: "demo",
        cards: &[4, 9, 11, 14],
        mode: Mode::Standard,
    },
    KnownProblem {
        name: "orders",
        cards: &[3, 8, 14, 22],
        mode: Mode::Standard,
    },
    KnownProblem {
        name: "parity",
        cards: &[2, 6, 14, 17],
        mode: Mode::Standard,
    },
    KnownProblem {
        name: "demo-extreme",
        cards: &[4, 9, 11, 14, 2, 6, 17, 23],
        mode: Mode::Extreme,
    },
    KnownProblem {
        name: "demo-nightmare",
        cards: &[4, 9, 11, 14],
        mode: Mode::Nightmare,
    },
];

pub fn all_problems() -> &'static [KnownProblem] {
    PROBLEMS_DATA
}

// Build a name -> problem map once for O(1) lookup.
static PROBLEM_MAP: Lazy<HashMap<&'static str, &'static KnownProblem>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for p in PROBLEMS_DATA.iter() {
        m.insert(p.name, p);
    }
    m
});

pub fn get_problem(name: &str) -> Option<&'static KnownProblem> {
    PROBLEM_MAP.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_build() {
        let cards = build_verifier_cards(&Problem {
            cards: vec![4, 9, 11, 14],
            mode: Mode::Standard,
        })
        .unwrap();
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].rules.len(), 3);
        assert_eq!(cards[1].rules.len(), 4);
        // Ids are sequential across verifiers, positions local to each card.
        let ids: Vec<u16> = cards.iter().flat_map(|c| c.rules.iter().map(|r| r.id)).collect();
        assert_eq!(ids, (0..13).collect::<Vec<u16>>());
        assert_eq!(cards[1].rules[0].pos, 0);
        assert_eq!(cards[1].rules[3].pos, 3);
    }

    #[test]
    fn extreme_build_merges_pairs() {
        let cards = build_verifier_cards(&Problem {
            cards: vec![4, 9, 2, 6],
            mode: Mode::Extreme,
        })
        .unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].rules.len(), 3 + 4);
        assert_eq!(cards[1].rules.len(), 3 + 2);
        // Merged cards keep provenance but renumber positions.
        assert_eq!(cards[0].rules[3].card, 9);
        assert_eq!(cards[0].rules[3].pos, 3);
    }

    #[test]
    fn extreme_build_drops_duplicate_criteria() {
        // Merging a card with itself collapses to one copy of each criterion.
        let cards = build_verifier_cards(&Problem {
            cards: vec![7, 7],
            mode: Mode::Extreme,
        })
        .unwrap();
        assert_eq!(cards[0].rules.len(), 2);
    }

    #[test]
    fn build_errors() {
        assert!(matches!(
            build_verifier_cards(&Problem {
                cards: vec![4, 999],
                mode: Mode::Standard
            }),
            Err(SolverError::UnknownCard(999))
        ));
        assert!(matches!(
            build_verifier_cards(&Problem {
                cards: vec![4, 9, 11],
                mode: Mode::Extreme
            }),
            Err(SolverError::OddExtremeCards(3))
        ));
        assert!(matches!(
            build_verifier_cards(&Problem {
                cards: vec![],
                mode: Mode::Standard
            }),
            Err(SolverError::NoCards)
        ));
    }

    #[test]
    fn known_problems() {
        let p = get_problem("demo").expect("demo should exist");
        assert_eq!(p.cards, &[4, 9, 11, 14]);
        assert_eq!(p.mode, Mode::Standard);
        assert!(get_problem("unknown").is_none());
        for kp in all_problems() {
            build_verifier_cards(&kp.problem()).unwrap();
        }
    }
}
