//! The rule-card catalog.
//!
//! Each card is a short list of mutually exclusive criteria; a verifier set up
//! with that card secretly checks exactly one of them. Reject sets are
//! precomputed once over the 125 codes, so everything downstream is pure set
//! algebra. The catalog covers the cards used by the bundled problems; it is
//! not the complete 48-card deck.

use crate::code::{Code, CodeSet};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Criterion {
    pub name: &'static str,
    pub rejects: CodeSet,
}

#[derive(Debug, Clone)]
pub struct CardDef {
    pub number: u16,
    pub criteria: Vec<Criterion>,
}

fn crit(name: &'static str, accepts: impl Fn(Code) -> bool) -> Criterion {
    Criterion {
        name,
        rejects: CodeSet::rejecting(accepts),
    }
}

fn card(number: u16, criteria: Vec<Criterion>) -> CardDef {
    CardDef { number, criteria }
}

static CARDS: Lazy<Vec<CardDef>> = Lazy::new(|| {
    vec![
        card(
            1,
            vec![
                crit("triangle is 1", |c| c.triangle == 1),
                crit("triangle is greater than 1", |c| c.triangle > 1),
            ],
        ),
        card(
            2,
            vec![
                crit("triangle is less than 3", |c| c.triangle < 3),
                crit("triangle is 3", |c| c.triangle == 3),
                crit("triangle is greater than 3", |c| c.triangle > 3),
            ],
        ),
        card(
            3,
            vec![
                crit("square is less than 3", |c| c.square < 3),
                crit("square is 3", |c| c.square == 3),
                crit("square is greater than 3", |c| c.square > 3),
            ],
        ),
        card(
            4,
            vec![
                crit("square is less than 4", |c| c.square < 4),
                crit("square is 4", |c| c.square == 4),
                crit("square is greater than 4", |c| c.square > 4),
            ],
        ),
        card(
            5,
            vec![
                crit("triangle is even", |c| c.triangle % 2 == 0),
                crit("triangle is odd", |c| c.triangle % 2 == 1),
            ],
        ),
        card(
            6,
            vec![
                crit("square is even", |c| c.square % 2 == 0),
                crit("square is odd", |c| c.square % 2 == 1),
            ],
        ),
        card(
            7,
            vec![
                crit("circle is even", |c| c.circle % 2 == 0),
                crit("circle is odd", |c| c.circle % 2 == 1),
            ],
        ),
        card(
            8,
            vec![
                crit("no 1s in the code", |c| c.count_of(1) == 0),
                crit("one 1 in the code", |c| c.count_of(1) == 1),
                crit("two 1s in the code", |c| c.count_of(1) == 2),
                crit("three 1s in the code", |c| c.count_of(1) == 3),
            ],
        ),
        card(
            9,
            vec![
                crit("no 3s in the code", |c| c.count_of(3) == 0),
                crit("one 3 in the code", |c| c.count_of(3) == 1),
                crit("two 3s in the code", |c| c.count_of(3) == 2),
                crit("three 3s in the code", |c| c.count_of(3) == 3),
            ],
        ),
        card(
            10,
            vec![
                crit("no 4s in the code", |c| c.count_of(4) == 0),
                crit("one 4 in the code", |c| c.count_of(4) == 1),
                crit("two 4s in the code", |c| c.count_of(4) == 2),
                crit("three 4s in the code", |c| c.count_of(4) == 3),
            ],
        ),
        card(
            11,
            vec![
                crit("triangle is less than square", |c| c.triangle < c.square),
                crit("triangle equals square", |c| c.triangle == c.square),
                crit("triangle is greater than square", |c| c.triangle > c.square),
            ],
        ),
        card(
            12,
            vec![
                crit("triangle is less than circle", |c| c.triangle < c.circle),
                crit("triangle equals circle", |c| c.triangle == c.circle),
                crit("triangle is greater than circle", |c| c.triangle > c.circle),
            ],
        ),
        card(
            13,
            vec![
                crit("square is less than circle", |c| c.square < c.circle),
                crit("square equals circle", |c| c.square == c.circle),
                crit("square is greater than circle", |c| c.square > c.circle),
            ],
        ),
        card(
            14,
            vec![
                crit("triangle is smaller than the other two", |c| {
                    c.triangle < c.square && c.triangle < c.circle
                }),
                crit("square is smaller than the other two", |c| {
                    c.square < c.triangle && c.square < c.circle
                }),
                crit("circle is smaller than the other two", |c| {
                    c.circle < c.triangle && c.circle < c.square
                }),
            ],
        ),
        card(
            15,
            vec![
                crit("triangle is larger than the other two", |c| {
                    c.triangle > c.square && c.triangle > c.circle
                }),
                crit("square is larger than the other two", |c| {
                    c.square > c.triangle && c.square > c.circle
                }),
                crit("circle is larger than the other two", |c| {
                    c.circle > c.triangle && c.circle > c.square
                }),
            ],
        ),
        card(
            16,
            vec![
                crit("more even digits than odd", |c| c.count_even() >= 2),
                crit("more odd digits than even", |c| c.count_even() <= 1),
            ],
        ),
        card(
            17,
            vec![
                crit("no even digits", |c| c.count_even() == 0),
                crit("one even digit", |c| c.count_even() == 1),
                crit("two even digits", |c| c.count_even() == 2),
                crit("three even digits", |c| c.count_even() == 3),
            ],
        ),
        card(
            18,
            vec![
                crit("the sum is even", |c| c.sum() % 2 == 0),
                crit("the sum is odd", |c| c.sum() % 2 == 1),
            ],
        ),
        card(
            19,
            vec![
                crit("triangle plus square is less than 6", |c| {
                    c.triangle + c.square < 6
                }),
                crit("triangle plus square is 6", |c| c.triangle + c.square == 6),
                crit("triangle plus square is greater than 6", |c| {
                    c.triangle + c.square > 6
                }),
            ],
        ),
        card(
            20,
            vec![
                crit("a digit repeats three times", |c| {
                    c.triangle == c.square && c.square == c.circle
                }),
                crit("a digit repeats twice", |c| max_multiplicity(c) == 2),
                crit("no digit repeats", |c| max_multiplicity(c) == 1),
            ],
        ),
        card(
            21,
            vec![
                crit("no pair of identical digits", |c| max_multiplicity(c) != 2),
                crit("a pair of identical digits", |c| max_multiplicity(c) == 2),
            ],
        ),
        card(
            22,
            vec![
                crit("digits in ascending order", |c| {
                    c.triangle < c.square && c.square < c.circle
                }),
                crit("digits in descending order", |c| {
                    c.triangle > c.square && c.square > c.circle
                }),
                crit("digits in no order", |c| {
                    !(c.triangle < c.square && c.square < c.circle)
                        && !(c.triangle > c.square && c.square > c.circle)
                }),
            ],
        ),
        card(
            23,
            vec![
                crit("the sum is less than 6", |c| c.sum() < 6),
                crit("the sum is 6", |c| c.sum() == 6),
                crit("the sum is greater than 6", |c| c.sum() > 6),
            ],
        ),
        card(
            24,
            vec![
                crit("three ascending consecutive digits", |c| asc_run(c) == 3),
                crit("two ascending consecutive digits", |c| asc_run(c) == 2),
                crit("no ascending consecutive digits", |c| asc_run(c) == 1),
            ],
        ),
        card(
            25,
            vec![
                crit("no consecutive digits", |c| run(c) == 1),
                crit("two consecutive digits", |c| run(c) == 2),
                crit("three consecutive digits", |c| run(c) == 3),
            ],
        ),
    ]
});

/// Largest number of times any single digit appears in the code.
fn max_multiplicity(c: Code) -> usize {
    (1..=5).map(|d| c.count_of(d)).max().unwrap()
}

/// Length of the ascending +1 run: 3 for e.g. 234, 2 for e.g. 231, else 1.
fn asc_run(c: Code) -> usize {
    let up1 = c.square == c.triangle + 1;
    let up2 = c.circle == c.square + 1;
    if up1 && up2 {
        3
    } else if up1 || up2 {
        2
    } else {
        1
    }
}

/// Like `asc_run` but counting ascending or descending steps of 1.
fn run(c: Code) -> usize {
    let step1 = c.triangle.abs_diff(c.square) == 1;
    let step2 = c.square.abs_diff(c.circle) == 1;
    let asc3 = c.square == c.triangle + 1 && c.circle == c.square + 1;
    let desc3 = c.triangle == c.square + 1 && c.square == c.circle + 1;
    if asc3 || desc3 {
        3
    } else if step1 || step2 {
        2
    } else {
        1
    }
}

static CARD_MAP: Lazy<HashMap<u16, &'static CardDef>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for c in CARDS.iter() {
        m.insert(c.number, c);
    }
    m
});

pub fn all_cards() -> &'static [CardDef] {
    &CARDS
}

pub fn get_card(number: u16) -> Option<&'static CardDef> {
    CARD_MAP.get(&number).copied()
}
