use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of candidate codes: three digits, each 1 through 5.
pub const NUM_CODES: usize = 125;

/// One candidate code: the digits shown on the triangle, square and circle
/// dials. Codes are totally ordered by (triangle, square, circle).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Code {
    pub triangle: u8,
    pub square: u8,
    pub circle: u8,
}

static ALL_CODES: Lazy<Vec<Code>> = Lazy::new(|| {
    let mut v = Vec::with_capacity(NUM_CODES);
    for triangle in 1..=5 {
        for square in 1..=5 {
            for circle in 1..=5 {
                v.push(Code {
                    triangle,
                    square,
                    circle,
                });
            }
        }
    }
    v
});

impl Code {
    pub fn new(triangle: u8, square: u8, circle: u8) -> Self {
        debug_assert!((1..=5).contains(&triangle));
        debug_assert!((1..=5).contains(&square));
        debug_assert!((1..=5).contains(&circle));
        Self {
            triangle,
            square,
            circle,
        }
    }

    /// All 125 codes in natural order.
    pub fn all() -> &'static [Code] {
        &ALL_CODES
    }

    /// Position of this code in natural order, in `0..125`.
    pub fn index(self) -> usize {
        (self.triangle as usize - 1) * 25 + (self.square as usize - 1) * 5 + self.circle as usize
            - 1
    }

    pub fn from_index(i: usize) -> Self {
        debug_assert!(i < NUM_CODES);
        Code {
            triangle: (i / 25) as u8 + 1,
            square: (i / 5 % 5) as u8 + 1,
            circle: (i % 5) as u8 + 1,
        }
    }

    pub fn digits(self) -> [u8; 3] {
        [self.triangle, self.square, self.circle]
    }

    pub fn sum(self) -> u8 {
        self.triangle + self.square + self.circle
    }

    /// How many of the three digits equal `d`.
    pub fn count_of(self, d: u8) -> usize {
        self.digits().iter().filter(|&&x| x == d).count()
    }

    pub fn count_even(self) -> usize {
        self.digits().iter().filter(|&&x| x % 2 == 0).count()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.triangle, self.square, self.circle)
    }
}

/// A subset of the 125 codes, one bit per code index. Used for rule reject
/// sets, where the whole domain always fits in a single `u128`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CodeSet(u128);

const FULL_MASK: u128 = (1u128 << NUM_CODES) - 1;

impl CodeSet {
    pub const EMPTY: CodeSet = CodeSet(0);

    pub fn full() -> CodeSet {
        CodeSet(FULL_MASK)
    }

    /// The set of codes for which `pred` is false. Rule reject sets are built
    /// from their acceptance predicate through this.
    pub fn rejecting(pred: impl Fn(Code) -> bool) -> CodeSet {
        let mut s = CodeSet::EMPTY;
        for &c in Code::all() {
            if !pred(c) {
                s.insert(c);
            }
        }
        s
    }

    pub fn insert(&mut self, c: Code) {
        self.0 |= 1u128 << c.index();
    }

    pub fn contains(&self, c: Code) -> bool {
        self.0 >> c.index() & 1 == 1
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(&self, other: CodeSet) -> CodeSet {
        CodeSet(self.0 | other.0)
    }

    pub fn intersect(&self, other: CodeSet) -> CodeSet {
        CodeSet(self.0 & other.0)
    }

    pub fn difference(&self, other: CodeSet) -> CodeSet {
        CodeSet(self.0 & !other.0)
    }

    pub fn complement(&self) -> CodeSet {
        CodeSet(!self.0 & FULL_MASK)
    }

    /// The single member, if this is a singleton.
    pub fn sole(&self) -> Option<Code> {
        if self.len() == 1 {
            Some(Code::from_index(self.0.trailing_zeros() as usize))
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Code> + '_ {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                None
            } else {
                let i = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(Code::from_index(i))
            }
        })
    }
}

impl fmt::Debug for CodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip() {
        for (i, &c) in Code::all().iter().enumerate() {
            assert_eq!(c.index(), i);
            assert_eq!(Code::from_index(i), c);
        }
    }

    #[test]
    fn natural_order() {
        let all = Code::all();
        assert_eq!(all[0], Code::new(1, 1, 1));
        assert_eq!(all[124], Code::new(5, 5, 5));
        for w in all.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn set_algebra() {
        // Rejecting every code with an even digit keeps the 3^3 all-odd ones.
        let odds = CodeSet::rejecting(|c| c.count_even() > 0);
        assert_eq!(odds.len(), 27);
        assert!(odds.contains(Code::new(1, 3, 5)));
        assert!(!odds.contains(Code::new(1, 2, 5)));
        assert_eq!(odds.union(odds.complement()), CodeSet::full());
        assert_eq!(odds.intersect(odds.complement()), CodeSet::EMPTY);
        assert_eq!(odds.difference(odds), CodeSet::EMPTY);
        assert_eq!(CodeSet::full().len(), NUM_CODES);
    }

    #[test]
    fn sole_member() {
        let mut s = CodeSet::EMPTY;
        assert_eq!(s.sole(), None);
        s.insert(Code::new(2, 4, 1));
        assert_eq!(s.sole(), Some(Code::new(2, 4, 1)));
        s.insert(Code::new(5, 5, 5));
        assert_eq!(s.sole(), None);
    }

    #[test]
    fn iter_matches_contains() {
        let s = CodeSet::rejecting(|c| c.sum() % 3 == 0);
        let listed: Vec<Code> = s.iter().collect();
        assert_eq!(listed.len(), s.len());
        for c in &listed {
            assert!(s.contains(*c));
        }
    }
}
