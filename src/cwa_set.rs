//! Sets of combination indices.
//!
//! All search state is expressed as subsets of the immutable combination
//! universe, so this representation is on every hot path: membership,
//! intersection, cardinality and a stable hash/equality contract for cache
//! keys. Two interchangeable encodings are provided and selected once per
//! problem: a `BigUint` whose bits map 1:1 to combination indices (compact
//! for small universes), and a fixed-width `u64` word array (predictable
//! layout for large nightmare universes).

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Which bitset encoding a problem uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    Big,
    Packed,
}

impl Backend {
    /// Picks an encoding from the universe size: the big-integer form wins
    /// for small universes, the packed form for large ones.
    pub fn auto(universe: usize) -> Backend {
        if universe <= 512 {
            Backend::Big
        } else {
            Backend::Packed
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CwaSet {
    Big(BigUint),
    Packed(Vec<u64>),
}

impl CwaSet {
    pub fn empty(backend: Backend, universe: usize) -> CwaSet {
        match backend {
            Backend::Big => CwaSet::Big(BigUint::default()),
            Backend::Packed => CwaSet::Packed(vec![0; universe.div_ceil(64)]),
        }
    }

    pub fn full(backend: Backend, universe: usize) -> CwaSet {
        let mut s = CwaSet::empty(backend, universe);
        for i in 0..universe {
            s.insert(i);
        }
        s
    }

    /// An empty set with the same encoding (and, for the packed form, the
    /// same word width) as `self`.
    pub fn empty_like(&self) -> CwaSet {
        match self {
            CwaSet::Big(_) => CwaSet::Big(BigUint::default()),
            CwaSet::Packed(w) => CwaSet::Packed(vec![0; w.len()]),
        }
    }

    pub fn insert(&mut self, i: usize) {
        match self {
            CwaSet::Big(b) => b.set_bit(i as u64, true),
            CwaSet::Packed(w) => w[i / 64] |= 1u64 << (i % 64),
        }
    }

    pub fn contains(&self, i: usize) -> bool {
        match self {
            CwaSet::Big(b) => b.bit(i as u64),
            CwaSet::Packed(w) => w
                .get(i / 64)
                .is_some_and(|word| word >> (i % 64) & 1 == 1),
        }
    }

    pub fn intersect(&self, other: &CwaSet) -> CwaSet {
        match (self, other) {
            (CwaSet::Big(a), CwaSet::Big(b)) => CwaSet::Big(a & b),
            (CwaSet::Packed(a), CwaSet::Packed(b)) => {
                debug_assert_eq!(a.len(), b.len());
                CwaSet::Packed(a.iter().zip(b).map(|(x, y)| x & y).collect())
            }
            _ => panic!("mixed bitset encodings"),
        }
    }

    pub fn union(&self, other: &CwaSet) -> CwaSet {
        match (self, other) {
            (CwaSet::Big(a), CwaSet::Big(b)) => CwaSet::Big(a | b),
            (CwaSet::Packed(a), CwaSet::Packed(b)) => {
                debug_assert_eq!(a.len(), b.len());
                CwaSet::Packed(a.iter().zip(b).map(|(x, y)| x | y).collect())
            }
            _ => panic!("mixed bitset encodings"),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CwaSet::Big(b) => b.count_ones() as usize,
            CwaSet::Packed(w) => w.iter().map(|x| x.count_ones() as usize).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CwaSet::Big(b) => b.bits() == 0,
            CwaSet::Packed(w) => w.iter().all(|&x| x == 0),
        }
    }

    /// Ascending member indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> + 'static {
        let words = match self {
            CwaSet::Big(b) => b.to_u64_digits(),
            CwaSet::Packed(w) => w.clone(),
        };
        words.into_iter().enumerate().flat_map(|(wi, mut word)| {
            std::iter::from_fn(move || {
                if word == 0 {
                    None
                } else {
                    let bit = word.trailing_zeros() as usize;
                    word &= word - 1;
                    Some(wi * 64 + bit)
                }
            })
        })
    }

    /// Smallest member index, if any.
    pub fn min_element(&self) -> Option<usize> {
        self.iter().next()
    }
}
