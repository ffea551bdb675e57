// # Turmac: an optimal-strategy solver for the Turing Machine deduction game
//
// A hidden three-digit code (digits 1-5) must be identified by asking yes/no
// questions to a set of verifiers, each of which secretly checks one criterion
// from its rule card. This crate enumerates every rule assignment consistent
// with a unique code, builds the universe of informative questions, and
// searches the game tree for the strategy minimizing the expected number of
// rounds and questions. The "nightmare" variant, where the verifier-to-card
// mapping is itself unknown, is made tractable by symmetry canonicalization.

/// The candidate-code domain: 125 codes and subsets of them.
pub mod code;

/// Built-in catalog of rule cards with precomputed reject sets.
pub mod cards;

/// Problem descriptions and verifier-card assembly (standard/extreme/nightmare).
pub mod problems;

/// Enumeration of valid rule combinations (CWAs) and their unique answers.
pub mod combos;

/// Set-of-combinations substrate: big-integer and packed-word bitsets.
pub mod cwa_set;

/// The universe of informative questions and its dominance filtering.
pub mod queries;

/// Symmetry reduction for nightmare mode: canonical game states.
pub mod canonical;

/// The memoized expectation-minimizing game-tree search.
pub mod search;

/// Top-level solve entry point, solved-strategy persistence, replay.
pub mod solver;

/// A trait for conveniently updating a value to its minimum or maximum.
pub trait SetMinMax {
    /// If `v` is less than `self`, updates `self` to `v` and returns `true`.
    /// Otherwise, returns `false`.
    fn setmin(&mut self, v: Self) -> bool;
    /// If `v` is greater than `self`, updates `self` to `v` and returns `true`.
    /// Otherwise, returns `false`.
    fn setmax(&mut self, v: Self) -> bool;
}
impl<T> SetMinMax for T
where
    T: PartialOrd,
{
    fn setmin(&mut self, v: T) -> bool {
        *self > v && {
            *self = v;
            true
        }
    }
    fn setmax(&mut self, v: T) -> bool {
        *self < v && {
            *self = v;
            true
        }
    }
}
