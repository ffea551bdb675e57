//! Problem setup and the solving facade.
//!
//! A [`Solver`] owns the precomputed [`Context`] for one problem: the flat
//! rule list, the combination universe, the informative question map, and
//! the relabeling machinery in nightmare mode. Solving produces a
//! [`SolveResult`] holding the full strategy cache, which can be replayed
//! against any hidden combination, pruned to the reachable strategy tree,
//! and serialized for later sessions.

use crate::canonical::Canonicalizer;
use crate::combos::{enumerate_nightmare_combos, enumerate_valid_combos, one_answer_left, Cwa};
use crate::cwa_set::{Backend, CwaSet};
use crate::problems::{build_verifier_cards, Mode, Problem, Rule, VerifierCard};
use crate::queries::{build_informative_queries, QueryMap};
use crate::search::{apply, move_cost, Evaluated, GameState, Move, Objective, Search};
use anyhow::Context as _;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("card {0} is not in the catalog")]
    UnknownCard(u16),
    #[error("extreme mode pairs cards two to a verifier, got {0}")]
    OddExtremeCards(usize),
    #[error("no rule combination of cards {cards:?} leaves exactly one code")]
    NoValidCombos { cards: Vec<u16> },
    #[error("a problem needs at least one verifier card")]
    NoCards,
}

/// Everything derived from a problem before any search runs.
pub struct Context {
    pub num_verifiers: usize,
    /// All rules across all verifiers, indexed by rule id.
    pub rules: Vec<Rule>,
    pub cards: Vec<VerifierCard>,
    pub cwas: Vec<Cwa>,
    pub queries: QueryMap,
    pub backend: Backend,
    /// Present exactly in nightmare mode.
    pub canon: Option<Canonicalizer>,
}

impl Context {
    pub fn build(problem: &Problem) -> Result<Context, SolverError> {
        Context::build_from_cards(build_verifier_cards(problem)?, problem.mode)
    }

    /// Builds from already materialized cards, for callers assembling rules
    /// outside the catalog. Rule ids must be flat-sequential, as
    /// [`crate::problems::assign_rule_ids`] leaves them.
    pub fn build_from_cards(cards: Vec<VerifierCard>, mode: Mode) -> Result<Context, SolverError> {
        if cards.is_empty() {
            return Err(SolverError::NoCards);
        }
        let num_verifiers = cards.len();
        let rules: Vec<Rule> = cards.iter().flat_map(|c| c.rules.clone()).collect();
        for (i, r) in rules.iter().enumerate() {
            assert_eq!(r.id as usize, i, "rule ids must index the flat rule list");
        }
        let cwas = match mode {
            Mode::Nightmare => enumerate_nightmare_combos(&cards),
            Mode::Standard | Mode::Extreme => enumerate_valid_combos(&cards),
        };
        if cwas.is_empty() {
            return Err(SolverError::NoValidCombos {
                cards: rules.iter().map(|r| r.card).unique().collect(),
            });
        }
        let backend = Backend::auto(cwas.len());
        let queries = build_informative_queries(&cwas, &rules, num_verifiers, backend);
        let canon = match mode {
            Mode::Nightmare => Some(Canonicalizer::new(num_verifiers, rules.len(), &cwas)),
            Mode::Standard | Mode::Extreme => None,
        };
        Ok(Context {
            num_verifiers,
            rules,
            cards,
            cwas,
            queries,
            backend,
            canon,
        })
    }

    pub fn initial_state(&self) -> GameState {
        GameState::fresh(CwaSet::full(self.backend, self.cwas.len()))
    }
}

/// A solved strategy: the root value and the memoized value of every state
/// the search visited (or, after pruning, every state the strategy can
/// reach).
pub struct SolveResult {
    pub objective: Objective,
    pub initial: GameState,
    pub root: Evaluated,
    pub cache: FxHashMap<GameState, Evaluated>,
    pub elapsed: Duration,
}

/// JSON needs string map keys, so the cache travels as an entry list.
#[derive(Serialize, Deserialize)]
struct BlobRepr {
    objective: Objective,
    initial: GameState,
    root: Evaluated,
    elapsed: Duration,
    cache: Vec<(GameState, Evaluated)>,
}

impl SolveResult {
    pub fn to_blob(&self) -> anyhow::Result<String> {
        let repr = BlobRepr {
            objective: self.objective,
            initial: self.initial.clone(),
            root: self.root.clone(),
            elapsed: self.elapsed,
            cache: self
                .cache
                .iter()
                .map(|(s, e)| (s.clone(), e.clone()))
                .collect(),
        };
        serde_json::to_string(&repr).context("serializing solve result")
    }

    pub fn from_blob(blob: &str) -> anyhow::Result<SolveResult> {
        let repr: BlobRepr = serde_json::from_str(blob).context("parsing solve result")?;
        Ok(SolveResult {
            objective: repr.objective,
            initial: repr.initial,
            root: repr.root,
            elapsed: repr.elapsed,
            cache: repr.cache.into_iter().collect(),
        })
    }
}

pub struct Solver {
    ctx: Context,
}

impl Solver {
    pub fn new(problem: &Problem) -> Result<Solver, SolverError> {
        Ok(Solver {
            ctx: Context::build(problem)?,
        })
    }

    pub fn from_cards(cards: Vec<VerifierCard>, mode: Mode) -> Result<Solver, SolverError> {
        Ok(Solver {
            ctx: Context::build_from_cards(cards, mode)?,
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn solve(&self) -> SolveResult {
        self.solve_with(Objective::Expectation, false)
    }

    pub fn solve_with(&self, objective: Objective, cache_end_states: bool) -> SolveResult {
        let start = Instant::now();
        let mut search = Search::new(&self.ctx, objective, cache_end_states);
        let initial = self.ctx.initial_state();
        let root = search.evaluate(initial.clone());
        SolveResult {
            objective,
            initial,
            root,
            cache: search.cache,
            elapsed: start.elapsed(),
        }
    }

    /// The cache key of a state and, in nightmare mode, the relabeling that
    /// produced it.
    fn cache_key(&self, state: &GameState) -> (GameState, Option<Vec<u8>>) {
        match &self.ctx.canon {
            Some(c) => {
                let (live, sigma) = c.relabel(&state.live, &self.ctx.cwas);
                (
                    GameState {
                        live,
                        ..state.clone()
                    },
                    Some(sigma),
                )
            }
            None => (state.clone(), None),
        }
    }

    /// The strategy's question for `state`, in the state's own verifier
    /// numbering. `None` for settled states and for states the (possibly
    /// pruned) cache does not cover.
    pub fn best_move(&self, result: &SolveResult, state: &GameState) -> Option<Move> {
        if one_answer_left(&self.ctx.cwas, &state.live) {
            return None;
        }
        let (key, sigma) = self.cache_key(state);
        let mut mv = result.cache.get(&key)?.best?;
        if let Some(sigma) = &sigma {
            mv.verifier = Canonicalizer::original_verifier(sigma, mv.verifier);
        }
        Some(mv)
    }

    /// Both successor states of asking `mv` from `state`, yes side first.
    pub fn children(&self, state: &GameState, mv: Move) -> (GameState, GameState) {
        let qi = &self.ctx.queries[&mv.proposal][&mv.verifier];
        (
            apply(state, mv.proposal, qi.yes.intersect(&state.live)),
            apply(state, mv.proposal, qi.no.intersect(&state.live)),
        )
    }

    pub fn advance(&self, state: &GameState, mv: Move, answer_yes: bool) -> GameState {
        let (yes, no) = self.children(state, mv);
        if answer_yes {
            yes
        } else {
            no
        }
    }

    /// Plays the strategy against the hidden combination `truth` and returns
    /// the (rounds, queries) actually spent.
    pub fn replay_one(&self, result: &SolveResult, truth: usize) -> (f64, f64) {
        let mut state = result.initial.clone();
        let mut rounds = 0.0;
        let mut queries = 0.0;
        while let Some(mv) = self.best_move(result, &state) {
            rounds += move_cost(&state, mv.proposal);
            queries += 1.0;
            let qi = &self.ctx.queries[&mv.proposal][&mv.verifier];
            state = self.advance(&state, mv, qi.yes.contains(truth));
            assert!(state.live.contains(truth), "strategy eliminated the truth");
        }
        assert!(
            one_answer_left(&self.ctx.cwas, &state.live),
            "strategy ran out of questions before certainty"
        );
        (rounds, queries)
    }

    /// Average cost of the strategy over every possible hidden combination.
    /// Under the expectation objective this must reproduce the root value.
    pub fn replay_all(&self, result: &SolveResult) -> (f64, f64) {
        let n = self.ctx.cwas.len() as f64;
        let mut rounds = 0.0;
        let mut queries = 0.0;
        for truth in 0..self.ctx.cwas.len() {
            let (r, q) = self.replay_one(result, truth);
            rounds += r;
            queries += q;
        }
        (rounds / n, queries / n)
    }

    /// Drops every cache entry the strategy cannot reach from the initial
    /// state. The search memoizes states for all moves it considered; only
    /// the best-move tree matters for replay.
    pub fn prune(&self, result: &mut SolveResult) {
        let mut keep: FxHashMap<GameState, Evaluated> = FxHashMap::default();
        let mut stack = vec![result.initial.clone()];
        while let Some(state) = stack.pop() {
            if one_answer_left(&self.ctx.cwas, &state.live) {
                if let Some(ev) = result.cache.get(&state) {
                    keep.insert(state, ev.clone());
                }
                continue;
            }
            let (key, _) = self.cache_key(&state);
            if keep.contains_key(&key) {
                continue;
            }
            let Some(ev) = result.cache.get(&key) else {
                continue;
            };
            keep.insert(key, ev.clone());
            if let Some(mv) = self.best_move(result, &state) {
                let (yes, no) = self.children(&state, mv);
                stack.push(yes);
                stack.push(no);
            }
        }
        result.cache = keep;
    }
}
