//! Exact expectimax search over question strategies.
//!
//! A state is the live combination set plus the position within the current
//! round: how many questions were asked on the active proposal. Cost is the
//! pair (rounds, questions) where a round is counted whenever the proposal
//! changes or a fourth question on the same proposal is needed; the first
//! proposal of the game is free. States are memoized, in nightmare mode
//! under their verifier-relabeling canonical form.

use crate::canonical::Canonicalizer;
use crate::code::Code;
use crate::combos::one_answer_left;
use crate::cwa_set::CwaSet;
use crate::queries::full_filter;
use crate::solver::Context;
use crate::SetMinMax;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameState {
    /// Questions already asked on the active proposal, at most 3. A filled
    /// round drops the proposal: which code exhausted it no longer matters,
    /// so all exhausted states share the form `{3, None}`.
    pub queries_this_round: u8,
    pub active_proposal: Option<Code>,
    pub live: CwaSet,
}

impl GameState {
    pub fn fresh(live: CwaSet) -> GameState {
        GameState {
            queries_this_round: 0,
            active_proposal: None,
            live,
        }
    }
}

/// A question: propose `proposal` and ask verifier `verifier` about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub proposal: Code,
    pub verifier: usize,
}

/// The value of a state: the cost to certainty under optimal play, and the
/// question achieving it. Terminal states carry no move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluated {
    pub best: Option<Move>,
    pub rounds: f64,
    pub queries: f64,
}

impl Evaluated {
    fn terminal() -> Evaluated {
        Evaluated {
            best: None,
            rounds: 0.0,
            queries: 0.0,
        }
    }

    pub fn key(&self) -> (OrderedFloat<f64>, OrderedFloat<f64>) {
        (OrderedFloat(self.rounds), OrderedFloat(self.queries))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Minimize expected (rounds, queries), outcomes weighted by the share
    /// of live combinations on each side.
    Expectation,
    /// Minimize the lexicographic maximum over answer sequences.
    WorstCase,
}

/// Additional rounds incurred by proposing `proposal` from `state`. Zero for
/// the game's first proposal and for reusing the active proposal while the
/// round has room; one for every proposal switch or overflow into a new
/// round.
pub fn move_cost(state: &GameState, proposal: Code) -> f64 {
    if state.queries_this_round >= 3 {
        return 1.0;
    }
    match state.active_proposal {
        None => 0.0,
        Some(p) if p == proposal => 0.0,
        _ => 1.0,
    }
}

/// The state after asking about `proposal` and learning that the live set
/// narrows to `outcome`. The third question on a proposal exhausts the round
/// and normalizes to `{3, None}`.
pub fn apply(state: &GameState, proposal: Code, outcome: CwaSet) -> GameState {
    let continues = state.active_proposal == Some(proposal) && state.queries_this_round < 3;
    let asked = if continues {
        state.queries_this_round + 1
    } else {
        1
    };
    GameState {
        queries_this_round: asked,
        active_proposal: if asked == 3 { None } else { Some(proposal) },
        live: outcome,
    }
}

pub struct Search<'a> {
    ctx: &'a Context,
    pub objective: Objective,
    /// When set, terminal states are memoized under their raw form too, so a
    /// replay can resolve them without re-deriving.
    pub cache_end_states: bool,
    pub cache: FxHashMap<GameState, Evaluated>,
}

impl<'a> Search<'a> {
    pub fn new(ctx: &'a Context, objective: Objective, cache_end_states: bool) -> Search<'a> {
        Search {
            ctx,
            objective,
            cache_end_states,
            cache: FxHashMap::default(),
        }
    }

    /// Optimal value of `state`. The returned move is expressed in the
    /// state's own verifier numbering even when the cache entry was stored
    /// under a relabeled form.
    pub fn evaluate(&mut self, state: GameState) -> Evaluated {
        let ctx = self.ctx;
        if one_answer_left(&ctx.cwas, &state.live) {
            let ev = Evaluated::terminal();
            if self.cache_end_states {
                self.cache.insert(state, ev.clone());
            }
            return ev;
        }
        let (state, sigma) = match &ctx.canon {
            Some(c) => {
                let (live, sigma) = c.relabel(&state.live, &ctx.cwas);
                (GameState { live, ..state }, Some(sigma))
            }
            None => (state, None),
        };
        if let Some(ev) = self.cache.get(&state) {
            return map_back(ev.clone(), sigma.as_deref());
        }
        let ev = self.decide(&state);
        self.cross_check(&state, &ev);
        self.cache.insert(state, ev.clone());
        map_back(ev, sigma.as_deref())
    }

    /// Picks the best question for a non-terminal state. Questions reusing
    /// the active proposal are tried first since only they can avoid a round;
    /// once a move with a fractional expected round count is in hand, no
    /// fresh proposal can improve on it and that phase is skipped.
    fn decide(&mut self, state: &GameState) -> Evaluated {
        let ctx = self.ctx;
        // The open proposal is reserved so the dominance grouping cannot
        // replace it with an equivalent code whose questions would cost a
        // round.
        let open = state.active_proposal.filter(|_| state.queries_this_round < 3);
        let qmap = full_filter(&ctx.queries, &state.live, open);
        let groups = ctx
            .canon
            .as_ref()
            .map(|c| c.verifier_groups(&state.live, &ctx.cwas));
        let mut best: Option<((OrderedFloat<f64>, OrderedFloat<f64>), Move)> = None;

        let reuse = open.filter(|p| qmap.contains_key(p));
        if let Some(p) = reuse {
            'reuse: for (&v, _) in &qmap[&p] {
                if skip_by_group(&groups, &qmap[&p], v) {
                    continue;
                }
                let mv = Move {
                    proposal: p,
                    verifier: v,
                };
                let key = self.try_move(state, mv, 0.0);
                if best.as_ref().is_none_or(|(bk, _)| key < *bk) {
                    best = Some((key, mv));
                    if key == (OrderedFloat(0.0), OrderedFloat(1.0)) {
                        break 'reuse;
                    }
                }
            }
        }

        let fresh_delta = if state.queries_this_round == 0 { 0.0 } else { 1.0 };
        let skip_fresh = best
            .as_ref()
            .is_some_and(|(bk, _)| fresh_delta > 0.0 && bk.0 < OrderedFloat(1.0));
        if !skip_fresh {
            'fresh: for (&c, per_v) in &qmap {
                if Some(c) == reuse {
                    continue;
                }
                for (&v, _) in per_v {
                    if skip_by_group(&groups, per_v, v) {
                        continue;
                    }
                    let mv = Move {
                        proposal: c,
                        verifier: v,
                    };
                    let key = self.try_move(state, mv, fresh_delta);
                    if best.as_ref().is_none_or(|(bk, _)| key < *bk) {
                        best = Some((key, mv));
                        if key == (OrderedFloat(fresh_delta), OrderedFloat(1.0)) {
                            break 'fresh;
                        }
                    }
                }
            }
        }

        match best {
            Some((key, mv)) => Evaluated {
                best: Some(mv),
                rounds: key.0 .0,
                queries: key.1 .0,
            },
            None => {
                // The filtered universe holds an informative question for
                // every unresolved live set, so this is only reachable by
                // abandoning a round that cannot continue.
                assert!(
                    state.queries_this_round > 0,
                    "no informative question for an unresolved state"
                );
                let mut ev = self.evaluate(GameState::fresh(state.live.clone()));
                ev.rounds += 1.0;
                ev
            }
        }
    }

    /// Cost of asking `mv` from `state`: the question itself, the round
    /// charge `delta`, and the optimal continuation of both outcomes.
    fn try_move(
        &mut self,
        state: &GameState,
        mv: Move,
        delta: f64,
    ) -> (OrderedFloat<f64>, OrderedFloat<f64>) {
        let ctx = self.ctx;
        let qi = &ctx.queries[&mv.proposal][&mv.verifier];
        let yes = qi.yes.intersect(&state.live);
        let no = qi.no.intersect(&state.live);
        let (py, pn) = (yes.len() as f64, no.len() as f64);
        let total = py + pn;
        let cy = self.evaluate(apply(state, mv.proposal, yes));
        let cn = self.evaluate(apply(state, mv.proposal, no));
        match self.objective {
            Objective::Expectation => (
                OrderedFloat(delta + (py * cy.rounds + pn * cn.rounds) / total),
                OrderedFloat(1.0 + (py * cy.queries + pn * cn.queries) / total),
            ),
            Objective::WorstCase => {
                let mut worst = cy.key();
                worst.setmax(cn.key());
                (
                    OrderedFloat(delta + worst.0 .0),
                    OrderedFloat(1.0 + worst.1 .0),
                )
            }
        }
    }

    /// Recomputes the chosen move's value from the unfiltered question
    /// universe and the memoized children. Catches any disagreement between
    /// the shared partitions and the per-state refinement.
    fn cross_check(&mut self, state: &GameState, ev: &Evaluated) {
        let Some(mv) = ev.best else { return };
        let Some(qi) = self
            .ctx
            .queries
            .get(&mv.proposal)
            .and_then(|pv| pv.get(&mv.verifier))
        else {
            return;
        };
        let yes = qi.yes.intersect(&state.live);
        let no = qi.no.intersect(&state.live);
        assert!(!yes.is_empty() && !no.is_empty());
        let key = self.try_move(state, mv, move_cost(state, mv.proposal));
        assert!(
            (key.0 .0 - ev.rounds).abs() < 1e-6 && (key.1 .0 - ev.queries).abs() < 1e-6,
            "memoized value diverges from recomputation"
        );
    }
}

fn map_back(mut ev: Evaluated, sigma: Option<&[u8]>) -> Evaluated {
    if let (Some(sigma), Some(mv)) = (sigma, ev.best.as_mut()) {
        mv.verifier = Canonicalizer::original_verifier(sigma, mv.verifier);
    }
    ev
}

/// Interchangeable verifiers yield interchangeable questions; only the
/// lowest-indexed member of each class present for a proposal is explored.
fn skip_by_group(
    groups: &Option<Vec<u8>>,
    per_v: &std::collections::BTreeMap<usize, crate::queries::QueryInfo>,
    v: usize,
) -> bool {
    groups
        .as_ref()
        .is_some_and(|g| per_v.range(..v).any(|(&u, _)| g[u] == g[v]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combos::tests::pin_cards;
    use crate::solver::Context;
    use crate::problems::Mode;

    fn ctx_for(specs: &[(usize, &[u8])], mode: Mode) -> Context {
        Context::build_from_cards(pin_cards(specs), mode).unwrap()
    }

    #[test]
    fn round_charges() {
        let live = CwaSet::full(crate::cwa_set::Backend::Big, 4);
        let p = Code::new(1, 1, 1);
        let q = Code::new(2, 1, 1);

        let start = GameState::fresh(live.clone());
        assert_eq!(move_cost(&start, p), 0.0);
        let s1 = apply(&start, p, live.clone());
        assert_eq!(s1.queries_this_round, 1);

        // Reusing the proposal is free until the round fills up.
        assert_eq!(move_cost(&s1, p), 0.0);
        let s2 = apply(&s1, p, live.clone());
        let s3 = apply(&s2, p, live.clone());
        assert_eq!(s3.queries_this_round, 3);
        assert_eq!(s3.active_proposal, None);
        assert_eq!(move_cost(&s3, p), 1.0);
        let s4 = apply(&s3, p, live.clone());
        assert_eq!(s4.queries_this_round, 1);
        assert_eq!(s4.active_proposal, Some(p));

        // Switching proposals always opens a round.
        assert_eq!(move_cost(&s1, q), 1.0);
        let t = apply(&s1, q, live.clone());
        assert_eq!(t.queries_this_round, 1);
        assert_eq!(t.active_proposal, Some(q));

        // Which proposal exhausted the round is forgotten, so rounds filled
        // by different proposals land on the same state.
        let u1 = apply(&start, q, live.clone());
        let u2 = apply(&u1, q, live.clone());
        let u3 = apply(&u2, q, live);
        assert_eq!(u3, s3);
    }

    #[test]
    fn settled_game_costs_nothing() {
        let ctx = ctx_for(&[(0, &[1]), (1, &[1]), (2, &[1])], Mode::Standard);
        assert_eq!(ctx.cwas.len(), 1);
        let mut search = Search::new(&ctx, Objective::Expectation, false);
        let ev = search.evaluate(ctx.initial_state());
        assert_eq!(ev, Evaluated { best: None, rounds: 0.0, queries: 0.0 });
    }

    #[test]
    fn two_combinations_need_one_question() {
        let ctx = ctx_for(&[(0, &[1, 2]), (1, &[1]), (2, &[1])], Mode::Standard);
        assert_eq!(ctx.cwas.len(), 2);
        let mut search = Search::new(&ctx, Objective::Expectation, false);
        let ev = search.evaluate(ctx.initial_state());
        assert_eq!(ev.rounds, 0.0);
        assert_eq!(ev.queries, 1.0);
        assert!(ev.best.is_some());
    }

    #[test]
    fn one_proposal_can_serve_two_verifiers() {
        // Four combinations, two binary verifiers: any code answers both
        // questions, so the whole game fits in a single free round.
        let ctx = ctx_for(&[(0, &[1, 2]), (1, &[1, 2]), (2, &[1])], Mode::Standard);
        assert_eq!(ctx.cwas.len(), 4);
        for objective in [Objective::Expectation, Objective::WorstCase] {
            let mut search = Search::new(&ctx, objective, false);
            let ev = search.evaluate(ctx.initial_state());
            assert_eq!(ev.rounds, 0.0);
            assert_eq!(ev.queries, 2.0);
        }
    }

    #[test]
    fn three_way_verifier_forces_proposal_switches() {
        // One ternary verifier: every question pins one digit value, so a
        // second question needs a different proposal and with it a round.
        let ctx = ctx_for(&[(0, &[1, 2, 3]), (1, &[1]), (2, &[1])], Mode::Standard);
        assert_eq!(ctx.cwas.len(), 3);
        let mut search = Search::new(&ctx, Objective::Expectation, false);
        let ev = search.evaluate(ctx.initial_state());
        assert!((ev.queries - 5.0 / 3.0).abs() < 1e-9);
        assert!((ev.rounds - 2.0 / 3.0).abs() < 1e-9);

        let mut worst = Search::new(&ctx, Objective::WorstCase, false);
        let ev = worst.evaluate(ctx.initial_state());
        assert_eq!(ev.rounds, 1.0);
        assert_eq!(ev.queries, 2.0);
    }

    #[test]
    fn narrowing_keeps_the_active_proposal_free() {
        // After one question on 113 the live set narrows so that 113 and 112
        // split every verifier identically. Two more questions on 113 finish
        // within the open round; switching to 112 would buy nothing and cost
        // a round.
        let ctx = ctx_for(&[(0, &[1, 2]), (1, &[1]), (2, &[1, 2, 3])], Mode::Standard);
        assert_eq!(ctx.cwas.len(), 6);
        let mut live = CwaSet::empty(ctx.backend, ctx.cwas.len());
        for (i, cwa) in ctx.cwas.iter().enumerate() {
            if cwa.answer.digits()[2] != 1 {
                live.insert(i);
            }
        }
        assert_eq!(live.len(), 4);
        let state = GameState {
            queries_this_round: 1,
            active_proposal: Some(Code::new(1, 1, 3)),
            live,
        };
        let mut search = Search::new(&ctx, Objective::Expectation, false);
        let ev = search.evaluate(state);
        assert_eq!(ev.rounds, 0.0);
        assert_eq!(ev.queries, 2.0);
        assert_eq!(ev.best.unwrap().proposal, Code::new(1, 1, 3));
    }

    #[test]
    fn three_questions_fit_one_round() {
        let ctx = ctx_for(&[(0, &[1, 2]), (1, &[1, 2]), (2, &[1, 2])], Mode::Standard);
        assert_eq!(ctx.cwas.len(), 8);
        let mut search = Search::new(&ctx, Objective::Expectation, false);
        let ev = search.evaluate(ctx.initial_state());
        assert_eq!(ev.rounds, 0.0);
        assert_eq!(ev.queries, 3.0);
    }

    #[test]
    fn end_state_caching_records_terminals() {
        let ctx = ctx_for(&[(0, &[1, 2]), (1, &[1]), (2, &[1])], Mode::Standard);
        let mut search = Search::new(&ctx, Objective::Expectation, true);
        search.evaluate(ctx.initial_state());
        let terminals = search
            .cache
            .iter()
            .filter(|(s, ev)| ev.best.is_none() && s.live.len() == 1)
            .count();
        assert_eq!(terminals, 2);
    }
}
