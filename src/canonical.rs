//! Verifier-relabeling symmetry for nightmare mode.
//!
//! When the verifier-to-card correspondence is unknown, permuting verifier
//! indices maps the combination universe onto itself, so search states that
//! differ only by such a relabeling have the same cost. Before a state is
//! cached, its live set is rewritten under the relabeling that minimizes it,
//! collapsing up to `V!` symmetric states into one cache entry. The chosen
//! relabeling is returned so the best move can be translated back.

use crate::combos::Cwa;
use crate::cwa_set::CwaSet;
use itertools::Itertools;
use rustc_hash::FxHashMap;

/// Packs a verifier-to-card permutation into 3-bit fields, low verifier
/// first. With at most 8 verifiers this fits a `u32` with room to spare.
fn perm_key(perm: &[u8]) -> u32 {
    perm.iter()
        .enumerate()
        .fold(0, |k, (v, &card)| k | (card as u32) << (3 * v))
}

pub struct Canonicalizer {
    num_verifiers: usize,
    /// `(base combo, packed perm)` to combination index. Total over the
    /// nightmare universe, since every permutation of a valid base
    /// combination is present.
    index_of: FxHashMap<(u32, u32), u32>,
}

impl Canonicalizer {
    pub fn new(num_verifiers: usize, num_rules: usize, cwas: &[Cwa]) -> Canonicalizer {
        assert!(num_verifiers <= 8, "too many verifiers to relabel");
        assert!(num_rules <= 128, "rule possibility masks are 128 bits");
        let index_of = cwas
            .iter()
            .enumerate()
            .map(|(i, c)| ((c.combo, perm_key(&c.perm)), i as u32))
            .collect();
        Canonicalizer {
            num_verifiers,
            index_of,
        }
    }

    /// The live set rewritten under the verifier relabeling `tau`, where
    /// canonical position `w` observes original verifier `tau[w]`.
    fn remap(&self, live: &CwaSet, cwas: &[Cwa], tau: &[usize]) -> CwaSet {
        let mut out = live.empty_like();
        for i in live.iter() {
            let c = &cwas[i];
            let mut key = 0u32;
            for (w, &v) in tau.iter().enumerate() {
                key |= (c.perm[v] as u32) << (3 * w);
            }
            out.insert(self.index_of[&(c.combo, key)] as usize);
        }
        out
    }

    /// Finds the relabeling minimizing the rewritten live set. Returns the
    /// minimal set together with `sigma`, mapping each original verifier
    /// index to its canonical position.
    ///
    /// Trying all `V!` relabelings per state would swamp the search, so
    /// verifiers are first ordered by their rule possibility mask over the
    /// live set. That order is forced except among verifiers with equal
    /// masks; only the permutations within those tie groups are enumerated.
    pub fn relabel(&self, live: &CwaSet, cwas: &[Cwa]) -> (CwaSet, Vec<u8>) {
        let nv = self.num_verifiers;
        let mut masks = vec![0u128; nv];
        for i in live.iter() {
            for (v, &rule) in cwas[i].assignment.iter().enumerate() {
                masks[v] |= 1u128 << rule;
            }
        }
        let mut order: Vec<usize> = (0..nv).collect();
        order.sort_by(|&a, &b| masks[b].cmp(&masks[a]));
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for &v in &order {
            match groups.last_mut() {
                Some(g) if masks[g[0]] == masks[v] => g.push(v),
                _ => groups.push(vec![v]),
            }
        }
        let mut best: Option<(CwaSet, Vec<usize>)> = None;
        for parts in groups
            .iter()
            .map(|g| g.iter().copied().permutations(g.len()))
            .multi_cartesian_product()
        {
            let tau = parts.concat();
            let remapped = self.remap(live, cwas, &tau);
            if best.as_ref().is_none_or(|(b, _)| remapped < *b) {
                best = Some((remapped, tau));
            }
        }
        let (canon, tau) = best.expect("at least one relabeling candidate");
        let mut sigma = vec![0u8; nv];
        for (w, &v) in tau.iter().enumerate() {
            sigma[v] = w as u8;
        }
        (canon, sigma)
    }

    /// The original verifier index behind canonical position `canon`.
    pub fn original_verifier(sigma: &[u8], canon: usize) -> usize {
        sigma
            .iter()
            .position(|&w| w as usize == canon)
            .expect("canonical position out of range")
    }

    /// Partitions verifiers into interchangeability classes with respect to
    /// `live`: two verifiers share a class when swapping them maps the live
    /// set onto itself. Querying one member of a class costs the same as
    /// querying any other, so move generation only needs the lowest-indexed
    /// member of each class per proposal.
    pub fn verifier_groups(&self, live: &CwaSet, cwas: &[Cwa]) -> Vec<u8> {
        let nv = self.num_verifiers;
        let mut group = vec![u8::MAX; nv];
        let mut next = 0u8;
        for v in 0..nv {
            if group[v] != u8::MAX {
                continue;
            }
            group[v] = next;
            for w in v + 1..nv {
                if group[w] == u8::MAX && self.swap_fixes(live, cwas, v, w) {
                    group[w] = next;
                }
            }
            next += 1;
        }
        group
    }

    /// Whether transposing verifiers `u` and `v` maps `live` onto itself.
    /// Equal possibility masks alone are not enough: the joint assignment
    /// structure matters, so the transposition is applied element by element.
    fn swap_fixes(&self, live: &CwaSet, cwas: &[Cwa], u: usize, v: usize) -> bool {
        for i in live.iter() {
            let c = &cwas[i];
            let cu = (c.perm[u] as u32) << (3 * v);
            let cv = (c.perm[v] as u32) << (3 * u);
            let mut key = perm_key(&c.perm);
            key &= !((0b111 << (3 * u)) | (0b111 << (3 * v)));
            key |= cu | cv;
            match self.index_of.get(&(c.combo, key)) {
                Some(&j) if live.contains(j as usize) => {}
                _ => return false,
            }
        }
        true
    }
}
