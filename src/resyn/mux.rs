use crate::resyn::index_list::{IndexList, VARIANT_XAG};
use crate::resyn::ResynEngine;
use crate::sim::TruthTable;

/// Resynthesis by greedy multiplexer selection
///
/// At each step the engine picks the divisor polarity covering the most
/// still-uncovered care bits such that some candidate (a constant or a
/// divisor literal) matches the target everywhere under it, and emits a
/// 2-to-1 mux with that divisor as the selector. The uncovered remainder is
/// solved recursively. Each mux costs three And gates in the produced list.
#[derive(Debug, Clone, Default)]
pub struct MuxResyn;

/// Gates in the emitted list per selected mux
const GATES_PER_MUX: usize = 3;

impl ResynEngine for MuxResyn {
    fn synthesize(
        &mut self,
        target: &TruthTable,
        care: &TruthTable,
        divs: &[TruthTable],
        max_inserts: usize,
    ) -> Option<IndexList> {
        let mut list = IndexList::new(divs.len() as u32, VARIANT_XAG);
        let mut care = care.clone();
        let mut chain: Vec<(u32, u32)> = Vec::new();

        let last = loop {
            if care.is_zero() {
                break IndexList::const_lit(false);
            }
            if let Some(c) = full_agreement(target, &care, divs) {
                break c;
            }
            if (chain.len() + 1) * GATES_PER_MUX > max_inserts {
                return None;
            }
            let (sel, branch) = best_mux(target, &care, divs)?;
            let sel_value = lit_value(divs, sel, care.nb_bits());
            care &= &!&sel_value;
            chain.push((sel, branch));
        };

        // Fold the chain from the innermost branch outward
        let mut out = last;
        for &(sel, branch) in chain.iter().rev() {
            let g1 = list.add_and(sel, branch);
            let g2 = list.add_and(sel ^ 1, out);
            out = list.add_and(g1 ^ 1, g2 ^ 1) ^ 1;
        }
        list.add_output(out);
        Some(list)
    }
}

/// Value of a literal over the divisors, with constants at positions 0 and 1
fn lit_value(divs: &[TruthTable], lit: u32, nb_bits: usize) -> TruthTable {
    let t = match lit >> 1 {
        0 => TruthTable::zeros(nb_bits),
        1 => TruthTable::ones(nb_bits),
        p => divs[p as usize - 2].clone(),
    };
    if lit & 1 != 0 {
        !&t
    } else {
        t
    }
}

/// All candidate literals: constants first, then both divisor polarities
fn candidates(divs: &[TruthTable]) -> impl Iterator<Item = u32> + '_ {
    (0..2u32).chain((0..divs.len() as u32).flat_map(|v| {
        let lit = (v + 2) << 1;
        [lit, lit | 1]
    }))
}

/// Find a candidate matching the target on every care bit
fn full_agreement(target: &TruthTable, care: &TruthTable, divs: &[TruthTable]) -> Option<u32> {
    candidates(divs).find(|&c| {
        let diff = &lit_value(divs, c, care.nb_bits()) ^ target;
        !diff.intersects(care)
    })
}

/// Pick the selector and branch covering the most care bits
///
/// A pair is admissible when the branch equals the target on every care bit
/// where the selector is high; among those the selector covering the most
/// care bits wins.
fn best_mux(target: &TruthTable, care: &TruthTable, divs: &[TruthTable]) -> Option<(u32, u32)> {
    let mut best = None;
    let mut best_score = 0usize;
    for v in 0..divs.len() as u32 {
        for sel in [(v + 2) << 1, ((v + 2) << 1) | 1] {
            let sel_value = lit_value(divs, sel, care.nb_bits());
            let covered = care & &sel_value;
            let score = covered.count_ones();
            if score <= best_score {
                continue;
            }
            for c in candidates(divs) {
                if c >> 1 == sel >> 1 {
                    continue;
                }
                let diff = &lit_value(divs, c, care.nb_bits()) ^ target;
                if !diff.intersects(&covered) {
                    best = Some((sel, c));
                    best_score = score;
                    break;
                }
            }
        }
    }
    best
}
