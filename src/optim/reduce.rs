use std::fmt;

use fxhash::FxHashMap;

use crate::network::{Network, Signal};
use crate::sim::{Simulator, TruthTable};
use crate::validator::{Outcome, Validator, ValidatorParams};

/// Parameters for functional reduction
#[derive(Debug, Clone)]
pub struct ReduceParams {
    /// Conflict budget per SAT call; kept small, reduction is a fast pass
    pub conflict_limit: u32,
    /// Number of seed simulation patterns
    pub nb_seed_patterns: usize,
    /// Seed for pattern generation
    pub random_seed: u64,
    /// Print statistics at the end
    pub verbose: bool,
}

impl Default for ReduceParams {
    fn default() -> ReduceParams {
        ReduceParams {
            conflict_limit: 100,
            nb_seed_patterns: 256,
            random_seed: 1,
            verbose: false,
        }
    }
}

/// Statistics of a functional reduction run
#[derive(Debug, Clone, Default)]
pub struct ReduceStats {
    /// Nodes merged into an equivalent one or a constant
    pub merged: usize,
    /// Merge proposals refuted by a counter-example
    pub mistakes: usize,
    /// Validations that hit the conflict limit
    pub timeouts: usize,
    /// Number of patterns in the pool at the end
    pub num_pats: usize,
}

impl fmt::Display for ReduceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "merged    = {}", self.merged)?;
        writeln!(f, "mistakes  = {}", self.mistakes)?;
        writeln!(f, "time-outs = {}", self.timeouts)?;
        write!(f, "#pat      = {}", self.num_pats)
    }
}

/// Merge functionally equivalent nodes
///
/// A fast simulation/SAT hybrid: nodes are hashed by their simulation
/// signature in topological order; a signature hit (same table, complement,
/// or constant) becomes a merge proposal checked by the validator. Refuting
/// counter-examples grow the pattern pool and the signature map is rebuilt,
/// so spurious collisions die out as the pool grows.
pub fn func_reduction(net: &mut Network, ps: &ReduceParams) -> ReduceStats {
    let mut st = ReduceStats::default();
    let mut sim = Simulator::new_random(net.nb_inputs(), ps.nb_seed_patterns, ps.random_seed);
    sim.attach(net);
    sim.resimulate_all(net);
    let validator = Validator::new(ValidatorParams {
        conflict_limit: ps.conflict_limit,
        odc_levels: 0,
    });

    let mut map: FxHashMap<TruthTable, u32> = FxHashMap::default();
    let mut history: Vec<u32> = Vec::new();

    let order = net.topo_order();
    for n in order {
        if !net.is_gate(n) || net.is_dont_touch(n) {
            continue;
        }
        loop {
            let tt = sim.value(net, n);
            let cand = propose(net, &map, n, &tt);
            let Some(cand) = cand else {
                map.insert(tt, n);
                history.push(n);
                break;
            };
            match validator.validate_signal(net, n, cand) {
                Outcome::Unsat => {
                    net.substitute(n, cand);
                    st.merged += 1;
                    break;
                }
                Outcome::Sat(cex) => {
                    st.mistakes += 1;
                    sim.add_pattern(&cex);
                    // Rebuild the signature map against the grown pool
                    map.clear();
                    for &d in &history {
                        if !net.is_dead(d) {
                            map.insert(sim.value(net, d), d);
                        }
                    }
                }
                Outcome::Timeout => {
                    st.timeouts += 1;
                    map.insert(tt, n);
                    history.push(n);
                    break;
                }
            }
        }
    }

    st.num_pats = sim.nb_patterns();
    sim.release(net);
    if ps.verbose {
        println!("{st}");
    }
    st
}

/// Pick a merge candidate for a node from its signature
fn propose(
    net: &Network,
    map: &FxHashMap<TruthTable, u32>,
    n: u32,
    tt: &TruthTable,
) -> Option<Signal> {
    if tt.is_zero() {
        return Some(net.constant(false));
    }
    if tt.count_zeros() == 0 {
        return Some(net.constant(true));
    }
    if let Some(&m) = map.get(tt) {
        if m != n && !net.is_dead(m) {
            return Some(Signal::from_node(m));
        }
    }
    if let Some(&m) = map.get(&!tt) {
        if m != n && !net.is_dead(m) {
            return Some(!Signal::from_node(m));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Gate;

    #[test]
    fn test_merges_duplicates_and_complements() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let g1 = net.and(a, b);
        let g2 = net.add(Gate::And([a, b]));
        // A complement of g1 through De Morgan, structurally different
        let g3 = {
            let n1 = net.and(a, !b);
            let n2 = net.and(!a, b);
            let n3 = net.and(!a, !b);
            let o1 = net.or(n1, n2);
            net.or(o1, n3)
        };
        net.add_output(g1);
        net.add_output(g2);
        net.add_output(g3);

        let st = func_reduction(&mut net, &ReduceParams::default());
        assert!(st.merged >= 1);
        // g2 merges into g1; g3 is !g1 and collapses entirely
        assert_eq!(net.output(0).node(), net.output(1).node());
        assert_eq!(net.output(2), !net.output(0));
        net.check();
    }

    #[test]
    fn test_constant_outputs_collapse() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        // Both outputs are identically false
        let x = net.and(a, b);
        let y = net.and(a, !b);
        let z = net.and(x, y);
        let w = {
            let n = net.and(!a, b);
            net.and(n, x)
        };
        net.add_output(z);
        net.add_output(w);

        let st = func_reduction(&mut net, &ReduceParams::default());
        assert!(st.merged >= 2);
        assert_eq!(net.output(0), Signal::zero());
        assert_eq!(net.output(1), Signal::zero());
        assert_eq!(net.nb_gates(), 0);
        net.check();
    }

    #[test]
    fn test_counter_example_loop() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let g1 = net.and(a, b);
        let g2 = net.and(a, !b);
        net.add_output(g1);
        net.add_output(g2);

        // A single all-zero seed pattern: both gates simulate to 0, the
        // proposed merge is refuted, and the pool grows
        let mut sim = Simulator::from_patterns(vec![TruthTable::zeros(1), TruthTable::zeros(1)]);
        sim.attach(&mut net);
        sim.resimulate_all(&net);
        let validator = Validator::default();

        let t1 = sim.value(&net, g1.node());
        let t2 = sim.value(&net, g2.node());
        assert_eq!(t1, t2);
        match validator.validate_signal(&net, g2.node(), g1) {
            Outcome::Sat(cex) => sim.add_pattern(&cex),
            other => panic!("expected refutation, got {other:?}"),
        }
        // After the counter-example the signatures differ
        let t1 = sim.value(&net, g1.node());
        let t2 = sim.value(&net, g2.node());
        assert_ne!(t1, t2);
        sim.release(&mut net);
    }

    #[test]
    fn test_idempotent() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let c = net.add_input();
        let g1 = net.and(a, b);
        let g2 = net.add(Gate::And([a, b]));
        let g3 = net.and(g1, c);
        let g4 = net.and(g2, c);
        net.add_output(g3);
        net.add_output(g4);

        let st1 = func_reduction(&mut net, &ReduceParams::default());
        assert!(st1.merged >= 1);
        let gates = net.nb_gates();
        let st2 = func_reduction(&mut net, &ReduceParams::default());
        assert_eq!(st2.merged, 0);
        assert_eq!(net.nb_gates(), gates);
        net.check();
    }
}
