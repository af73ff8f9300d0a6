use std::fmt;
use std::path::PathBuf;

use kdam::{tqdm, BarExt};

use crate::io::{read_pattern_file, write_pattern_file};
use crate::network::{FanoutIndex, LevelTracker, Network, Signal};
use crate::resyn::{ResynEngine, XagResyn};
use crate::sim::{Simulator, TruthTable};
use crate::validator::{Outcome, Validator, ValidatorParams};
use crate::window::{
    collect_divisors, mffc, observability_dont_cares, reconv_cut, DivisorParams,
};

/// Parameters shared by the resubstitution drivers
#[derive(Debug, Clone)]
pub struct ResubParams {
    /// Maximum number of leaves of a window cut
    pub max_pis: usize,
    /// Maximum number of divisors per window
    pub max_divisors: usize,
    /// Maximum number of gates added by one substitution
    pub max_inserts: usize,
    /// Maximum resynthesize-validate attempts per node
    pub max_trials: usize,
    /// Skip pivots with more fanouts than this
    pub skip_fanout_limit_for_roots: usize,
    /// Skip divisors with more fanouts than this
    pub skip_fanout_limit_for_divisors: usize,
    /// Observability don't-care levels: 0 disables, -1 means up to the
    /// outputs
    pub odc_levels: i32,
    /// Conflict budget per SAT call
    pub conflict_limit: u32,
    /// Use satisfiability don't-cares on window leaves (window-based driver)
    pub use_dont_cares: bool,
    /// Maximum TFI support when computing window don't-cares
    pub window_size: usize,
    /// Cap on binate divisors paired by the resynthesis engine
    pub max_binates: usize,
    /// Number of seed simulation patterns
    pub nb_seed_patterns: usize,
    /// Seed for pattern generation
    pub random_seed: u64,
    /// Update node levels lazily instead of recomputing after each change
    pub update_levels_lazily: bool,
    /// Show a progress bar
    pub progress: bool,
    /// Print statistics at the end
    pub verbose: bool,
    /// Write the final pattern pool to this file
    pub save_patterns: Option<PathBuf>,
    /// Load the initial pattern pool from this file instead of generating it
    pub pattern_filename: Option<PathBuf>,
}

impl Default for ResubParams {
    fn default() -> ResubParams {
        ResubParams {
            max_pis: 8,
            max_divisors: 150,
            max_inserts: 2,
            max_trials: 100,
            skip_fanout_limit_for_roots: 1000,
            skip_fanout_limit_for_divisors: 100,
            odc_levels: 0,
            conflict_limit: 1000,
            use_dont_cares: false,
            window_size: 12,
            max_binates: 50,
            nb_seed_patterns: 1024,
            random_seed: 0,
            update_levels_lazily: true,
            progress: false,
            verbose: false,
            save_patterns: None,
            pattern_filename: None,
        }
    }
}

/// Statistics of a resubstitution run
#[derive(Debug, Clone, Default)]
pub struct ResubStats {
    /// Gate count before the run
    pub initial_size: usize,
    /// Number of patterns in the pool at the end
    pub num_pats: usize,
    /// Counter-examples found by the validator
    pub num_cex: usize,
    /// Successful substitutions
    pub num_resub: usize,
    /// Validations that hit the conflict limit
    pub num_timeout: usize,
    /// Candidates produced by the resynthesis engine
    pub candidates: usize,
    /// Estimated gate-count gain
    pub estimated_gain: usize,
}

impl fmt::Display for ResubStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "initial size = {}", self.initial_size)?;
        writeln!(f, "#pat     = {}", self.num_pats)?;
        writeln!(f, "#resub   = {}", self.num_resub)?;
        writeln!(f, "#cand    = {}", self.candidates)?;
        writeln!(f, "#CEX     = {}", self.num_cex)?;
        writeln!(f, "#timeout = {}", self.num_timeout)?;
        write!(f, "est. gain = {}", self.estimated_gain)
    }
}

/// Simulation-guided resubstitution
///
/// Walks the gates in topological order; for each pivot, a window of
/// divisors is collected and simulated against the pattern pool, the
/// resynthesis engine proposes a replacement, and the SAT validator either
/// proves it or returns a counter-example that grows the pool. Proven
/// replacements are substituted into the network.
pub fn sim_resubstitution(net: &mut Network, ps: &ResubParams) -> ResubStats {
    let mut st = ResubStats {
        initial_size: net.nb_gates(),
        ..ResubStats::default()
    };

    // Pattern pool: from file if given and well-formed, else generated
    let loaded = ps
        .pattern_filename
        .as_ref()
        .and_then(|p| read_pattern_file(p).ok())
        .filter(|pats| pats.len() == net.nb_inputs());
    let mut sim = match loaded {
        Some(pats) => Simulator::from_patterns(pats),
        None => Simulator::new_random(net.nb_inputs(), ps.nb_seed_patterns, ps.random_seed),
    };
    sim.attach(net);
    sim.resimulate_all(net);

    let fanouts = FanoutIndex::attach(net);
    let levels = LevelTracker::attach(net);
    let validator = Validator::new(ValidatorParams {
        conflict_limit: ps.conflict_limit,
        odc_levels: ps.odc_levels,
    });
    let mut engine = XagResyn {
        use_xor: true,
        max_binates: ps.max_binates,
    };
    let div_ps = DivisorParams {
        max_divisors: ps.max_divisors,
        skip_fanout_limit: ps.skip_fanout_limit_for_divisors,
    };

    // Snapshot of the gates to visit; nodes born during the loop are ignored
    let order = net.topo_order();
    let mut pbar = ps.progress.then(|| tqdm!(total = order.len()));
    for n in order {
        if let Some(p) = pbar.as_mut() {
            let _ = p.update(1);
        }
        if !net.is_gate(n) || net.is_dont_touch(n) {
            continue;
        }
        if net.fanout_count(n) as usize > ps.skip_fanout_limit_for_roots {
            continue;
        }

        let leaves = reconv_cut(net, &[n], ps.max_pis);
        // A pivot that could not even expand once is its own leaf; skip it
        if leaves.len() < 2 || leaves.len() > ps.max_pis {
            continue;
        }
        let cone = mffc(net, n, &leaves);
        let potential_gain = cone.len();
        let Some(divs) = collect_divisors(net, &fanouts, n, &leaves, &cone, &div_ps) else {
            continue;
        };
        let budget = (potential_gain - 1).min(ps.max_inserts);

        for _ in 0..ps.max_trials {
            let target = sim.value(net, n);
            let div_tts: Vec<TruthTable> = divs.iter().map(|&d| sim.value(net, d)).collect();
            let care = if ps.odc_levels == 0 {
                TruthTable::ones(sim.nb_patterns())
            } else {
                !&observability_dont_cares(net, n, &sim, &fanouts, ps.odc_levels)
            };
            let Some(list) = engine.synthesize(&target, &care, &div_tts, budget) else {
                break;
            };
            st.candidates += 1;

            match validator.validate_list(net, n, &divs, &list) {
                Outcome::Unsat => {
                    let div_signals: Vec<Signal> =
                        divs.iter().map(|&d| Signal::from_node(d)).collect();
                    let outs = list.insert(net, &div_signals);
                    net.substitute(n, outs[0]);
                    if !ps.update_levels_lazily {
                        levels.recompute(net);
                    }
                    st.num_resub += 1;
                    st.estimated_gain +=
                        potential_gain.saturating_sub(list.nb_gates() as usize);
                    break;
                }
                Outcome::Sat(cex) => {
                    st.num_cex += 1;
                    sim.add_pattern(&cex);
                    // Amortized: a full re-simulation when a block fills up
                    if sim.nb_patterns() % 64 == 0 {
                        sim.resimulate_all(net);
                    }
                }
                Outcome::Timeout => {
                    st.num_timeout += 1;
                    break;
                }
            }
        }
    }

    st.num_pats = sim.nb_patterns();
    if let Some(path) = &ps.save_patterns {
        write_pattern_file(path, &sim.patterns()).ok();
    }
    sim.release(net);
    fanouts.release(net);
    levels.release(net);
    if ps.verbose {
        println!("{st}");
    }
    st
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Gate;

    #[test]
    fn test_zero_resub_merges_duplicate() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let g1 = net.and(a, b);
        let g2 = net.add(Gate::And([a, b]));
        net.add_output(g1);
        net.add_output(g2);

        let st = sim_resubstitution(&mut net, &ResubParams::default());
        assert_eq!(st.num_resub, 1);
        assert_eq!(net.nb_gates(), 1);
        assert_eq!(net.output(0).node(), net.output(1).node());
        net.check();
    }

    #[test]
    fn test_constant_collapse() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        // z = (a & b) & (a & !b) is identically false
        let x = net.and(a, b);
        let y = net.and(a, !b);
        let z = net.and(x, y);
        net.add_output(z);

        let st = sim_resubstitution(&mut net, &ResubParams::default());
        assert!(st.num_resub >= 1);
        assert_eq!(net.output(0), Signal::zero());
        assert_eq!(net.nb_gates(), 0);
        net.check();
    }

    fn full_adder(net: &mut Network) {
        let a = net.add_input();
        let b = net.add_input();
        let cin = net.add_input();
        // Plain And/Or construction of sum and carry
        let axb = {
            let n1 = net.and(a, !b);
            let n2 = net.and(!a, b);
            net.or(n1, n2)
        };
        let sum = {
            let n1 = net.and(axb, !cin);
            let n2 = net.and(!axb, cin);
            net.or(n1, n2)
        };
        let carry = {
            let ab = net.and(a, b);
            let axbc = net.and(axb, cin);
            net.or(ab, axbc)
        };
        net.add_output(sum);
        net.add_output(carry);
    }

    fn output_values(net: &Network) -> Vec<TruthTable> {
        let patterns = (0..3).map(|i| TruthTable::nth_var(3, i)).collect();
        let sim = Simulator::from_patterns(patterns);
        net.outputs()
            .iter()
            .map(|&o| sim.signal_value(net, o))
            .collect()
    }

    #[test]
    fn test_full_adder_preserved() {
        let mut net = Network::new();
        full_adder(&mut net);
        let before_values = output_values(&net);
        let before_gates = net.nb_gates();

        let st = sim_resubstitution(&mut net, &ResubParams::default());
        assert!(net.nb_gates() <= before_gates);
        assert_eq!(output_values(&net), before_values);
        assert!(st.num_resub > 0 || net.nb_gates() == before_gates);
        net.check();

        // All eight assignments match the textbook adder
        for p in 0..8usize {
            let (va, vb, vc) = (p & 1 != 0, p & 2 != 0, p & 4 != 0);
            let sum = before_values[0].bit(p);
            let carry = before_values[1].bit(p);
            assert_eq!(sum, va ^ vb ^ vc);
            assert_eq!(carry, (va & vb) | (vc & (va ^ vb)));
        }
    }

    #[test]
    fn test_idempotent() {
        let mut net = Network::new();
        full_adder(&mut net);
        sim_resubstitution(&mut net, &ResubParams::default());
        let gates_after_first = net.nb_gates();
        sim_resubstitution(&mut net, &ResubParams::default());
        assert_eq!(net.nb_gates(), gates_after_first);
        net.check();
    }

    #[test]
    fn test_max_pis_zero_makes_no_substitution() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let g1 = net.and(a, b);
        let g2 = net.add(Gate::And([a, b]));
        net.add_output(g1);
        net.add_output(g2);
        let ps = ResubParams {
            max_pis: 0,
            ..ResubParams::default()
        };
        let st = sim_resubstitution(&mut net, &ps);
        assert_eq!(st.num_resub, 0);
        assert_eq!(net.nb_gates(), 2);
    }

    #[test]
    fn test_dont_touch_is_preserved() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let g1 = net.and(a, b);
        let g2 = net.add(Gate::And([a, b]));
        net.set_dont_touch(g2.node(), true);
        net.add_output(g1);
        net.add_output(g2);

        let st = sim_resubstitution(&mut net, &ResubParams::default());
        // The protected duplicate is neither a pivot nor a divisor
        assert_eq!(st.num_resub, 0);
        assert_eq!(net.nb_gates(), 2);
        assert!(!net.is_dead(g2.node()));
        net.check();
    }

    #[test]
    fn test_pattern_persistence() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let x = net.and(a, b);
        net.add_output(x);

        let path = std::env::temp_dir().join("simresub_driver_patterns.txt");
        let ps = ResubParams {
            save_patterns: Some(path.clone()),
            ..ResubParams::default()
        };
        let st1 = sim_resubstitution(&mut net, &ps);

        let mut net2 = Network::new();
        let a2 = net2.add_input();
        let b2 = net2.add_input();
        let x2 = net2.and(a2, b2);
        net2.add_output(x2);
        let ps2 = ResubParams {
            pattern_filename: Some(path.clone()),
            ..ResubParams::default()
        };
        let st2 = sim_resubstitution(&mut net2, &ps2);
        assert_eq!(st2.num_pats, st1.num_pats);
        std::fs::remove_file(&path).ok();
    }
}
