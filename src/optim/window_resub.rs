use kdam::{tqdm, BarExt};

use crate::network::{FanoutIndex, Network, Signal};
use crate::optim::resub::{ResubParams, ResubStats};
use crate::resyn::{ResynEngine, XagResyn};
use crate::sim::TruthTable;
use crate::window::{
    collect_divisors, mffc, reconv_cut, satisfiability_dont_cares, DivisorParams, WindowView,
};

/// Window-based resubstitution
///
/// The alternative driver: instead of partial signatures and SAT checks, each
/// pivot's window is simulated exhaustively over its leaves, giving complete
/// truth tables. A replacement that matches the pivot on every reachable
/// leaf assignment is exact, so candidates commit without validation; with
/// `use_dont_cares`, leaf combinations that cannot occur are masked out of
/// the comparison.
pub fn window_resubstitution(net: &mut Network, ps: &ResubParams) -> ResubStats {
    let mut st = ResubStats {
        initial_size: net.nb_gates(),
        ..ResubStats::default()
    };

    let fanouts = FanoutIndex::attach(net);
    let mut engine = XagResyn {
        use_xor: true,
        max_binates: ps.max_binates,
    };
    let div_ps = DivisorParams {
        max_divisors: ps.max_divisors,
        skip_fanout_limit: ps.skip_fanout_limit_for_divisors,
    };

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

        // Exhaustive simulation of the window; the divisors are included as
        // extra roots so the wings get truth tables as well
        let mut roots: Vec<Signal> = vec![Signal::from_node(n)];
        roots.extend(divs.iter().map(|&d| Signal::from_node(d)));
        let window = WindowView::new(net, leaves.clone(), roots);
        let tts = window.simulate(net);

        let target = tts[&n].clone();
        let nb_bits = target.nb_bits();
        let care = if ps.use_dont_cares {
            !&satisfiability_dont_cares(net, &leaves, ps.window_size)
        } else {
            TruthTable::ones(nb_bits)
        };
        let div_tts: Vec<TruthTable> = divs.iter().map(|&d| tts[&d].clone()).collect();
        let Some(list) = engine.synthesize(&target, &care, &div_tts, budget) else {
            continue;
        };
        st.candidates += 1;

        // Complete window truth tables make the candidate exact; commit
        let div_signals: Vec<Signal> = divs.iter().map(|&d| Signal::from_node(d)).collect();
        let outs = list.insert(net, &div_signals);
        net.substitute(n, outs[0]);
        st.num_resub += 1;
        st.estimated_gain += potential_gain.saturating_sub(list.nb_gates() as usize);
    }

    fanouts.release(net);
    if ps.verbose {
        println!("{st}");
    }
    st
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Gate;
    use crate::sim::Simulator;

    fn output_values(net: &Network, nb_inputs: usize) -> Vec<TruthTable> {
        let patterns = (0..nb_inputs)
            .map(|i| TruthTable::nth_var(nb_inputs, i))
            .collect();
        let sim = Simulator::from_patterns(patterns);
        net.outputs()
            .iter()
            .map(|&o| sim.signal_value(net, o))
            .collect()
    }

    #[test]
    fn test_merges_duplicate() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let g1 = net.and(a, b);
        let g2 = net.add(Gate::And([a, b]));
        net.add_output(g1);
        net.add_output(g2);
        let st = window_resubstitution(&mut net, &ResubParams::default());
        assert_eq!(st.num_resub, 1);
        assert_eq!(net.nb_gates(), 1);
        net.check();
    }

    #[test]
    fn test_preserves_functionality() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let c = net.add_input();
        // Redundant mux-like structure
        let n1 = net.and(a, b);
        let n2 = net.and(!a, b);
        let o1 = net.or(n1, n2);
        let n3 = net.and(o1, c);
        net.add_output(n3);
        let before = output_values(&net, 3);
        let before_gates = net.nb_gates();

        window_resubstitution(&mut net, &ResubParams::default());
        assert!(net.nb_gates() <= before_gates);
        assert_eq!(output_values(&net, 3), before);
        net.check();
    }

    #[test]
    fn test_dont_cares_enable_rewrite() {
        // x and y can never both be 1; under the reachable assignments
        // w = x & !y collapses onto x
        let build = || {
            let mut net = Network::new();
            let a = net.add_input();
            let b = net.add_input();
            let x = net.and(a, !b);
            let y = net.and(!a, b);
            let w = net.and(x, !y);
            net.add_output(w);
            net
        };

        // A two-leaf cut stops at x and y; without don't-cares the window is
        // exact and nothing can be removed
        let ps = ResubParams {
            max_pis: 2,
            ..ResubParams::default()
        };
        let mut net = build();
        let st = window_resubstitution(&mut net, &ps);
        assert_eq!(st.num_resub, 0);
        assert_eq!(net.nb_gates(), 3);

        let ps_dc = ResubParams {
            max_pis: 2,
            use_dont_cares: true,
            ..ResubParams::default()
        };
        let mut net = build();
        let before = output_values(&net, 2);
        let st = window_resubstitution(&mut net, &ps_dc);
        assert_eq!(st.num_resub, 1);
        // w collapses onto x, and y dangles away with it
        assert_eq!(net.nb_gates(), 1);
        assert_eq!(output_values(&net, 2), before);
        net.check();
    }
}
