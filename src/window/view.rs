use fxhash::FxHashMap;

use crate::network::{Gate, Network, Signal};
use crate::sim::TruthTable;
use crate::window::divisors::collect_supported;

/// Sub-network between a set of leaves and a set of roots
///
/// The leaves play the role of primary inputs and the roots of primary
/// outputs; the gates in between are kept in topological order. The view
/// borrows nothing: it is a snapshot of node indices, to be interpreted
/// against the network it was built from.
#[derive(Debug, Clone)]
pub struct WindowView {
    /// Window inputs
    pub leaves: Vec<u32>,
    /// Gates between leaves and roots, in topological order
    pub nodes: Vec<u32>,
    /// Window outputs
    pub roots: Vec<Signal>,
}

impl WindowView {
    /// Build the window enclosed by leaves and roots
    pub fn new(net: &Network, leaves: Vec<u32>, roots: Vec<Signal>) -> WindowView {
        let mut nodes = Vec::new();
        let mut seen = vec![false; net.nb_nodes()];
        for &l in &leaves {
            seen[l as usize] = true;
        }
        for r in &roots {
            for n in collect_supported(net, &leaves, r.node()) {
                if !seen[n as usize] {
                    seen[n as usize] = true;
                    nodes.push(n);
                }
            }
        }
        WindowView {
            leaves,
            nodes,
            roots,
        }
    }

    /// Simulate the window exhaustively over its leaves
    ///
    /// Every node gets a complete truth table of 2^k bits, where k is the
    /// number of leaves; leaf i is assigned the i-th projection.
    pub fn simulate(&self, net: &Network) -> FxHashMap<u32, TruthTable> {
        let k = self.leaves.len();
        let nb_bits = 1usize << k;
        let mut tts: FxHashMap<u32, TruthTable> = FxHashMap::default();
        tts.insert(0, TruthTable::zeros(nb_bits));
        for (i, &l) in self.leaves.iter().enumerate() {
            tts.insert(l, TruthTable::nth_var(k, i));
        }
        let value = |tts: &FxHashMap<u32, TruthTable>, s: &Signal| -> TruthTable {
            let t = &tts[&s.node()];
            if s.is_complement() {
                !t
            } else {
                t.clone()
            }
        };
        for &n in &self.nodes {
            let t = match net.gate(n) {
                Gate::And([a, b]) => &value(&tts, a) & &value(&tts, b),
                Gate::Xor([a, b]) => &value(&tts, a) ^ &value(&tts, b),
                _ => unreachable!("window nodes are gates"),
            };
            tts.insert(n, t);
        }
        tts
    }
}
