use fxhash::FxHashMap;

use crate::network::{FanoutIndex, Gate, Marks, Network, Signal};
use crate::sim::{Simulator, TruthTable};
use crate::window::cut::reconv_cut;
use crate::window::view::WindowView;

/// Compute satisfiability don't-cares of a set of window leaves
///
/// Returns a mask over the 2^k leaf-value combinations; a set bit marks a
/// combination that cannot occur given the logic upstream of the leaves.
/// The leaves are extended upstream into a cut of at most `max_tfi` inputs
/// and the extended window is simulated exhaustively; combinations never
/// reached are don't-cares. The result is an under-approximation: when the
/// upstream support is too large, the all-zero mask is returned.
pub fn satisfiability_dont_cares(net: &Network, leaves: &[u32], max_tfi: usize) -> TruthTable {
    let k = leaves.len();
    let nb_bits = 1usize << k;
    let extended = reconv_cut(net, leaves, max_tfi);
    if extended.len() > max_tfi || extended == leaves {
        return TruthTable::zeros(nb_bits);
    }

    let roots: Vec<Signal> = leaves.iter().map(|&l| Signal::from_node(l)).collect();
    let window = WindowView::new(net, extended, roots);
    let tts = window.simulate(net);

    let mut care = TruthTable::zeros(nb_bits);
    let nb_points = 1usize << window.leaves.len();
    for p in 0..nb_points {
        let mut entry = 0usize;
        for (j, &l) in leaves.iter().enumerate() {
            if tts[&l].bit(p) {
                entry |= 1 << j;
            }
        }
        care.set_bit(entry, true);
    }
    !&care
}

/// Compute the observability don't-care patterns of a node
///
/// A pattern is unobservable with respect to `pivot` if flipping the pivot's
/// value does not change any node on the frontier of its transitive fanout
/// cone, bounded at `levels` levels (-1 means up to the outputs), nor any
/// output fed from inside the cone. Returns a mask over the simulator's
/// pattern pool; a set bit marks an unobservable pattern.
pub fn observability_dont_cares(
    net: &Network,
    pivot: u32,
    sim: &Simulator,
    fanouts: &FanoutIndex,
    levels: i32,
) -> TruthTable {
    let nb_bits = sim.nb_patterns();

    // Gather the bounded TFO cone with a breadth-first walk
    let mut cone = Vec::new();
    let mut in_cone = Marks::new(net.nb_nodes());
    in_cone.reset();
    in_cone.mark(pivot);
    let mut frontier = vec![pivot];
    let mut depth = 0;
    while !frontier.is_empty() && (levels < 0 || depth < levels) {
        let mut next = Vec::new();
        for &m in &frontier {
            for p in fanouts.fanouts(m) {
                if !in_cone.is_marked(p) {
                    in_cone.mark(p);
                    cone.push(p);
                    next.push(p);
                }
            }
        }
        frontier = next;
        depth += 1;
    }

    // Simulate the cone with the pivot inverted
    let mut flipped: FxHashMap<u32, TruthTable> = FxHashMap::default();
    flipped.insert(pivot, !&sim.value(net, pivot));
    let positions: FxHashMap<u32, usize> = net
        .topo_order()
        .into_iter()
        .enumerate()
        .map(|(i, n)| (n, i))
        .collect();
    cone.sort_by_key(|n| positions[n]);
    for &m in &cone {
        let value = |s: &Signal| -> TruthTable {
            let t = match flipped.get(&s.node()) {
                Some(t) => t.clone(),
                None => sim.value(net, s.node()),
            };
            if s.is_complement() {
                !&t
            } else {
                t
            }
        };
        let t = match net.gate(m) {
            Gate::And([a, b]) => &value(a) & &value(b),
            Gate::Xor([a, b]) => &value(a) ^ &value(b),
            _ => unreachable!(),
        };
        flipped.insert(m, t);
    }

    // A difference is observable on the cone frontier or on an output
    let mut po_nodes = Marks::new(net.nb_nodes());
    po_nodes.reset();
    for o in net.outputs() {
        po_nodes.mark(o.node());
    }
    let mut care = TruthTable::zeros(nb_bits);
    for (&m, t) in flipped.iter() {
        let boundary = po_nodes.is_marked(m)
            || fanouts.fanouts(m).iter().any(|&p| !in_cone.is_marked(p));
        if boundary {
            care |= &(t ^ &sim.value(net, m));
        }
    }
    !&care
}
