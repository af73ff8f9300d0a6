use crate::network::{FanoutIndex, Marks, Network};

/// Caps applied while collecting divisors
#[derive(Debug, Clone, Copy)]
pub struct DivisorParams {
    /// Maximum number of divisors in a window
    pub max_divisors: usize,
    /// Do not expand side fanouts from a node with more fanouts than this
    pub skip_fanout_limit: usize,
}

/// Collect the nodes supported by a cut, in topological order
///
/// Walking fanins from the pivot, every gate whose fanins are all inside the
/// cut leaves or already collected is gathered; the walk stops at leaves.
/// The pivot comes last; leaves are not part of the result.
pub fn collect_supported(net: &Network, leaves: &[u32], pivot: u32) -> Vec<u32> {
    let mut marks = Marks::new(net.nb_nodes());
    marks.reset();
    for &l in leaves {
        marks.mark(l);
    }
    let mut nodes = Vec::new();
    let mut stack = vec![(pivot, false)];
    while let Some((n, expanded)) = stack.pop() {
        if marks.is_marked(n) {
            continue;
        }
        if expanded {
            marks.mark(n);
            nodes.push(n);
        } else if net.is_gate(n) {
            stack.push((n, true));
            for s in net.gate(n).fanins() {
                if !s.is_constant() && !marks.is_marked(s.node()) {
                    stack.push((s.node(), false));
                }
            }
        }
    }
    nodes
}

/// Compute the maximum fanout-free cone of a pivot under a cut
///
/// These are the nodes that would become dangling if the pivot were removed:
/// the dereference is simulated on a scratch copy of the fanout counts, with
/// the leaves pinned so they always stay referenced. The pivot itself comes
/// first; the cone size is the potential gain of the window.
pub fn mffc(net: &Network, pivot: u32, leaves: &[u32]) -> Vec<u32> {
    let mut counts: Vec<u32> = (0..net.nb_nodes() as u32)
        .map(|n| net.fanout_count(n))
        .collect();
    for &l in leaves {
        counts[l as usize] += 1;
    }
    let mut cone = vec![pivot];
    let mut stack = vec![pivot];
    while let Some(n) = stack.pop() {
        for s in net.gate(n).fanins() {
            let c = s.node();
            if !net.is_gate(c) || net.is_dont_touch(c) {
                continue;
            }
            counts[c as usize] -= 1;
            if counts[c as usize] == 0 {
                cone.push(c);
                stack.push(c);
            }
        }
    }
    cone
}

/// Collect the divisors of a window
///
/// Divisors are the cut leaves plus the supported nodes outside the pivot's
/// MFFC, extended by side fanouts: a fanout of an admitted node is admitted
/// in turn if all its fanins are admitted and it does not lie in the
/// transitive fanout of the pivot. Bulky hubs (more fanouts than
/// `skip_fanout_limit`) are never expanded from. Returns `None` when the
/// window exceeds `max_divisors` before extension.
pub fn collect_divisors(
    net: &Network,
    fanouts: &FanoutIndex,
    pivot: u32,
    leaves: &[u32],
    mffc: &[u32],
    ps: &DivisorParams,
) -> Option<Vec<u32>> {
    // Mark the transitive fanout of the pivot; nothing in it can be a divisor
    let mut tfo = Marks::new(net.nb_nodes());
    tfo.reset();
    let mut stack = vec![pivot];
    tfo.mark(pivot);
    while let Some(n) = stack.pop() {
        for p in fanouts.fanouts(n) {
            if !tfo.is_marked(p) {
                tfo.mark(p);
                stack.push(p);
            }
        }
    }
    let mut excluded = Marks::new(net.nb_nodes());
    excluded.reset();
    for &m in mffc {
        excluded.mark(m);
    }

    let mut admitted = Marks::new(net.nb_nodes());
    admitted.reset();
    let mut divs = Vec::new();
    for &l in leaves {
        admitted.mark(l);
        divs.push(l);
    }
    for n in collect_supported(net, leaves, pivot) {
        if !excluded.is_marked(n) {
            admitted.mark(n);
            divs.push(n);
        }
    }
    if divs.len() > ps.max_divisors {
        return None;
    }

    // Wings: admit side fanouts whose support is already admitted, without
    // expanding from bulky hubs
    let mut i = 0;
    while i < divs.len() && divs.len() < ps.max_divisors {
        if net.fanout_count(divs[i]) as usize > ps.skip_fanout_limit {
            i += 1;
            continue;
        }
        for p in fanouts.fanouts(divs[i]) {
            if divs.len() >= ps.max_divisors {
                break;
            }
            if admitted.is_marked(p)
                || tfo.is_marked(p)
                || excluded.is_marked(p)
                || net.is_dont_touch(p)
            {
                continue;
            }
            let supported = net
                .gate(p)
                .fanins()
                .iter()
                .all(|s| s.is_constant() || admitted.is_marked(s.node()));
            if supported {
                admitted.mark(p);
                divs.push(p);
            }
        }
        i += 1;
    }
    Some(divs)
}
