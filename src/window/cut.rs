use crate::network::{Marks, Network};

/// Compute a reconvergence-driven cut
///
/// The cut grows from the pivots toward the inputs: at each step the
/// cheapest non-terminal member is replaced by its fanins, where the cost of
/// a member is the number of new nodes its expansion would add. Ties go to
/// the lowest index. Growth stops when every member is a terminal or the
/// next expansion would push the cut past `max_leaves`.
///
/// Inputs, don't-touch nodes and box outputs are terminals; the constant is
/// never part of a cut.
pub fn reconv_cut(net: &Network, pivots: &[u32], max_leaves: usize) -> Vec<u32> {
    let mut marks = Marks::new(net.nb_nodes());
    marks.reset();
    let mut cut = Vec::new();
    for &p in pivots {
        if !net.is_constant(p) && !marks.is_marked(p) {
            marks.mark(p);
            cut.push(p);
        }
    }

    let cost = |marks: &Marks, n: u32| -> i32 {
        let mut c = -1;
        for s in net.gate(n).fanins() {
            if !s.is_constant() && !marks.is_marked(s.node()) {
                c += 1;
            }
        }
        c
    };

    loop {
        cut.sort_by_key(|&n| (cost(&marks, n), n));
        let Some(pos) = cut
            .iter()
            .position(|&n| net.is_gate(n) && !net.is_dont_touch(n))
        else {
            // All members are terminals
            return cut;
        };
        let c = cost(&marks, cut[pos]);
        if cut.len() as i32 + c > max_leaves as i32 {
            return cut;
        }
        let n = cut.remove(pos);
        for s in net.gate(n).fanins() {
            if !s.is_constant() && !marks.is_marked(s.node()) {
                marks.mark(s.node());
                cut.push(s.node());
            }
        }
    }
}
