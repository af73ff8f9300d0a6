use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::network::{Gate, Network, Signal};
use crate::sim::table::TruthTable;

struct SimState {
    /// One pattern table per primary input position
    patterns: Vec<TruthTable>,
    /// Simulation signature of each node; stale tables have fewer bits than
    /// the pattern pool
    tts: Vec<TruthTable>,
    nb_bits: usize,
}

impl SimState {
    fn fresh(&self, n: u32) -> bool {
        (n as usize) < self.tts.len() && self.tts[n as usize].nb_bits() == self.nb_bits
    }

    fn ensure_len(&mut self, nb_nodes: usize) {
        if self.tts.len() < nb_nodes {
            self.tts.resize(nb_nodes, TruthTable::default());
        }
    }

    fn signal_value(&self, s: Signal) -> TruthTable {
        let t = &self.tts[s.node() as usize];
        if s.is_complement() {
            !t
        } else {
            t.clone()
        }
    }

    /// Recompute a node from its children, if their tables are current
    fn try_compute(&mut self, n: u32, gate: &Gate) {
        self.ensure_len(n as usize + 1);
        let value = match gate {
            Gate::Const => TruthTable::zeros(self.nb_bits),
            Gate::Input(pos) => self.patterns[*pos as usize].clone(),
            Gate::And([a, b]) => {
                if !self.fresh(a.node()) || !self.fresh(b.node()) {
                    return;
                }
                &self.signal_value(*a) & &self.signal_value(*b)
            }
            Gate::Xor([a, b]) => {
                if !self.fresh(a.node()) || !self.fresh(b.node()) {
                    return;
                }
                &self.signal_value(*a) ^ &self.signal_value(*b)
            }
        };
        self.tts[n as usize] = value;
    }
}

/// Pattern-pool simulator maintaining a partial truth table per node
///
/// The pool starts from seed patterns and grows as counter-examples are
/// added. Node signatures are refreshed lazily: a table whose length differs
/// from the pool is stale and is recomputed on access by walking fanins.
/// The state sits behind an `Rc` so the event handlers registered on the
/// network share it with the owner.
pub struct Simulator {
    state: Rc<RefCell<SimState>>,
    handler_ids: Vec<usize>,
}

impl Simulator {
    /// Create a simulator with a random pattern pool
    ///
    /// The all-zero and all-one assignments are pinned as the first two
    /// patterns so that constant nodes are distinguished early.
    pub fn new_random(nb_inputs: usize, nb_patterns: usize, seed: u64) -> Simulator {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut patterns = Vec::with_capacity(nb_inputs);
        for _ in 0..nb_inputs {
            let mut t = TruthTable::random(nb_patterns, &mut rng);
            if nb_patterns >= 2 {
                t.set_bit(0, false);
                t.set_bit(1, true);
            }
            patterns.push(t);
        }
        Simulator::from_patterns(patterns)
    }

    /// Create a simulator from an existing pattern pool, one table per input
    pub fn from_patterns(patterns: Vec<TruthTable>) -> Simulator {
        let nb_bits = patterns.first().map(|t| t.nb_bits()).unwrap_or(0);
        assert!(patterns.iter().all(|t| t.nb_bits() == nb_bits));
        Simulator {
            state: Rc::new(RefCell::new(SimState {
                patterns,
                tts: Vec::new(),
                nb_bits,
            })),
            handler_ids: Vec::new(),
        }
    }

    /// Subscribe to the network's events so new and repointed gates are
    /// simulated on the fly and deleted ones dropped
    pub fn attach(&mut self, net: &mut Network) {
        let st = self.state.clone();
        self.handler_ids.push(net.events().register_add(Box::new(move |n, gate| {
            st.borrow_mut().try_compute(n, gate);
        })));
        let st = self.state.clone();
        self.handler_ids
            .push(net.events().register_modified(Box::new(move |n, new_gate, _| {
                let mut state = st.borrow_mut();
                state.ensure_len(n as usize + 1);
                state.tts[n as usize] = TruthTable::default();
                state.try_compute(n, new_gate);
            })));
        let st = self.state.clone();
        self.handler_ids.push(net.events().register_delete(Box::new(move |n, _| {
            let mut state = st.borrow_mut();
            if (n as usize) < state.tts.len() {
                state.tts[n as usize] = TruthTable::default();
            }
        })));
    }

    /// Unsubscribe from the network's events
    pub fn release(&mut self, net: &mut Network) {
        for id in self.handler_ids.drain(..) {
            net.events().release(id);
        }
    }

    /// Return the number of patterns in the pool
    pub fn nb_patterns(&self) -> usize {
        self.state.borrow().nb_bits
    }

    /// Get a copy of the pattern pool
    pub fn patterns(&self) -> Vec<TruthTable> {
        self.state.borrow().patterns.clone()
    }

    /// Append one input assignment to the pool
    ///
    /// Node signatures become stale and are refreshed on access.
    pub fn add_pattern(&self, pattern: &[bool]) {
        let mut state = self.state.borrow_mut();
        assert_eq!(pattern.len(), state.patterns.len());
        for (t, b) in state.patterns.iter_mut().zip(pattern.iter()) {
            t.push_bit(*b);
        }
        state.nb_bits += 1;
    }

    /// Get the signature of a node, refreshing stale fanins as needed
    pub fn value(&self, net: &Network, n: u32) -> TruthTable {
        self.refresh(net, n);
        self.state.borrow().tts[n as usize].clone()
    }

    /// Get the signature of a signal
    pub fn signal_value(&self, net: &Network, s: Signal) -> TruthTable {
        self.refresh(net, s.node());
        self.state.borrow().signal_value(s)
    }

    /// Recompute the signature of a node and of its stale transitive fanin
    fn refresh(&self, net: &Network, n: u32) {
        let mut state = self.state.borrow_mut();
        state.ensure_len(net.nb_nodes());
        if state.fresh(n) {
            return;
        }
        // Iterative post-order walk over the stale part of the fanin cone
        let mut stack = vec![(n, false)];
        while let Some((m, expanded)) = stack.pop() {
            if state.fresh(m) {
                continue;
            }
            if expanded {
                let gate = *net.gate(m);
                state.try_compute(m, &gate);
                debug_assert!(state.fresh(m));
            } else {
                stack.push((m, true));
                for s in net.gate(m).fanins() {
                    if !state.fresh(s.node()) {
                        stack.push((s.node(), false));
                    }
                }
            }
        }
    }

    /// Re-simulate every live node against the current pool
    pub fn resimulate_all(&self, net: &Network) {
        {
            let mut state = self.state.borrow_mut();
            let nb_bits = state.nb_bits;
            state.ensure_len(net.nb_nodes());
            state.tts[0] = TruthTable::zeros(nb_bits);
            for (pos, &n) in net.input_nodes().iter().enumerate() {
                state.tts[n as usize] = state.patterns[pos].clone();
            }
        }
        for n in net.topo_order() {
            let gate = *net.gate(n);
            self.state.borrow_mut().try_compute(n, &gate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_adder() -> (Network, Signal, Signal) {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let cin = net.add_input();
        let ab = net.xor(a, b);
        let sum = net.xor(ab, cin);
        let c1 = net.and(a, b);
        let c2 = net.and(ab, cin);
        let carry = net.or(c1, c2);
        net.add_output(sum);
        net.add_output(carry);
        (net, sum, carry)
    }

    #[test]
    fn test_exhaustive_adder() {
        let (net, sum, carry) = full_adder();
        let patterns = (0..3).map(|i| TruthTable::nth_var(3, i)).collect();
        let sim = Simulator::from_patterns(patterns);
        let sum_tt = sim.signal_value(&net, sum);
        let carry_tt = sim.signal_value(&net, carry);
        for p in 0..8usize {
            let (a, b, c) = (p & 1 != 0, p & 2 != 0, p & 4 != 0);
            assert_eq!(sum_tt.bit(p), a ^ b ^ c);
            assert_eq!(carry_tt.bit(p), (a & b) | (c & (a ^ b)));
        }
    }

    #[test]
    fn test_on_add_event() {
        let mut net = Network::new();
        let i0 = net.add_input();
        let i1 = net.add_input();
        let patterns = (0..2).map(|i| TruthTable::nth_var(2, i)).collect();
        let mut sim = Simulator::from_patterns(patterns);
        sim.attach(&mut net);
        sim.resimulate_all(&net);
        // Created after attach: simulated by the event handler
        let x = net.and(i0, !i1);
        let tt = sim.value(&net, x.node());
        assert_eq!(tt.bit(0), false);
        assert_eq!(tt.bit(1), true);
        assert_eq!(tt.bit(2), false);
        assert_eq!(tt.bit(3), false);
        sim.release(&mut net);
    }

    #[test]
    fn test_add_pattern_refresh() {
        let mut net = Network::new();
        let i0 = net.add_input();
        let i1 = net.add_input();
        let x = net.and(i0, i1);
        let sim = Simulator::from_patterns(vec![TruthTable::zeros(1), TruthTable::zeros(1)]);
        assert!(sim.value(&net, x.node()).is_zero());
        sim.add_pattern(&[true, true]);
        let tt = sim.value(&net, x.node());
        assert_eq!(tt.nb_bits(), 2);
        assert!(!tt.bit(0));
        assert!(tt.bit(1));
    }

    #[test]
    fn test_random_pinned_patterns() {
        let sim = Simulator::new_random(4, 64, 3);
        let pats = sim.patterns();
        for p in &pats {
            assert!(!p.bit(0));
            assert!(p.bit(1));
        }
        assert_eq!(sim.nb_patterns(), 64);
    }
}
