use std::cell::RefCell;
use std::rc::Rc;

use crate::network::network::Network;

/// Logic level (depth) maintenance, kept current through events
///
/// Two strategies are available, as substitution may leave stale levels in
/// the transitive fanout of a change:
///   * lazily, every add or repoint refreshes the touched node from its
///     children and tolerates stale fanouts until the next full sweep;
///   * `recompute` runs a precise iterative sweep in topological order.
/// Inputs and the constant are at level 0.
pub struct LevelTracker {
    state: Rc<RefCell<Vec<u32>>>,
    add_id: usize,
    mod_id: usize,
    del_id: usize,
}

impl LevelTracker {
    /// Compute the levels and subscribe to the network's events
    pub fn attach(net: &mut Network) -> LevelTracker {
        let mut levels = vec![0u32; net.nb_nodes()];
        for n in net.topo_order() {
            let mut l = 0;
            for s in net.gate(n).fanins() {
                l = l.max(levels[s.node() as usize] + 1);
            }
            levels[n as usize] = l;
        }
        let state = Rc::new(RefCell::new(levels));

        let st = state.clone();
        let add_id = net.events().register_add(Box::new(move |n, gate| {
            let mut levels = st.borrow_mut();
            if levels.len() <= n as usize {
                levels.resize(n as usize + 1, 0);
            }
            let mut l = 0;
            for s in gate.fanins() {
                l = l.max(levels[s.node() as usize] + 1);
            }
            levels[n as usize] = l;
        }));
        let st = state.clone();
        let mod_id = net
            .events()
            .register_modified(Box::new(move |n, new_gate, _old_gate| {
                let mut levels = st.borrow_mut();
                let mut l = 0;
                for s in new_gate.fanins() {
                    l = l.max(levels[s.node() as usize] + 1);
                }
                levels[n as usize] = l;
            }));
        let st = state.clone();
        let del_id = net.events().register_delete(Box::new(move |n, _gate| {
            st.borrow_mut()[n as usize] = 0;
        }));

        LevelTracker {
            state,
            add_id,
            mod_id,
            del_id,
        }
    }

    /// Get the level of a node
    pub fn level(&self, n: u32) -> u32 {
        self.state.borrow()[n as usize]
    }

    /// Get the depth of the network, from its outputs
    pub fn depth(&self, net: &Network) -> u32 {
        let levels = self.state.borrow();
        net.outputs()
            .iter()
            .map(|s| levels[s.node() as usize])
            .max()
            .unwrap_or(0)
    }

    /// Recompute every level with a precise topologically-ordered sweep
    pub fn recompute(&self, net: &Network) {
        let mut levels = self.state.borrow_mut();
        levels.clear();
        levels.resize(net.nb_nodes(), 0);
        for n in net.topo_order() {
            let mut l = 0;
            for s in net.gate(n).fanins() {
                l = l.max(levels[s.node() as usize] + 1);
            }
            levels[n as usize] = l;
        }
    }

    /// Unsubscribe from the network's events
    pub fn release(self, net: &mut Network) {
        net.events().release(self.add_id);
        net.events().release(self.mod_id);
        net.events().release(self.del_id);
    }
}
