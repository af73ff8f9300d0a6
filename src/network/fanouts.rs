use std::cell::RefCell;
use std::rc::Rc;

use crate::network::gates::Gate;
use crate::network::network::Network;

/// Reverse-edge index over a network, kept current through events
///
/// The index lists, for every node, the live gates that read it. Primary
/// output references are not part of the index; they are available from the
/// network's output list directly. The index holds its own storage and stays
/// valid across substitutions as long as its handlers remain registered.
pub struct FanoutIndex {
    state: Rc<RefCell<Vec<Vec<u32>>>>,
    add_id: usize,
    mod_id: usize,
    del_id: usize,
}

fn remove_fanout(state: &mut [Vec<u32>], child: u32, parent: u32) {
    let v = &mut state[child as usize];
    if let Some(pos) = v.iter().position(|&p| p == parent) {
        v.swap_remove(pos);
    }
}

fn add_fanout(state: &mut Vec<Vec<u32>>, child: u32, parent: u32) {
    if state.len() <= child as usize {
        state.resize(child as usize + 1, Vec::new());
    }
    state[child as usize].push(parent);
}

impl FanoutIndex {
    /// Build the index and subscribe to the network's events
    pub fn attach(net: &mut Network) -> FanoutIndex {
        let mut fanouts = vec![Vec::new(); net.nb_nodes()];
        for n in 1..net.nb_nodes() as u32 {
            if !net.is_gate(n) {
                continue;
            }
            for s in net.gate(n).fanins() {
                fanouts[s.node() as usize].push(n);
            }
        }
        let state = Rc::new(RefCell::new(fanouts));

        let st = state.clone();
        let add_id = net.events().register_add(Box::new(move |n, gate| {
            let mut f = st.borrow_mut();
            if f.len() <= n as usize {
                f.resize(n as usize + 1, Vec::new());
            }
            for s in gate.fanins() {
                add_fanout(&mut f, s.node(), n);
            }
        }));
        let st = state.clone();
        let mod_id = net
            .events()
            .register_modified(Box::new(move |n, new_gate, old_gate| {
                let mut f = st.borrow_mut();
                for s in old_gate.fanins() {
                    remove_fanout(&mut f, s.node(), n);
                }
                for s in new_gate.fanins() {
                    add_fanout(&mut f, s.node(), n);
                }
            }));
        let st = state.clone();
        let del_id = net.events().register_delete(Box::new(move |n, gate: &Gate| {
            let mut f = st.borrow_mut();
            for s in gate.fanins() {
                remove_fanout(&mut f, s.node(), n);
            }
        }));

        FanoutIndex {
            state,
            add_id,
            mod_id,
            del_id,
        }
    }

    /// Get the gates reading a node
    pub fn fanouts(&self, n: u32) -> Vec<u32> {
        let f = self.state.borrow();
        if n as usize >= f.len() {
            return Vec::new();
        }
        f[n as usize].clone()
    }

    /// Unsubscribe from the network's events
    pub fn release(self, net: &mut Network) {
        net.events().release(self.add_id);
        net.events().release(self.mod_id);
        net.events().release(self.del_id);
    }
}
