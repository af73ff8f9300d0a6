use std::fmt;

use crate::network::gates::Gate;

/// Callback invoked when a gate is created; receives the node and its gate
pub type AddHandler = Box<dyn FnMut(u32, &Gate)>;
/// Callback invoked when a gate is repointed; receives the node, the new gate
/// and the old gate
pub type ModifiedHandler = Box<dyn FnMut(u32, &Gate, &Gate)>;
/// Callback invoked when a node is taken out; receives the node and its gate
pub type DeleteHandler = Box<dyn FnMut(u32, &Gate)>;

/// Subscriber lists for structural network events
///
/// Handlers are called in subscription order and hold their own storage
/// (typically an `Rc<RefCell<_>>` shared with the component that registered
/// them). Registration returns an id used to release the handler.
#[derive(Default)]
pub struct NetworkEvents {
    add: Vec<(usize, AddHandler)>,
    modified: Vec<(usize, ModifiedHandler)>,
    delete: Vec<(usize, DeleteHandler)>,
    next_id: usize,
}

impl NetworkEvents {
    /// Subscribe to gate creations
    pub fn register_add(&mut self, f: AddHandler) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.add.push((id, f));
        id
    }

    /// Subscribe to gate modifications
    pub fn register_modified(&mut self, f: ModifiedHandler) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.modified.push((id, f));
        id
    }

    /// Subscribe to node deletions
    pub fn register_delete(&mut self, f: DeleteHandler) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.delete.push((id, f));
        id
    }

    /// Release a handler previously registered
    pub fn release(&mut self, id: usize) {
        self.add.retain(|(i, _)| *i != id);
        self.modified.retain(|(i, _)| *i != id);
        self.delete.retain(|(i, _)| *i != id);
    }

    pub(crate) fn fire_add(&mut self, n: u32, gate: &Gate) {
        for (_, f) in self.add.iter_mut() {
            f(n, gate);
        }
    }

    pub(crate) fn fire_modified(&mut self, n: u32, new_gate: &Gate, old_gate: &Gate) {
        for (_, f) in self.modified.iter_mut() {
            f(n, new_gate, old_gate);
        }
    }

    pub(crate) fn fire_delete(&mut self, n: u32, gate: &Gate) {
        for (_, f) in self.delete.iter_mut() {
            f(n, gate);
        }
    }
}

impl fmt::Debug for NetworkEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkEvents")
            .field("add", &self.add.len())
            .field("modified", &self.modified.len())
            .field("delete", &self.delete.len())
            .finish()
    }
}
