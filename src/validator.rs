//! SAT-based validation of resubstitution candidates
//!
//! Answers whether a candidate signal or replacement circuit is functionally
//! equivalent to an existing root, within a conflict budget. The kissat
//! backend has neither assumptions nor bookmarks, so every validation builds
//! a fresh solver over the transitive-fanin cones involved; scratch
//! variables for candidate circuits vanish with the solver.

use fxhash::FxHashMap;
use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Clause, Lit, TernaryVal};
use rustsat_kissat::{Kissat, Limit};

use crate::network::{Gate, Marks, Network, Signal};
use crate::resyn::IndexList;

/// Validator configuration
#[derive(Debug, Clone)]
pub struct ValidatorParams {
    /// Conflict budget per solver call
    pub conflict_limit: u32,
    /// Observability don't-care levels: 0 disables, -1 means up to the
    /// outputs
    pub odc_levels: i32,
}

impl Default for ValidatorParams {
    fn default() -> ValidatorParams {
        ValidatorParams {
            conflict_limit: 1000,
            odc_levels: 0,
        }
    }
}

/// Result of one validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The candidate is equivalent to the root
    Unsat,
    /// Distinguishing input assignment, one value per primary input
    Sat(Vec<bool>),
    /// Conflict budget exhausted; nothing proven
    Timeout,
}

/// SAT validator over a network
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Configuration
    pub ps: ValidatorParams,
}

impl Validator {
    /// Create a validator with the given parameters
    pub fn new(ps: ValidatorParams) -> Validator {
        Validator { ps }
    }

    /// Check whether an existing signal matches the root
    pub fn validate_signal(&self, net: &Network, root: u32, cand: Signal) -> Outcome {
        let mut cnf = CnfBuilder::new(net);
        let root_lit = cnf.node_lit(root);
        let cand_lit = cnf.signal_lit(cand);
        self.run(net, cnf, root, root_lit, cand_lit)
    }

    /// Check whether a replacement circuit over divisor nodes matches the root
    ///
    /// The circuit gates get scratch solver variables; they are not part of
    /// the network.
    pub fn validate_list(
        &self,
        net: &Network,
        root: u32,
        divs: &[u32],
        list: &IndexList,
    ) -> Outcome {
        debug_assert_eq!(divs.len(), list.nb_inputs() as usize);
        debug_assert_eq!(list.nb_outputs(), 1);
        let mut cnf = CnfBuilder::new(net);
        let root_lit = cnf.node_lit(root);

        let mut lits = Vec::with_capacity(2 + divs.len() + list.nb_gates() as usize);
        let const_lit = cnf.node_lit(0);
        lits.push(const_lit);
        lits.push(!const_lit);
        for &d in divs {
            lits.push(cnf.node_lit(d));
        }
        for (l0, l1) in list.gates() {
            let a = lit_at(&lits, *l0);
            let b = lit_at(&lits, *l1);
            let c = cnf.fresh_lit();
            if l0 < l1 {
                cnf.add_and(c, a, b);
            } else {
                cnf.add_xor(c, a, b);
            }
            lits.push(c);
        }
        let cand_lit = lit_at(&lits, list.output_lit(0));
        self.run(net, cnf, root, root_lit, cand_lit)
    }

    /// Add the miter, solve, and extract a counter-example on SAT
    fn run(
        &self,
        net: &Network,
        mut cnf: CnfBuilder,
        root: u32,
        root_lit: Lit,
        cand_lit: Lit,
    ) -> Outcome {
        if self.ps.odc_levels != 0 {
            cnf.add_observability(root, root_lit, self.ps.odc_levels);
        }
        // Activation variable pinned false: the solver must find an input
        // under which root and candidate differ
        let n = cnf.fresh_lit();
        cnf.clause(&[root_lit, cand_lit, n]);
        cnf.clause(&[!root_lit, !cand_lit, n]);
        cnf.clause(&[!n]);

        let mut solver = Kissat::default();
        for cl in cnf.clauses.drain(..) {
            solver.add_clause(cl).expect("sat solver rejected a clause");
        }
        solver.set_limit(Limit::Conflicts(self.ps.conflict_limit as _));
        match solver.solve() {
            Ok(SolverResult::Unsat) => Outcome::Unsat,
            Ok(SolverResult::Sat) => {
                let mut cex = Vec::with_capacity(net.nb_inputs());
                for &i in net.input_nodes() {
                    let value = match cnf.vars.get(&i) {
                        Some(&lit) => matches!(solver.lit_val(lit), Ok(TernaryVal::True)),
                        None => false,
                    };
                    cex.push(value);
                }
                Outcome::Sat(cex)
            }
            _ => Outcome::Timeout,
        }
    }
}

/// Get the solver literal of an index-list literal
fn lit_at(lits: &[Lit], list_lit: u32) -> Lit {
    let l = lits[(list_lit >> 1) as usize];
    if list_lit & 1 != 0 {
        !l
    } else {
        l
    }
}

/// Tseitin encoding of the fanin cones that get referenced
///
/// Clauses are collected first and handed to a fresh solver at solve time,
/// so the builder carries no solver state of its own.
struct CnfBuilder<'a> {
    net: &'a Network,
    clauses: Vec<Clause>,
    vars: FxHashMap<u32, Lit>,
    next_var: u32,
}

impl<'a> CnfBuilder<'a> {
    fn new(net: &'a Network) -> CnfBuilder<'a> {
        CnfBuilder {
            net,
            clauses: Vec::new(),
            vars: FxHashMap::default(),
            next_var: 0,
        }
    }

    fn fresh_lit(&mut self) -> Lit {
        let l = Lit::positive(self.next_var);
        self.next_var += 1;
        l
    }

    fn clause(&mut self, lits: &[Lit]) {
        self.clauses.push(lits.iter().copied().collect());
    }

    /// 3 clauses, 6 literals
    fn add_and(&mut self, c: Lit, a: Lit, b: Lit) {
        self.clause(&[a, !c]);
        self.clause(&[b, !c]);
        self.clause(&[!a, !b, c]);
    }

    /// 4 clauses, 12 literals
    fn add_xor(&mut self, c: Lit, a: Lit, b: Lit) {
        self.clause(&[!a, !b, !c]);
        self.clause(&[!a, b, c]);
        self.clause(&[a, !b, c]);
        self.clause(&[a, b, !c]);
    }

    fn signal_lit(&mut self, s: Signal) -> Lit {
        let l = self.node_lit(s.node());
        if s.is_complement() {
            !l
        } else {
            l
        }
    }

    /// Get the literal of a node, emitting clauses for its unvisited cone
    fn node_lit(&mut self, n: u32) -> Lit {
        if let Some(&l) = self.vars.get(&n) {
            return l;
        }
        let mut stack = vec![(n, false)];
        while let Some((m, expanded)) = stack.pop() {
            if self.vars.contains_key(&m) {
                continue;
            }
            match *self.net.gate(m) {
                Gate::Const => {
                    let l = self.fresh_lit();
                    self.vars.insert(m, l);
                    self.clause(&[!l]);
                }
                Gate::Input(_) => {
                    let l = self.fresh_lit();
                    self.vars.insert(m, l);
                }
                Gate::And([a, b]) | Gate::Xor([a, b]) if !expanded => {
                    stack.push((m, true));
                    stack.push((a.node(), false));
                    stack.push((b.node(), false));
                }
                Gate::And([a, b]) => {
                    let la = self.signal_lit(a);
                    let lb = self.signal_lit(b);
                    let l = self.fresh_lit();
                    self.vars.insert(m, l);
                    self.add_and(l, la, lb);
                }
                Gate::Xor([a, b]) => {
                    let la = self.signal_lit(a);
                    let lb = self.signal_lit(b);
                    let l = self.fresh_lit();
                    self.vars.insert(m, l);
                    self.add_xor(l, la, lb);
                }
            }
        }
        self.vars[&n]
    }

    /// Encode the observability side condition for a root
    ///
    /// The transitive fanout cone of the root is duplicated up to `levels`
    /// levels with the root inverted; a difference is required on the cone
    /// frontier or on an output fed from inside the cone. If the root feeds
    /// an output directly, a flip is always observable and nothing is added.
    fn add_observability(&mut self, root: u32, root_lit: Lit, levels: i32) {
        let net = self.net;
        if net.outputs().iter().any(|s| s.node() == root) {
            return;
        }

        // Bounded TFO cone, from a scan of the live gates
        let mut fanouts: Vec<Vec<u32>> = vec![Vec::new(); net.nb_nodes()];
        for m in 1..net.nb_nodes() as u32 {
            if !net.is_gate(m) {
                continue;
            }
            for s in net.gate(m).fanins() {
                fanouts[s.node() as usize].push(m);
            }
        }
        let mut in_cone = Marks::new(net.nb_nodes());
        in_cone.reset();
        in_cone.mark(root);
        let mut cone = Vec::new();
        let mut frontier = vec![root];
        let mut depth = 0;
        while !frontier.is_empty() && (levels < 0 || depth < levels) {
            let mut next = Vec::new();
            for &m in &frontier {
                for &p in &fanouts[m as usize] {
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

        // Duplicate the cone with the root inverted
        let mut copy: FxHashMap<u32, Lit> = FxHashMap::default();
        copy.insert(root, !root_lit);
        let positions: FxHashMap<u32, usize> = net
            .topo_order()
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();
        cone.sort_by_key(|n| positions[n]);
        for &m in &cone {
            let gate = *net.gate(m);
            let fanin_lit = |cnf: &mut CnfBuilder, s: &Signal| -> Lit {
                let l = match copy.get(&s.node()) {
                    Some(&l) => l,
                    None => cnf.node_lit(s.node()),
                };
                if s.is_complement() {
                    !l
                } else {
                    l
                }
            };
            let la = fanin_lit(self, &gate.fanins()[0]);
            let lb = fanin_lit(self, &gate.fanins()[1]);
            let l = self.fresh_lit();
            match gate {
                Gate::And(_) => self.add_and(l, la, lb),
                Gate::Xor(_) => self.add_xor(l, la, lb),
                _ => unreachable!(),
            }
            copy.insert(m, l);
        }

        // Require a difference on the frontier or at an output
        let mut po_nodes = Marks::new(net.nb_nodes());
        po_nodes.reset();
        for o in net.outputs() {
            po_nodes.mark(o.node());
        }
        let mut diffs = Vec::new();
        for &m in &cone {
            let copy_lit = copy[&m];
            let boundary =
                po_nodes.is_marked(m) || fanouts[m as usize].iter().any(|&p| !in_cone.is_marked(p));
            if boundary {
                let orig = self.node_lit(m);
                let d = self.fresh_lit();
                self.clause(&[!d, orig, copy_lit]);
                self.clause(&[!d, !orig, !copy_lit]);
                diffs.push(d);
            }
        }
        self.clause(&diffs);
    }
}
