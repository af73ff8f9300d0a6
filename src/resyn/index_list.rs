use std::fmt;

use crate::network::{Network, Signal};
use crate::sim::TruthTable;

/// Variant tag for And-only lists
pub const VARIANT_AIG: u32 = 0;
/// Variant tag for And/Xor lists
pub const VARIANT_XAG: u32 = 1;
/// Variant tag for majority lists
pub const VARIANT_MIG: u32 = 2;
/// Variant tag for multiplexer lists
pub const VARIANT_MUX: u32 = 3;

/// Compact description of a small replacement circuit
///
/// Literals are `2 * position + complement`. Positions 0 and 1 are the
/// constants false and true, positions `2 .. 2 + nb_inputs` the inputs, and
/// gate outputs follow in creation order. A gate is an And when its first
/// literal is smaller than its second, a Xor otherwise; this mirrors the
/// fanin-order discipline of the network itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexList {
    nb_inputs: u32,
    gates: Vec<(u32, u32)>,
    outputs: Vec<u32>,
    variant: u32,
}

impl IndexList {
    /// Create an empty list over the given number of inputs
    pub fn new(nb_inputs: u32, variant: u32) -> IndexList {
        IndexList {
            nb_inputs,
            gates: Vec::new(),
            outputs: Vec::new(),
            variant,
        }
    }

    /// Literal of a constant
    pub fn const_lit(value: bool) -> u32 {
        value as u32
    }

    /// Literal of the i-th input
    pub fn input_lit(&self, i: u32) -> u32 {
        debug_assert!(i < self.nb_inputs);
        (2 + i) << 1
    }

    /// Return the number of inputs
    pub fn nb_inputs(&self) -> u32 {
        self.nb_inputs
    }

    /// Return the number of gates
    pub fn nb_gates(&self) -> u32 {
        self.gates.len() as u32
    }

    /// Return the number of outputs
    pub fn nb_outputs(&self) -> u32 {
        self.outputs.len() as u32
    }

    /// Get the i-th output literal
    pub fn output_lit(&self, i: usize) -> u32 {
        self.outputs[i]
    }

    /// Get the gate literal pairs
    pub fn gates(&self) -> &[(u32, u32)] {
        &self.gates
    }

    /// Append an And gate and return its output literal
    pub fn add_and(&mut self, lit0: u32, lit1: u32) -> u32 {
        debug_assert!(lit0 >> 1 != lit1 >> 1);
        let pair = if lit0 < lit1 { (lit0, lit1) } else { (lit1, lit0) };
        self.push_gate(pair)
    }

    /// Append a Xor gate and return its output literal
    pub fn add_xor(&mut self, lit0: u32, lit1: u32) -> u32 {
        debug_assert!(lit0 >> 1 != lit1 >> 1);
        let pair = if lit0 > lit1 { (lit0, lit1) } else { (lit1, lit0) };
        self.push_gate(pair)
    }

    fn push_gate(&mut self, pair: (u32, u32)) -> u32 {
        let pos = 2 + self.nb_inputs + self.gates.len() as u32;
        self.gates.push(pair);
        pos << 1
    }

    /// Register an output literal
    pub fn add_output(&mut self, lit: u32) {
        self.outputs.push(lit);
    }

    /// Encode to the wire format
    ///
    /// One header word `(nb_inputs << 11) | (nb_gates << 3) | variant`, then
    /// the gate literal pairs, then one literal per output.
    pub fn encode(&self) -> Vec<u32> {
        debug_assert!(self.gates.len() < (1 << 8));
        debug_assert!(self.variant < (1 << 3));
        let mut raw = Vec::with_capacity(1 + 2 * self.gates.len() + self.outputs.len());
        raw.push((self.nb_inputs << 11) | ((self.gates.len() as u32) << 3) | self.variant);
        for (l0, l1) in &self.gates {
            raw.push(*l0);
            raw.push(*l1);
        }
        raw.extend(&self.outputs);
        raw
    }

    /// Decode from the wire format; rejects truncated or out-of-range data
    pub fn decode(raw: &[u32]) -> Option<IndexList> {
        let header = *raw.first()?;
        let nb_inputs = header >> 11;
        let nb_gates = (header >> 3) & 0xFF;
        let variant = header & 0x7;
        let gates_end = 1 + 2 * nb_gates as usize;
        if raw.len() < gates_end {
            return None;
        }
        let mut list = IndexList::new(nb_inputs, variant);
        for i in 0..nb_gates {
            let l0 = raw[1 + 2 * i as usize];
            let l1 = raw[2 + 2 * i as usize];
            let limit = (2 + nb_inputs + i) << 1;
            if l0 >= limit || l1 >= limit || l0 >> 1 == l1 >> 1 {
                return None;
            }
            list.gates.push((l0, l1));
        }
        let limit = (2 + nb_inputs + nb_gates) << 1;
        for &lit in &raw[gates_end..] {
            if lit >= limit {
                return None;
            }
            list.outputs.push(lit);
        }
        Some(list)
    }

    /// Evaluate the list over divisor truth tables
    ///
    /// Returns one table per output; all divisor tables must have the length
    /// given.
    pub fn eval(&self, divs: &[TruthTable], nb_bits: usize) -> Vec<TruthTable> {
        debug_assert_eq!(divs.len(), self.nb_inputs as usize);
        let mut values = Vec::with_capacity(2 + divs.len() + self.gates.len());
        values.push(TruthTable::zeros(nb_bits));
        values.push(TruthTable::ones(nb_bits));
        values.extend(divs.iter().cloned());
        let lit_value = |values: &[TruthTable], lit: u32| -> TruthTable {
            let t = &values[(lit >> 1) as usize];
            if lit & 1 != 0 {
                !t
            } else {
                t.clone()
            }
        };
        for (l0, l1) in &self.gates {
            let v0 = lit_value(&values, *l0);
            let v1 = lit_value(&values, *l1);
            let t = if l0 < l1 { &v0 & &v1 } else { &v0 ^ &v1 };
            values.push(t);
        }
        self.outputs
            .iter()
            .map(|&lit| lit_value(&values, lit))
            .collect()
    }

    /// Instantiate the list in a network on top of the given divisor signals
    ///
    /// Gates go through the usual reduction and strashing; returns one signal
    /// per output.
    pub fn insert(&self, net: &mut Network, divs: &[Signal]) -> Vec<Signal> {
        debug_assert_eq!(divs.len(), self.nb_inputs as usize);
        let mut signals = Vec::with_capacity(2 + divs.len() + self.gates.len());
        signals.push(Signal::zero());
        signals.push(Signal::one());
        signals.extend(divs.iter().cloned());
        let lit_signal =
            |signals: &[Signal], lit: u32| -> Signal { signals[(lit >> 1) as usize] ^ (lit & 1 != 0) };
        for (l0, l1) in &self.gates {
            let s0 = lit_signal(&signals, *l0);
            let s1 = lit_signal(&signals, *l1);
            let s = if l0 < l1 {
                net.and(s0, s1)
            } else {
                net.xor(s0, s1)
            };
            signals.push(s);
        }
        self.outputs
            .iter()
            .map(|&lit| lit_signal(&signals, lit))
            .collect()
    }
}

impl fmt::Display for IndexList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.nb_inputs)?;
        for (l0, l1) in &self.gates {
            write!(f, " ({l0},{l1})")?;
        }
        for o in &self.outputs {
            write!(f, " -> {o}")?;
        }
        write!(f, "}}")
    }
}
