use std::fmt;

use crate::network::signal::Signal;

/// Logic gate representation
///
/// Gates have a canonical form that makes deduplication possible:
///   * And gates keep their fanins ordered by increasing node index, and may
///     have complemented fanins;
///   * Xor gates keep their fanins ordered by decreasing node index, with the
///     complements pulled out to the fanouts.
/// The opposite orderings are what tells the two kinds apart in a mixed
/// And/Xor network.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Gate {
    /// Constant zero source; only ever node 0
    Const,
    /// Primary input with its position in the input list
    Input(u32),
    /// 2-input And gate
    And([Signal; 2]),
    /// 2-input Xor gate
    Xor([Signal; 2]),
}

/// Result of normalizing a logic gate
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Normalization {
    /// A gate, with an optional complemented output
    Node(Gate, bool),
    /// The trivial case, where the gate reduces to a single signal or constant
    Copy(Signal),
}

impl Gate {
    /// Obtain all signals feeding this gate
    pub fn fanins(&self) -> &[Signal] {
        use Gate::*;
        match self {
            Const | Input(_) => &[],
            And(s) | Xor(s) => s,
        }
    }

    /// Returns whether the gate is a 2-input gate (not a constant or input)
    pub fn is_gate(&self) -> bool {
        matches!(self, Gate::And(_) | Gate::Xor(_))
    }

    /// Returns whether the gate is in canonical form
    pub fn is_canonical(&self) -> bool {
        use Gate::*;
        match self {
            Const | Input(_) => true,
            And([a, b]) => !a.is_constant() && a.node() < b.node(),
            Xor([a, b]) => {
                !b.is_constant()
                    && a.node() > b.node()
                    && !a.is_complement()
                    && !b.is_complement()
            }
        }
    }

    /// Apply a remapping of node order to the gate
    pub(crate) fn remap_order(&self, t: &[Signal]) -> Normalization {
        use Gate::*;
        match self {
            Const | Input(_) => Normalization::Node(*self, false),
            And([a, b]) => make_and(a.remap_order(t), b.remap_order(t)),
            Xor([a, b]) => make_xor(a.remap_order(t), b.remap_order(t)),
        }
    }
}

/// Normalize an And: trivial cases, then canonical fanin order
pub fn make_and(a: Signal, b: Signal) -> Normalization {
    use Normalization::*;
    if a == b {
        Copy(a)
    } else if a == !b {
        Copy(Signal::zero())
    } else if a == Signal::zero() || b == Signal::zero() {
        Copy(Signal::zero())
    } else if a == Signal::one() {
        Copy(b)
    } else if b == Signal::one() {
        Copy(a)
    } else if a.node() < b.node() {
        Node(Gate::And([a, b]), false)
    } else {
        Node(Gate::And([b, a]), false)
    }
}

/// Normalize a Xor: trivial cases, complements out, canonical fanin order
pub fn make_xor(a: Signal, b: Signal) -> Normalization {
    use Normalization::*;
    let inv = a.is_complement() ^ b.is_complement();
    let (i0, i1) = (a.without_complement(), b.without_complement());
    if i0 == i1 {
        Copy(Signal::from(inv))
    } else if i0 == Signal::zero() {
        Copy(i1 ^ inv)
    } else if i1 == Signal::zero() {
        Copy(i0 ^ inv)
    } else if i0.node() > i1.node() {
        Node(Gate::Xor([i0, i1]), inv)
    } else {
        Node(Gate::Xor([i1, i0]), inv)
    }
}

impl Normalization {
    /// Returns whether the normalization is canonical
    pub fn is_canonical(&self) -> bool {
        use Normalization::*;
        match self {
            Copy(_) => true,
            Node(g, _) => g.is_canonical(),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Gate::*;
        match self {
            Const => write!(f, "0"),
            Input(i) => write!(f, "i{i}"),
            And([a, b]) => write!(f, "{a} & {b}"),
            Xor([a, b]) => write!(f, "{a} ^ {b}"),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Normalization::*;
        match self {
            Copy(s) => write!(f, "{s}"),
            Node(g, inv) => {
                if *inv {
                    write!(f, "!(")?;
                }
                write!(f, "{g}")?;
                if *inv {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}
