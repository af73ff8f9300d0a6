//! Resynthesis engines: find a small replacement circuit for a target
//! function over a set of divisors

mod index_list;
mod mux;
mod xag;

pub use index_list::{IndexList, VARIANT_AIG, VARIANT_MIG, VARIANT_MUX, VARIANT_XAG};
pub use mux::MuxResyn;
pub use xag::XagResyn;

use crate::sim::TruthTable;

/// Common interface of the resynthesis engines
///
/// Given a target truth table, a care mask and divisor truth tables of equal
/// length, an engine either produces an index list realizing the target
/// wherever care is set, using at most `max_inserts` gates, or reports that
/// its search space is exhausted. The produced list takes one input per
/// divisor, in order.
pub trait ResynEngine {
    /// Search for a replacement circuit
    fn synthesize(
        &mut self,
        target: &TruthTable,
        care: &TruthTable,
        divs: &[TruthTable],
        max_inserts: usize,
    ) -> Option<IndexList>;
}
