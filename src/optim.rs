//! Optimization of logic networks

mod reduce;
mod resub;
mod window_resub;

pub use reduce::{func_reduction, ReduceParams, ReduceStats};
pub use resub::{sim_resubstitution, ResubParams, ResubStats};
pub use window_resub::window_resubstitution;
