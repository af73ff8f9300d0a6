//! Windowing: cuts, divisors, fanout-free cones and don't-care masks

mod cut;
mod divisors;
mod dont_cares;
mod view;

pub use cut::reconv_cut;
pub use divisors::{collect_divisors, collect_supported, mffc, DivisorParams};
pub use dont_cares::{observability_dont_cares, satisfiability_dont_cares};
pub use view::WindowView;
