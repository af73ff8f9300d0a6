//! Representation of logic networks as And/Xor graphs with complemented edges

mod events;
mod fanouts;
mod gates;
mod levels;
mod marks;
#[allow(clippy::module_inception)]
mod network;
mod signal;

pub use events::NetworkEvents;
pub use fanouts::FanoutIndex;
pub use gates::{make_and, make_xor, Gate, Normalization};
pub use levels::LevelTracker;
pub use marks::Marks;
pub use network::{LogicBox, Network};
pub use signal::Signal;
