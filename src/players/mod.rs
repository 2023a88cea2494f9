pub mod base;
pub mod controller;
pub mod greedy;
pub mod random;

pub use base::{PolicyContext, PolicyFactory, PolicyRegistry, RailPolicy};
pub use controller::{PlayerController, PlayerHandle};
pub use greedy::GreedyPolicy;
pub use random::RandomPolicy;
