//! Load simulation: many concurrent dispatches against one dispatcher.

mod runner;
mod stats;

pub use runner::{Simulation, SimulationConfig};
pub use stats::SimulationStats;
