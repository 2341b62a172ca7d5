//! Vehicle agent population: static attributes and their generation.

mod agent;
mod generator;

pub use agent::{Agent, VehicleClass};
pub use generator::generate_population;
