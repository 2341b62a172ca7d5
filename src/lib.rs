//! Agent-based Monte Carlo simulator for EV charging power demand.

pub mod calibration;
pub mod config;
pub mod error;
pub mod io;
pub mod population;
/// Scenario pipeline: sampling, composition, adjustment, aggregation.
pub mod sim;
pub mod validation;
