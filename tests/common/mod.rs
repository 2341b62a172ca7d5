//! Shared helpers for integration tests.

use ev_demand_sim::config::SimulationConfig;

/// Reference end-to-end configuration: 100 vehicles, one day at 15-minute
/// resolution (96 buckets), 5 replications, seed 42.
pub fn reference_config() -> SimulationConfig {
    let mut cfg = SimulationConfig::baseline();
    cfg.vehicles.num_vehicles = 100;
    cfg.simulation.days = 1;
    cfg.simulation.resolution_min = 15;
    cfg.simulation.monte_carlo_runs = 5;
    cfg.simulation.seed = 42;
    cfg
}
