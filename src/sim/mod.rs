//! Scenario pipeline: event sampling, timeseries composition, coincidence
//! adjustment, Monte Carlo aggregation, and orchestration.

pub mod aggregate;
pub mod coincidence;
pub mod compositor;
pub mod engine;
pub mod sampler;
pub mod scenario;
pub mod series;
