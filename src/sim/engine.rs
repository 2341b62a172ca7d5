//! Run orchestration: population, parallel replications, aggregation.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::population::{Agent, generate_population};
use crate::sim::aggregate::{Aggregator, ReplicationResult, SummaryStats};
use crate::sim::coincidence::adjust;
use crate::sim::compositor::compose_raw_series;
use crate::sim::sampler::SessionSampler;
use crate::sim::scenario::{POPULATION_STREAM, Scenario, ScenarioState, build_scenarios, stream_seed};
use crate::sim::series::Horizon;

/// Complete output of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// Per-replication results, in replication order.
    pub replications: Vec<ReplicationResult>,
    /// Summary statistics over all successful replications.
    pub summary: SummaryStats,
    /// Errors of excluded replications.
    pub failures: Vec<SimError>,
}

impl SimulationOutcome {
    /// Mean adjusted demand per bucket across all successful replications.
    pub fn mean_adjusted_profile(&self) -> Vec<f64> {
        let Some(first) = self.replications.first() else {
            return Vec::new();
        };
        let n = self.replications.len() as f64;
        let mut profile = vec![0.0; first.adjusted.values.len()];
        for r in &self.replications {
            for (p, v) in profile.iter_mut().zip(&r.adjusted.values) {
                *p += v / n;
            }
        }
        profile
    }
}

/// Runs the full Monte Carlo simulation.
///
/// Configuration is validated eagerly, before any scenario executes.
/// Replications run in parallel; each derives its random stream purely from
/// (global seed, replication index), and results are reduced in replication
/// order, so the outcome is bit-identical regardless of worker count.
/// Per-replication failures are isolated, logged, and counted; the run
/// aborts only when the failed fraction exceeds the configured threshold.
///
/// # Errors
///
/// [`SimError::Configuration`] on invalid configuration, [`SimError::Fatal`]
/// when too many replications fail or none succeed.
pub fn run(config: &SimulationConfig) -> Result<SimulationOutcome, SimError> {
    config.validated()?;

    let s = &config.simulation;
    let horizon = Horizon::new(s.days, s.resolution_min)?;
    let sampler = SessionSampler::from_config(&config.charging)?;

    let mut pop_rng = StdRng::seed_from_u64(stream_seed(s.seed, POPULATION_STREAM));
    let population = generate_population(&config.vehicles, &config.behavioral, &mut pop_rng)?;
    info!(
        vehicles = population.len(),
        days = s.days,
        runs = s.monte_carlo_runs,
        seed = s.seed,
        "population generated, starting replications"
    );

    let scenarios = build_scenarios(horizon, s.seed, s.monte_carlo_runs);
    let outcomes: Vec<(Scenario, Result<ReplicationResult, SimError>)> = scenarios
        .into_par_iter()
        .map(|mut scenario| {
            let outcome = execute_scenario(&mut scenario, &population, &sampler);
            (scenario, outcome)
        })
        .collect();

    let reduced = reduce_in_order(horizon, outcomes, s.max_failed_fraction)?;
    debug_assert!(reduced.scenarios.iter().all(|sc| matches!(
        sc.state,
        ScenarioState::Discarded | ScenarioState::Failed
    )));

    let summary = reduced
        .aggregator
        .finalize(s.confidence_level, reduced.failures.len())?;
    info!(
        completed = summary.runs_completed,
        failed = summary.runs_failed,
        peak_kw = summary.peak_demand_kw,
        "run complete"
    );

    Ok(SimulationOutcome {
        replications: reduced.replications,
        summary,
        failures: reduced.failures,
    })
}

/// Product of the ordered reduction over replication outcomes.
struct ReducedRun {
    aggregator: Aggregator,
    replications: Vec<ReplicationResult>,
    failures: Vec<SimError>,
    scenarios: Vec<Scenario>,
}

/// Folds replication outcomes sequentially in replication order, which keeps
/// the floating-point reduction order fixed independent of the parallel
/// execution width. Successful scenarios retire through Aggregated and
/// Discarded; failed ones stay Failed, are logged, and are excluded from
/// aggregation.
///
/// # Errors
///
/// Returns [`SimError::Fatal`] when the failed fraction exceeds
/// `max_failed_fraction`.
fn reduce_in_order(
    horizon: Horizon,
    outcomes: Vec<(Scenario, Result<ReplicationResult, SimError>)>,
    max_failed_fraction: f64,
) -> Result<ReducedRun, SimError> {
    let total = outcomes.len();
    let mut aggregator = Aggregator::new(horizon);
    let mut replications = Vec::new();
    let mut failures = Vec::new();
    let mut scenarios = Vec::with_capacity(total);
    for (mut scenario, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                aggregator.push(&result);
                scenario.state = ScenarioState::Aggregated;
                debug!(replication = scenario.replication, state = %scenario.state, "replication folded");
                replications.push(result);
                scenario.state = ScenarioState::Discarded;
            }
            Err(e) => {
                warn!(error = %e, "replication excluded from aggregation");
                failures.push(e);
            }
        }
        scenarios.push(scenario);
    }

    let failed_fraction = failures.len() as f64 / total as f64;
    if failed_fraction > max_failed_fraction {
        return Err(SimError::Fatal(format!(
            "{} of {} replications failed ({:.0}% > {:.0}% threshold)",
            failures.len(),
            total,
            failed_fraction * 100.0,
            max_failed_fraction * 100.0
        )));
    }

    Ok(ReducedRun {
        aggregator,
        replications,
        failures,
        scenarios,
    })
}

/// Executes one replication through its lifecycle:
/// Created → Sampled → Composed → Adjusted. Aggregation and discard happen
/// in the caller; failures transition to `Failed` and surface as errors.
fn execute_scenario(
    scenario: &mut Scenario,
    population: &[Agent],
    sampler: &SessionSampler,
) -> Result<ReplicationResult, SimError> {
    let replication = scenario.replication;
    let mut rng = scenario.rng();

    scenario.state = ScenarioState::Sampled;
    let raw = compose_raw_series(population, sampler, scenario.horizon, &mut rng);
    scenario.state = ScenarioState::Composed;

    if !raw.is_well_formed() {
        scenario.state = ScenarioState::Failed;
        return Err(SimError::ScenarioExecution {
            replication,
            message: "raw series contains non-finite or negative buckets".into(),
        });
    }

    let (adjusted, coincidence_factor) = adjust(&raw, population.len());
    scenario.state = ScenarioState::Adjusted;
    debug!(replication, state = %scenario.state, fc = coincidence_factor, "replication done");

    Ok(ReplicationResult {
        replication,
        raw,
        adjusted,
        coincidence_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::coincidence::coincidence_factor;
    use crate::sim::series::DemandSeries;

    fn flat_result(replication: usize, horizon: Horizon, level: f64) -> ReplicationResult {
        let raw = DemandSeries {
            horizon,
            values: vec![level; horizon.total_buckets()],
        };
        let (adjusted, fc) = adjust(&raw, 100);
        ReplicationResult {
            replication,
            raw,
            adjusted,
            coincidence_factor: fc,
        }
    }

    fn exec_failure(replication: usize) -> SimError {
        SimError::ScenarioExecution {
            replication,
            message: "numerical failure".into(),
        }
    }

    /// Builds (scenario, outcome) pairs where the listed replications fail.
    fn outcomes_with_failures(
        horizon: Horizon,
        runs: usize,
        failing: &[usize],
    ) -> Vec<(Scenario, Result<ReplicationResult, SimError>)> {
        build_scenarios(horizon, 7, runs)
            .into_iter()
            .map(|mut scenario| {
                let i = scenario.replication;
                if failing.contains(&i) {
                    scenario.state = ScenarioState::Failed;
                    (scenario, Err(exec_failure(i)))
                } else {
                    scenario.state = ScenarioState::Adjusted;
                    let result = flat_result(i, horizon, 1.0 + i as f64);
                    (scenario, Ok(result))
                }
            })
            .collect()
    }

    fn small_config() -> SimulationConfig {
        let mut cfg = SimulationConfig::baseline();
        cfg.vehicles.num_vehicles = 20;
        cfg.simulation.monte_carlo_runs = 4;
        cfg.simulation.days = 1;
        cfg
    }

    #[test]
    fn invalid_config_fails_before_execution() {
        let mut cfg = small_config();
        cfg.charging.home.duration_shape = -2.0;
        let err = run(&cfg);
        assert!(err.is_err());
        assert!(matches!(
            err.unwrap_err(),
            SimError::Configuration { .. }
        ));
    }

    #[test]
    fn replication_count_matches_config() {
        let outcome = run(&small_config()).expect("small config runs");
        assert_eq!(outcome.replications.len(), 4);
        assert!(outcome.failures.is_empty());
        for (i, r) in outcome.replications.iter().enumerate() {
            assert_eq!(r.replication, i);
            assert_eq!(r.raw.values.len(), 96);
            assert_eq!(r.adjusted.values.len(), 96);
        }
    }

    #[test]
    fn adjusted_never_exceeds_raw() {
        let outcome = run(&small_config()).expect("small config runs");
        for r in &outcome.replications {
            for (a, raw) in r.adjusted.values.iter().zip(&r.raw.values) {
                assert!(a <= raw);
            }
        }
    }

    #[test]
    fn failed_replications_are_excluded_from_aggregation() {
        let h = Horizon::new(1, 60).expect("valid horizon");
        let outcomes = outcomes_with_failures(h, 4, &[1, 3]);
        let reduced =
            reduce_in_order(h, outcomes, 0.5).expect("half failed is within the threshold");

        assert_eq!(reduced.replications.len(), 2);
        assert_eq!(reduced.failures.len(), 2);
        let kept: Vec<usize> = reduced.replications.iter().map(|r| r.replication).collect();
        assert_eq!(kept, vec![0, 2]);

        let summary = reduced.aggregator.finalize(0.95, reduced.failures.len())
            .expect("nonempty aggregation");
        assert_eq!(summary.runs_completed, 2);
        assert_eq!(summary.runs_failed, 2);
        // Mean demand comes only from the surviving flat series (levels 1, 3).
        let fc = coincidence_factor(100);
        assert!((summary.mean_demand_kw - 2.0 * fc).abs() < 1e-12);
    }

    #[test]
    fn failed_fraction_above_threshold_is_fatal() {
        let h = Horizon::new(1, 60).expect("valid horizon");
        let outcomes = outcomes_with_failures(h, 4, &[0, 1, 2]);
        let err = reduce_in_order(h, outcomes, 0.5);
        assert!(matches!(err, Err(SimError::Fatal(_))));
    }

    #[test]
    fn failed_fraction_at_threshold_is_tolerated() {
        let h = Horizon::new(1, 60).expect("valid horizon");
        let outcomes = outcomes_with_failures(h, 2, &[0]);
        assert!(reduce_in_order(h, outcomes, 0.5).is_ok());
    }

    #[test]
    fn scenarios_retire_through_terminal_states() {
        let h = Horizon::new(1, 60).expect("valid horizon");
        let outcomes = outcomes_with_failures(h, 3, &[1]);
        let reduced = reduce_in_order(h, outcomes, 0.5).expect("one failure tolerated");
        assert_eq!(reduced.scenarios[0].state, ScenarioState::Discarded);
        assert_eq!(reduced.scenarios[1].state, ScenarioState::Failed);
        assert_eq!(reduced.scenarios[2].state, ScenarioState::Discarded);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let cfg = small_config();
        let a = run(&cfg).expect("first run");
        let b = run(&cfg).expect("second run");
        assert_eq!(a.summary.peak_demand_kw, b.summary.peak_demand_kw);
        assert_eq!(a.summary.mean_demand_kw, b.summary.mean_demand_kw);
        assert_eq!(a.summary.peak_sd_kw, b.summary.peak_sd_kw);
        for (x, y) in a.replications.iter().zip(&b.replications) {
            assert_eq!(x.adjusted.values, y.adjusted.values);
        }
    }
}
