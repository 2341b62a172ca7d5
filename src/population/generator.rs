//! Population generator: samples static agent attributes from configured
//! distributions.

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand_distr::{Beta, Distribution, Normal};
use tracing::warn;

use crate::config::{BehavioralConfig, VehiclesConfig};
use crate::error::SimError;
use crate::population::{Agent, VehicleClass};

/// Retry budget for truncated-normal rejection sampling before clamping.
const TRUNC_ATTEMPTS: usize = 1000;
/// Retry budget for the SOC start < end constraint.
const SOC_PAIR_ATTEMPTS: usize = 100;

/// Generates exactly `num_vehicles` agents from the configured distributions.
///
/// Categorical attributes use weighted discrete sampling; weights that do not
/// sum to 1 are renormalized with a non-fatal `warn!` diagnostic. The
/// generator holds no state between calls — all randomness flows through the
/// caller-provided `rng`.
///
/// # Errors
///
/// Returns a `ConfigurationError` if a distribution parameter is invalid
/// (the caller is expected to have run config validation first).
pub fn generate_population(
    vehicles: &VehiclesConfig,
    behavioral: &BehavioralConfig,
    rng: &mut StdRng,
) -> Result<Vec<Agent>, SimError> {
    let class_dist = weighted_index("vehicles.class_weights", &vehicles.class_weights)?;
    let battery_dist = weighted_index(
        "vehicles.battery_kwh_weights",
        &vehicles.battery_kwh_weights,
    )?;
    let charge_dist = weighted_index("vehicles.charge_kw_weights", &vehicles.charge_kw_weights)?;

    let efficiency = normal("vehicles.efficiency", vehicles.efficiency_mean, vehicles.efficiency_sd)?;
    let annual_km = normal("vehicles.annual_km", vehicles.annual_km_mean, vehicles.annual_km_sd)?;
    let soc_start = normal("behavioral.soc_start", behavioral.soc_start_mean, behavioral.soc_start_sd)?;
    let soc_end = normal("behavioral.soc_end", behavioral.soc_end_mean, behavioral.soc_end_sd)?;
    let convenience = beta(
        "behavioral.convenience",
        behavioral.convenience_alpha,
        behavioral.convenience_beta,
    )?;
    let flexibility = beta(
        "behavioral.flexibility",
        behavioral.flexibility_alpha,
        behavioral.flexibility_beta,
    )?;

    let mut agents = Vec::with_capacity(vehicles.num_vehicles);
    for id in 0..vehicles.num_vehicles {
        let class = VehicleClass::ALL[class_dist.sample(rng)];
        let battery_kwh = vehicles.battery_kwh_options[battery_dist.sample(rng)];
        let max_charge_kw = vehicles.charge_kw_options[charge_dist.sample(rng)];

        let efficiency_km_per_kwh = sample_truncated(
            &efficiency,
            vehicles.efficiency_min,
            vehicles.efficiency_max,
            rng,
        );
        let km = sample_truncated(&annual_km, vehicles.annual_km_min, vehicles.annual_km_max, rng);
        let (start, end) = sample_soc_pair(&soc_start, &soc_end, rng);

        agents.push(Agent {
            id: id as u32,
            class,
            battery_kwh,
            max_charge_kw,
            efficiency_km_per_kwh,
            annual_km: km,
            daily_km: km / 365.0,
            home_access: rng.random_bool(vehicles.home_access_prob),
            work_access: rng.random_bool(vehicles.work_access_prob),
            soc_start: start,
            soc_end: end,
            convenience: convenience.sample(rng),
            flexibility: flexibility.sample(rng),
        });
    }
    Ok(agents)
}

/// Builds a weighted index, renormalizing (with a diagnostic) when the
/// weights do not sum to 1. Weights already summing to 1 pass through
/// untouched so repeated generation introduces no drift.
fn weighted_index(field: &str, weights: &[f64]) -> Result<WeightedIndex<f64>, SimError> {
    let sum: f64 = weights.iter().sum();
    let normalized: Vec<f64>;
    let effective = if (sum - 1.0).abs() > 1e-9 {
        warn!(field, sum, "selection weights do not sum to 1, renormalizing");
        normalized = weights.iter().map(|w| w / sum).collect();
        &normalized[..]
    } else {
        weights
    };
    WeightedIndex::new(effective.iter().copied())
        .map_err(|e| SimError::config(field, e.to_string()))
}

fn normal(field: &str, mean: f64, sd: f64) -> Result<Normal<f64>, SimError> {
    Normal::new(mean, sd).map_err(|e| SimError::config(field, e.to_string()))
}

fn beta(field: &str, alpha: f64, b: f64) -> Result<Beta<f64>, SimError> {
    Beta::new(alpha, b).map_err(|e| SimError::config(field, e.to_string()))
}

/// Truncated-normal sample by rejection, clamping after the retry budget.
fn sample_truncated(dist: &Normal<f64>, lo: f64, hi: f64, rng: &mut StdRng) -> f64 {
    for _ in 0..TRUNC_ATTEMPTS {
        let x = dist.sample(rng);
        if (lo..=hi).contains(&x) {
            return x;
        }
    }
    dist.mean().clamp(lo, hi)
}

/// Samples the (soc_start, soc_end) pair, re-sampling on `start >= end`
/// violations. After the retry budget the pair is forced apart
/// deterministically.
fn sample_soc_pair(start: &Normal<f64>, end: &Normal<f64>, rng: &mut StdRng) -> (f64, f64) {
    for _ in 0..SOC_PAIR_ATTEMPTS {
        let s = sample_truncated(start, 0.0, 1.0, rng);
        let e = sample_truncated(end, 0.0, 1.0, rng);
        if s < e {
            return (s, e);
        }
    }
    let e = end.mean().clamp(0.05, 1.0);
    (e - 0.05, e)
}
