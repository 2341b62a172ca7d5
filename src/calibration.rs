//! Calibration: derives configuration overrides from empirical consumption.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};
use serde::Deserialize;
use tracing::warn;

use crate::config::SimulationConfig;
use crate::error::SimError;

/// Minimum number of valid readings for a reliable calibration.
pub const MIN_VALID_READINGS: usize = 24;
/// Assumed daily consumption per vehicle (kWh/day), roughly 40 km at
/// 5 km/kWh.
pub const ASSUMED_DAILY_KWH_PER_VEHICLE: f64 = 8.0;
/// Practical cap on the fleet-size estimate.
pub const MAX_FLEET_SIZE: usize = 500_000;

/// One empirical smart-meter reading.
#[derive(Debug, Clone, Deserialize)]
pub struct EmpiricalReading {
    /// Meter identifier.
    pub meter_id: String,
    /// Reading timestamp (naive local time).
    pub timestamp: NaiveDateTime,
    /// Consumption over the reading interval (kWh).
    pub consumption_kwh: f64,
}

/// Write-once configuration overlay derived from empirical data.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Estimated fleet size (observed / assumed daily consumption).
    pub estimated_fleet_size: usize,
    /// Hour of day with the highest average consumption.
    pub peak_hour: u32,
    /// Hour of day with the lowest average consumption.
    pub valley_hour: u32,
    /// Ratio of observed to assumed totals at the estimated fleet size.
    pub scaling_factor: f64,
    /// Aggregate observed daily consumption across meters (kWh/day).
    pub observed_daily_kwh: f64,
}

impl CalibrationResult {
    /// Overlays the derived fleet size onto a base configuration.
    /// The input configuration is the only thing mutated; empirical data is
    /// never touched.
    pub fn apply(&self, config: &mut SimulationConfig) {
        config.vehicles.num_vehicles = self.estimated_fleet_size;
    }
}

/// Estimates fleet size, peak/valley hour, and a scaling factor from
/// empirical consumption records. The input is not mutated.
///
/// Readings with non-finite or negative consumption are skipped with a
/// diagnostic; they do not count toward the validity minimum.
///
/// # Errors
///
/// Returns [`SimError::InsufficientData`] when fewer than [`MIN_VALID_READINGS`]
/// valid readings are present. Callers are expected to fall back to the
/// default configuration.
pub fn calibrate(readings: &[EmpiricalReading]) -> Result<CalibrationResult, SimError> {
    let mut valid = Vec::with_capacity(readings.len());
    for r in readings {
        if r.consumption_kwh.is_finite() && r.consumption_kwh >= 0.0 {
            valid.push(r);
        } else {
            warn!(
                meter = %r.meter_id,
                value = r.consumption_kwh,
                "skipping reading with invalid consumption"
            );
        }
    }
    if valid.len() < MIN_VALID_READINGS {
        return Err(SimError::InsufficientData {
            needed: MIN_VALID_READINGS,
            got: valid.len(),
        });
    }

    // Total observed consumption per calendar day, aggregated across meters.
    let mut daily_totals: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
    let mut hourly_sums = [0.0_f64; 24];
    let mut hourly_counts = [0usize; 24];
    for r in &valid {
        *daily_totals.entry(r.timestamp.date()).or_insert(0.0) += r.consumption_kwh;
        let hour = r.timestamp.hour() as usize;
        hourly_sums[hour] += r.consumption_kwh;
        hourly_counts[hour] += 1;
    }

    let observed_daily_kwh =
        daily_totals.values().sum::<f64>() / daily_totals.len() as f64;

    let raw_estimate = (observed_daily_kwh / ASSUMED_DAILY_KWH_PER_VEHICLE).round();
    let estimated_fleet_size = (raw_estimate.max(1.0) as usize).min(MAX_FLEET_SIZE);

    let mut hourly_avg = [0.0_f64; 24];
    for h in 0..24 {
        if hourly_counts[h] > 0 {
            hourly_avg[h] = hourly_sums[h] / hourly_counts[h] as f64;
        }
    }
    let mut peak_hour = 0usize;
    let mut valley_hour = 0usize;
    for (h, v) in hourly_avg.iter().enumerate() {
        if *v > hourly_avg[peak_hour] {
            peak_hour = h;
        }
        if *v < hourly_avg[valley_hour] {
            valley_hour = h;
        }
    }

    let scaling_factor =
        observed_daily_kwh / (estimated_fleet_size as f64 * ASSUMED_DAILY_KWH_PER_VEHICLE);

    Ok(CalibrationResult {
        estimated_fleet_size,
        peak_hour: peak_hour as u32,
        valley_hour: valley_hour as u32,
        scaling_factor,
        observed_daily_kwh,
    })
}
