//! TOML-based simulation configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::SimError;

/// Top-level simulation configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from TOML
/// with [`SimulationConfig::from_toml_file`] or use
/// [`SimulationConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Vehicle population parameters.
    #[serde(default)]
    pub vehicles: VehiclesConfig,
    /// Simulation horizon and Monte Carlo parameters.
    #[serde(default)]
    pub simulation: SimulationSection,
    /// Per-location charging event parameters.
    #[serde(default)]
    pub charging: ChargingConfig,
    /// Behavioral attribute distribution parameters.
    #[serde(default)]
    pub behavioral: BehavioralConfig,
}

/// Vehicle population parameters.
///
/// Categorical attributes are drawn by weighted discrete sampling; the
/// `*_options` and `*_weights` vectors must have equal nonzero length.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VehiclesConfig {
    /// Number of vehicle agents to generate (must be > 0).
    pub num_vehicles: usize,
    /// Selection weights for vehicle classes, one per
    /// [`VehicleClass`](crate::population::VehicleClass) in declaration order
    /// (compact, sedan, suv).
    pub class_weights: Vec<f64>,
    /// Battery capacity options (kWh).
    pub battery_kwh_options: Vec<f64>,
    /// Selection weights for battery capacity options.
    pub battery_kwh_weights: Vec<f64>,
    /// Maximum charging power options (kW).
    pub charge_kw_options: Vec<f64>,
    /// Selection weights for charging power options.
    pub charge_kw_weights: Vec<f64>,
    /// Mean driving efficiency (km/kWh).
    pub efficiency_mean: f64,
    /// Efficiency standard deviation.
    pub efficiency_sd: f64,
    /// Lower truncation bound for efficiency.
    pub efficiency_min: f64,
    /// Upper truncation bound for efficiency.
    pub efficiency_max: f64,
    /// Mean annual mileage (km/yr).
    pub annual_km_mean: f64,
    /// Annual mileage standard deviation.
    pub annual_km_sd: f64,
    /// Lower truncation bound for annual mileage.
    pub annual_km_min: f64,
    /// Upper truncation bound for annual mileage.
    pub annual_km_max: f64,
    /// Probability that an agent has home charging access.
    pub home_access_prob: f64,
    /// Probability that an agent has workplace charging access.
    pub work_access_prob: f64,
}

impl Default for VehiclesConfig {
    fn default() -> Self {
        Self {
            num_vehicles: 100,
            class_weights: vec![0.35, 0.45, 0.20],
            battery_kwh_options: vec![40.0, 60.0, 80.0, 100.0],
            battery_kwh_weights: vec![0.25, 0.40, 0.25, 0.10],
            charge_kw_options: vec![3.7, 7.4, 11.0, 22.0],
            charge_kw_weights: vec![0.15, 0.45, 0.30, 0.10],
            efficiency_mean: 6.0,
            efficiency_sd: 1.0,
            efficiency_min: 3.0,
            efficiency_max: 9.0,
            annual_km_mean: 15_000.0,
            annual_km_sd: 5_000.0,
            annual_km_min: 5_000.0,
            annual_km_max: 50_000.0,
            home_access_prob: 0.8,
            work_access_prob: 0.4,
        }
    }
}

/// Simulation horizon and Monte Carlo parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Time bucket resolution in minutes (must divide 1440).
    pub resolution_min: u32,
    /// Number of Monte Carlo replications (must be > 0).
    pub monte_carlo_runs: usize,
    /// Master random seed.
    pub seed: u64,
    /// Confidence level for the peak-demand interval (0 < level < 1).
    pub confidence_level: f64,
    /// Maximum tolerated fraction of failed replications before the whole
    /// run aborts (0.0–1.0).
    pub max_failed_fraction: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            days: 1,
            resolution_min: 15,
            monte_carlo_runs: 100,
            seed: 42,
            confidence_level: 0.95,
            max_failed_fraction: 0.5,
        }
    }
}

/// Distribution parameters for one charging location kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    /// Daily probability of a charging session at this location.
    pub probability: f64,
    /// Mean session start hour (0–24).
    pub start_mean_hr: f64,
    /// Session start hour standard deviation.
    pub start_sd_hr: f64,
    /// Weibull shape parameter for session duration (must be > 0).
    pub duration_shape: f64,
    /// Weibull scale parameter for session duration in hours (must be > 0).
    pub duration_scale: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            probability: 0.5,
            start_mean_hr: 19.0,
            start_sd_hr: 2.0,
            duration_shape: 2.0,
            duration_scale: 3.0,
        }
    }
}

/// Per-location charging event parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChargingConfig {
    /// Home charging parameters.
    pub home: LocationConfig,
    /// Workplace charging parameters.
    pub work: LocationConfig,
    /// Public charging parameters.
    pub public: LocationConfig,
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            home: LocationConfig {
                probability: 0.6,
                start_mean_hr: 19.0,
                start_sd_hr: 2.0,
                duration_shape: 2.0,
                duration_scale: 4.0,
            },
            work: LocationConfig {
                probability: 0.3,
                start_mean_hr: 9.0,
                start_sd_hr: 1.5,
                duration_shape: 2.5,
                duration_scale: 3.0,
            },
            public: LocationConfig {
                probability: 0.1,
                start_mean_hr: 13.0,
                start_sd_hr: 4.0,
                duration_shape: 1.5,
                duration_scale: 1.0,
            },
        }
    }
}

/// Behavioral attribute distribution parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehavioralConfig {
    /// Mean SOC threshold below which charging is considered (0–1).
    pub soc_start_mean: f64,
    /// SOC-start threshold standard deviation.
    pub soc_start_sd: f64,
    /// Mean target SOC at end of charging (0–1).
    pub soc_end_mean: f64,
    /// SOC-end threshold standard deviation.
    pub soc_end_sd: f64,
    /// Beta shape α for the convenience factor.
    pub convenience_alpha: f64,
    /// Beta shape β for the convenience factor.
    pub convenience_beta: f64,
    /// Beta shape α for time flexibility.
    pub flexibility_alpha: f64,
    /// Beta shape β for time flexibility.
    pub flexibility_beta: f64,
}

impl Default for BehavioralConfig {
    fn default() -> Self {
        Self {
            soc_start_mean: 0.3,
            soc_start_sd: 0.1,
            soc_end_mean: 0.9,
            soc_end_sd: 0.05,
            convenience_alpha: 2.0,
            convenience_beta: 2.0,
            flexibility_alpha: 2.0,
            flexibility_beta: 3.0,
        }
    }
}

impl SimulationConfig {
    /// Returns the baseline configuration (100 vehicles, one 15-minute day,
    /// 100 replications).
    pub fn baseline() -> Self {
        Self {
            vehicles: VehiclesConfig::default(),
            simulation: SimulationSection::default(),
            charging: ChargingConfig::default(),
            behavioral: BehavioralConfig::default(),
        }
    }

    /// Returns the large-fleet preset: 5000 vehicles over a week at hourly
    /// resolution, fewer replications.
    pub fn large_fleet() -> Self {
        Self {
            vehicles: VehiclesConfig {
                num_vehicles: 5000,
                ..VehiclesConfig::default()
            },
            simulation: SimulationSection {
                days: 7,
                resolution_min: 60,
                monte_carlo_runs: 30,
                ..SimulationSection::default()
            },
            charging: ChargingConfig::default(),
            behavioral: BehavioralConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "large_fleet"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, SimError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "large_fleet" => Ok(Self::large_fleet()),
            _ => Err(SimError::config(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the file cannot be read or the TOML
    /// is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, SimError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SimError::config("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the TOML is invalid or contains
    /// unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, SimError> {
        toml::from_str(s).map_err(|e| SimError::config("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid. Validation is
    /// eager: the engine rejects the whole run before any scenario executes.
    pub fn validate(&self) -> Vec<SimError> {
        let mut errors = Vec::new();
        let v = &self.vehicles;

        if v.num_vehicles == 0 {
            errors.push(SimError::config("vehicles.num_vehicles", "must be > 0"));
        }
        check_weights(&mut errors, "vehicles.class_weights", &v.class_weights, 3);
        check_options(
            &mut errors,
            "vehicles.battery_kwh",
            &v.battery_kwh_options,
            &v.battery_kwh_weights,
        );
        check_options(
            &mut errors,
            "vehicles.charge_kw",
            &v.charge_kw_options,
            &v.charge_kw_weights,
        );
        check_truncated(
            &mut errors,
            "vehicles.efficiency",
            v.efficiency_sd,
            v.efficiency_min,
            v.efficiency_max,
        );
        check_truncated(
            &mut errors,
            "vehicles.annual_km",
            v.annual_km_sd,
            v.annual_km_min,
            v.annual_km_max,
        );
        check_probability(&mut errors, "vehicles.home_access_prob", v.home_access_prob);
        check_probability(&mut errors, "vehicles.work_access_prob", v.work_access_prob);

        let s = &self.simulation;
        if s.days == 0 {
            errors.push(SimError::config("simulation.days", "must be > 0"));
        }
        if s.resolution_min == 0 || 1440 % s.resolution_min != 0 {
            errors.push(SimError::config(
                "simulation.resolution_min",
                "must divide 1440 evenly",
            ));
        }
        if s.monte_carlo_runs == 0 {
            errors.push(SimError::config("simulation.monte_carlo_runs", "must be > 0"));
        }
        if !(s.confidence_level > 0.0 && s.confidence_level < 1.0) {
            errors.push(SimError::config(
                "simulation.confidence_level",
                "must be in (0, 1)",
            ));
        }
        if !(0.0..=1.0).contains(&s.max_failed_fraction) {
            errors.push(SimError::config(
                "simulation.max_failed_fraction",
                "must be in [0, 1]",
            ));
        }

        for (name, loc) in [
            ("charging.home", &self.charging.home),
            ("charging.work", &self.charging.work),
            ("charging.public", &self.charging.public),
        ] {
            check_probability(&mut errors, &format!("{name}.probability"), loc.probability);
            if loc.start_sd_hr <= 0.0 {
                errors.push(SimError::config(format!("{name}.start_sd_hr"), "must be > 0"));
            }
            if !(0.0..=24.0).contains(&loc.start_mean_hr) {
                errors.push(SimError::config(
                    format!("{name}.start_mean_hr"),
                    "must be in [0, 24]",
                ));
            }
            if loc.duration_shape <= 0.0 {
                errors.push(SimError::config(
                    format!("{name}.duration_shape"),
                    "must be > 0",
                ));
            }
            if loc.duration_scale <= 0.0 {
                errors.push(SimError::config(
                    format!("{name}.duration_scale"),
                    "must be > 0",
                ));
            }
        }

        let b = &self.behavioral;
        for (field, mean, sd) in [
            ("behavioral.soc_start", b.soc_start_mean, b.soc_start_sd),
            ("behavioral.soc_end", b.soc_end_mean, b.soc_end_sd),
        ] {
            if !(0.0..=1.0).contains(&mean) {
                errors.push(SimError::config(
                    format!("{field}_mean"),
                    "must be in [0, 1]",
                ));
            }
            if sd <= 0.0 {
                errors.push(SimError::config(format!("{field}_sd"), "must be > 0"));
            }
        }
        if b.soc_start_mean >= b.soc_end_mean {
            errors.push(SimError::config(
                "behavioral.soc_start_mean",
                "must be < behavioral.soc_end_mean",
            ));
        }
        for (field, value) in [
            ("behavioral.convenience_alpha", b.convenience_alpha),
            ("behavioral.convenience_beta", b.convenience_beta),
            ("behavioral.flexibility_alpha", b.flexibility_alpha),
            ("behavioral.flexibility_beta", b.flexibility_beta),
        ] {
            if value <= 0.0 {
                errors.push(SimError::config(field, "must be > 0"));
            }
        }

        errors
    }

    /// Eager validation entry point: first error wins.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigurationError` found, if any.
    pub fn validated(&self) -> Result<(), SimError> {
        match self.validate().into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn check_probability(errors: &mut Vec<SimError>, field: &str, p: f64) {
    if !(0.0..=1.0).contains(&p) {
        errors.push(SimError::config(field, "must be in [0, 1]"));
    }
}

fn check_truncated(errors: &mut Vec<SimError>, field: &str, sd: f64, min: f64, max: f64) {
    if sd <= 0.0 {
        errors.push(SimError::config(format!("{field}_sd"), "must be > 0"));
    }
    if min >= max {
        errors.push(SimError::config(
            format!("{field}_min"),
            format!("must be < {field}_max"),
        ));
    }
}

fn check_weights(errors: &mut Vec<SimError>, field: &str, weights: &[f64], expected_len: usize) {
    if weights.len() != expected_len {
        errors.push(SimError::config(
            field,
            format!("expected {expected_len} weights, got {}", weights.len()),
        ));
        return;
    }
    check_weight_values(errors, field, weights);
}

fn check_options(errors: &mut Vec<SimError>, field: &str, options: &[f64], weights: &[f64]) {
    if options.is_empty() {
        errors.push(SimError::config(
            format!("{field}_options"),
            "must not be empty",
        ));
        return;
    }
    if options.len() != weights.len() {
        errors.push(SimError::config(
            format!("{field}_weights"),
            format!(
                "length {} does not match {} options",
                weights.len(),
                options.len()
            ),
        ));
        return;
    }
    if options.iter().any(|&o| o <= 0.0 || !o.is_finite()) {
        errors.push(SimError::config(
            format!("{field}_options"),
            "all options must be finite and > 0",
        ));
    }
    check_weight_values(errors, &format!("{field}_weights"), weights);
}

fn check_weight_values(errors: &mut Vec<SimError>, field: &str, weights: &[f64]) {
    if weights.iter().any(|&w| w < 0.0 || !w.is_finite()) {
        errors.push(SimError::config(field, "weights must be finite and >= 0"));
    } else if weights.iter().sum::<f64>() <= 0.0 {
        errors.push(SimError::config(field, "weights must not all be zero"));
    }
}
