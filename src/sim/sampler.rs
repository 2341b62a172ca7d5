//! Per-agent stochastic charging event sampling.

use std::fmt;

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Weibull};

use crate::config::{ChargingConfig, LocationConfig};
use crate::error::SimError;
use crate::population::Agent;

/// Charging location kind. Closed set so every location is handled
/// exhaustively at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingLocation {
    Home,
    Work,
    Public,
}

impl ChargingLocation {
    /// All locations, in sampling order.
    pub const ALL: [Self; 3] = [Self::Home, Self::Work, Self::Public];
}

impl fmt::Display for ChargingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Home => "home",
            Self::Work => "work",
            Self::Public => "public",
        };
        f.write_str(s)
    }
}

/// One sampled charging session. Ephemeral: folded into the agent's bucket
/// vector immediately after sampling, never persisted.
#[derive(Debug, Clone)]
pub struct ChargingSession {
    /// Location kind the session was sampled for.
    pub location: ChargingLocation,
    /// Simulated day index.
    pub day: usize,
    /// Start hour within the day, in [0, 24].
    pub start_hr: f64,
    /// Duration in hours; `start_hr + duration_hr` never exceeds 24.
    pub duration_hr: f64,
    /// Charging power (kW) — the agent's maximum charging power.
    pub power_kw: f64,
}

/// Distribution bundle for one location kind.
#[derive(Debug, Clone)]
struct LocationModel {
    location: ChargingLocation,
    probability: f64,
    start_hr: Normal<f64>,
    duration_hr: Weibull<f64>,
}

impl LocationModel {
    fn from_config(
        location: ChargingLocation,
        cfg: &LocationConfig,
    ) -> Result<Self, SimError> {
        let start_hr = Normal::new(cfg.start_mean_hr, cfg.start_sd_hr)
            .map_err(|e| SimError::config(format!("charging.{location}.start"), e.to_string()))?;
        let duration_hr = Weibull::new(cfg.duration_scale, cfg.duration_shape).map_err(|e| {
            SimError::config(format!("charging.{location}.duration"), e.to_string())
        })?;
        if !(0.0..=1.0).contains(&cfg.probability) {
            return Err(SimError::config(
                format!("charging.{location}.probability"),
                "must be in [0, 1]",
            ));
        }
        Ok(Self {
            location,
            probability: cfg.probability,
            start_hr,
            duration_hr,
        })
    }
}

/// Samples charging sessions for agents, one simulated day at a time.
///
/// Constructed once per run; malformed distribution parameters surface here
/// as a `ConfigurationError` before any sampling begins, not per agent.
#[derive(Debug, Clone)]
pub struct SessionSampler {
    home: LocationModel,
    work: LocationModel,
    public: LocationModel,
}

impl SessionSampler {
    /// Builds the sampler from the charging configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` for non-positive Weibull parameters,
    /// non-positive start-hour spread, or out-of-range probabilities.
    pub fn from_config(cfg: &ChargingConfig) -> Result<Self, SimError> {
        Ok(Self {
            home: LocationModel::from_config(ChargingLocation::Home, &cfg.home)?,
            work: LocationModel::from_config(ChargingLocation::Work, &cfg.work)?,
            public: LocationModel::from_config(ChargingLocation::Public, &cfg.public)?,
        })
    }

    /// Samples zero or more sessions for one agent on one day.
    ///
    /// Each location is gated by the agent's access flag AND a Bernoulli
    /// draw against the location's probability. Accepted sessions draw a
    /// start hour (clipped to [0, 24]) and a Weibull duration; a session
    /// that would run past midnight is clipped to day-end, never wrapping
    /// into the next day. An empty vector is a valid outcome.
    pub fn sample_day(&self, agent: &Agent, day: usize, rng: &mut StdRng) -> Vec<ChargingSession> {
        let mut sessions = Vec::new();
        for model in [&self.home, &self.work, &self.public] {
            let has_access = match model.location {
                ChargingLocation::Home => agent.home_access,
                ChargingLocation::Work => agent.work_access,
                ChargingLocation::Public => true,
            };
            if !has_access || !rng.random_bool(model.probability) {
                continue;
            }

            let start_hr = model.start_hr.sample(rng).clamp(0.0, 24.0);
            let duration_hr = model.duration_hr.sample(rng).min(24.0 - start_hr);
            if duration_hr <= 0.0 {
                continue;
            }

            sessions.push(ChargingSession {
                location: model.location,
                day,
                start_hr,
                duration_hr,
                power_kw: agent.max_charge_kw,
            });
        }
        sessions
    }
}
