//! Simulation horizon and fixed-resolution demand time series.

use crate::error::SimError;

/// Simulation horizon: day count and bucket resolution.
///
/// All series in one run share a horizon, so bucket arithmetic lives here
/// rather than being recomputed per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    /// Number of simulated days.
    pub days: usize,
    /// Bucket resolution in minutes; must divide 1440.
    pub resolution_min: u32,
}

impl Horizon {
    /// Creates a horizon.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if `days` is zero or `resolution_min`
    /// does not divide a day evenly.
    pub fn new(days: usize, resolution_min: u32) -> Result<Self, SimError> {
        if days == 0 {
            return Err(SimError::config("simulation.days", "must be > 0"));
        }
        if resolution_min == 0 || 1440 % resolution_min != 0 {
            return Err(SimError::config(
                "simulation.resolution_min",
                "must divide 1440 evenly",
            ));
        }
        Ok(Self {
            days,
            resolution_min,
        })
    }

    /// Buckets per simulated day.
    pub fn buckets_per_day(&self) -> usize {
        (1440 / self.resolution_min) as usize
    }

    /// Total buckets across all days.
    pub fn total_buckets(&self) -> usize {
        self.days * self.buckets_per_day()
    }

    /// Duration of one bucket in hours.
    pub fn bucket_hours(&self) -> f64 {
        f64::from(self.resolution_min) / 60.0
    }
}

/// Ordered sequence of nonnegative power values, one per bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    /// Horizon this series was composed for.
    pub horizon: Horizon,
    /// Power per bucket (kW).
    pub values: Vec<f64>,
}

impl DemandSeries {
    /// An all-zero series over the horizon.
    pub fn zeros(horizon: Horizon) -> Self {
        Self {
            values: vec![0.0; horizon.total_buckets()],
            horizon,
        }
    }

    /// Mean power across all buckets (kW).
    pub fn mean_kw(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Maximum bucket power (kW).
    pub fn peak_kw(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Minimum bucket power (kW).
    pub fn min_kw(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Total energy over the horizon (kWh).
    pub fn energy_kwh(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.horizon.bucket_hours()
    }

    /// Returns a copy with every bucket multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            horizon: self.horizon,
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Average power per hour of day, folded across all days (24 entries).
    /// A bucket spanning multiple hours contributes to each covered hour in
    /// proportion to the overlap, so the profile is correct at any valid
    /// resolution, coarser than hourly included.
    pub fn hourly_profile(&self) -> [f64; 24] {
        let mut sums = [0.0_f64; 24];
        let mut minutes = [0.0_f64; 24];
        let bpd = self.horizon.buckets_per_day();
        let res = u64::from(self.horizon.resolution_min);
        for (i, v) in self.values.iter().enumerate() {
            let start_min = (i % bpd) as u64 * res;
            let end_min = start_min + res;
            let mut h = start_min / 60;
            while h * 60 < end_min {
                let lo = start_min.max(h * 60);
                let hi = end_min.min((h + 1) * 60);
                let overlap = (hi - lo) as f64;
                sums[h as usize] += v * overlap;
                minutes[h as usize] += overlap;
                h += 1;
            }
        }
        let mut out = [0.0_f64; 24];
        for h in 0..24 {
            if minutes[h] > 0.0 {
                out[h] = sums[h] / minutes[h];
            }
        }
        out
    }

    /// True if every bucket is finite and nonnegative.
    pub fn is_well_formed(&self) -> bool {
        self.values.iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}
