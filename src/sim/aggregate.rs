//! Monte Carlo aggregation: online summary statistics over replications.

use std::fmt;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::SimError;
use crate::sim::series::{DemandSeries, Horizon};

/// Output of one completed replication.
#[derive(Debug, Clone)]
pub struct ReplicationResult {
    /// Replication index.
    pub replication: usize,
    /// Raw (pre-diversity) aggregate series.
    pub raw: DemandSeries,
    /// Adjusted (post-diversity) series.
    pub adjusted: DemandSeries,
    /// Coincidence factor applied to this replication.
    pub coincidence_factor: f64,
}

/// Welford online mean/variance accumulator with an associative merge, so
/// replications can be combined in any completion order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Folds one observation in.
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Merges another accumulator (Chan et al. parallel combination).
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let total = (self.count + other.count) as f64;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / total;
        self.m2 += other.m2 + delta * delta * self.count as f64 * other.count as f64 / total;
        self.count += other.count;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (n − 1 denominator); zero below two observations.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Summary record over all successful replications.
#[derive(Debug, Clone)]
pub struct SummaryStats {
    /// Replications that contributed to the statistics.
    pub runs_completed: usize,
    /// Replications excluded after a scenario execution failure.
    pub runs_failed: usize,
    /// Mean of per-replication mean demand (kW).
    pub mean_demand_kw: f64,
    /// Maximum bucket power across all replications (kW).
    pub peak_demand_kw: f64,
    /// Minimum bucket power across all replications (kW).
    pub min_demand_kw: f64,
    /// Standard deviation of per-replication peak demand (kW).
    pub peak_sd_kw: f64,
    /// Load factor: mean demand over peak demand.
    pub load_factor: f64,
    /// Lower bound of the peak-demand confidence interval (kW).
    pub ci_lower_kw: f64,
    /// Upper bound of the peak-demand confidence interval (kW).
    pub ci_upper_kw: f64,
    /// Confidence level the interval was computed at.
    pub confidence_level: f64,
    /// Average coincidence factor across replications.
    pub avg_coincidence_factor: f64,
    /// Mean daily energy over the horizon (kWh/day).
    pub mean_daily_energy_kwh: f64,
    /// Hour of day with the highest mean adjusted demand.
    pub peak_hour: u32,
    /// Hour of day with the lowest mean adjusted demand.
    pub valley_hour: u32,
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Monte Carlo Summary ---")?;
        writeln!(
            f,
            "Replications:          {} completed, {} failed",
            self.runs_completed, self.runs_failed
        )?;
        writeln!(f, "Mean demand:           {:.2} kW", self.mean_demand_kw)?;
        writeln!(f, "Peak demand:           {:.2} kW", self.peak_demand_kw)?;
        writeln!(f, "Min demand:            {:.2} kW", self.min_demand_kw)?;
        writeln!(f, "Peak std dev:          {:.2} kW", self.peak_sd_kw)?;
        writeln!(
            f,
            "Peak CI ({:.0}%):         [{:.2}, {:.2}] kW",
            self.confidence_level * 100.0,
            self.ci_lower_kw,
            self.ci_upper_kw
        )?;
        writeln!(f, "Load factor:           {:.3}", self.load_factor)?;
        writeln!(
            f,
            "Avg coincidence:       {:.4}",
            self.avg_coincidence_factor
        )?;
        writeln!(
            f,
            "Mean daily energy:     {:.1} kWh/day",
            self.mean_daily_energy_kwh
        )?;
        write!(
            f,
            "Peak hour: {:02}:00    Valley hour: {:02}:00",
            self.peak_hour, self.valley_hour
        )
    }
}

/// Streaming aggregator over replication results.
///
/// Holds only running accumulators and the online mean profile, never the
/// replication series themselves, so replications can be folded in and
/// discarded as they complete.
#[derive(Debug, Clone)]
pub struct Aggregator {
    horizon: Horizon,
    profile_mean: Vec<f64>,
    mean_stats: RunningStats,
    peak_stats: RunningStats,
    energy_stats: RunningStats,
    fc_stats: RunningStats,
    global_max: f64,
    global_min: f64,
}

impl Aggregator {
    pub fn new(horizon: Horizon) -> Self {
        Self {
            horizon,
            profile_mean: vec![0.0; horizon.total_buckets()],
            mean_stats: RunningStats::default(),
            peak_stats: RunningStats::default(),
            energy_stats: RunningStats::default(),
            fc_stats: RunningStats::default(),
            global_max: f64::NEG_INFINITY,
            global_min: f64::INFINITY,
        }
    }

    /// Folds one replication's adjusted series into the running statistics.
    pub fn push(&mut self, result: &ReplicationResult) {
        let s = &result.adjusted;
        self.mean_stats.push(s.mean_kw());
        self.peak_stats.push(s.peak_kw());
        self.energy_stats.push(s.energy_kwh() / self.horizon.days as f64);
        self.fc_stats.push(result.coincidence_factor);
        self.global_max = self.global_max.max(s.peak_kw());
        self.global_min = self.global_min.min(s.min_kw());

        // Online mean of the adjusted profile across replications.
        let n = self.mean_stats.count() as f64;
        for (m, v) in self.profile_mean.iter_mut().zip(&s.values) {
            *m += (v - *m) / n;
        }
    }

    /// Mean adjusted profile across the replications folded in so far.
    pub fn mean_profile(&self) -> DemandSeries {
        DemandSeries {
            horizon: self.horizon,
            values: self.profile_mean.clone(),
        }
    }

    /// Finalizes the summary record.
    ///
    /// # Errors
    ///
    /// Returns `Fatal` if no replication contributed.
    pub fn finalize(
        &self,
        confidence_level: f64,
        runs_failed: usize,
    ) -> Result<SummaryStats, SimError> {
        let runs = self.mean_stats.count();
        if runs == 0 {
            return Err(SimError::Fatal(
                "no successful replications to aggregate".into(),
            ));
        }

        let mean_demand_kw = self.mean_stats.mean();
        let peak_demand_kw = self.global_max;
        let load_factor = if peak_demand_kw > 0.0 {
            mean_demand_kw / peak_demand_kw
        } else {
            0.0
        };

        // Normal approximation across replication peaks.
        let z = standard_normal_quantile(0.5 + confidence_level / 2.0)?;
        let half_width = z * self.peak_stats.std_dev() / (runs as f64).sqrt();
        let peak_mean = self.peak_stats.mean();

        let profile = self.mean_profile().hourly_profile();
        let (peak_hour, valley_hour) = extreme_hours(&profile);

        Ok(SummaryStats {
            runs_completed: runs,
            runs_failed,
            mean_demand_kw,
            peak_demand_kw,
            min_demand_kw: self.global_min,
            peak_sd_kw: self.peak_stats.std_dev(),
            load_factor,
            ci_lower_kw: peak_mean - half_width,
            ci_upper_kw: peak_mean + half_width,
            confidence_level,
            avg_coincidence_factor: self.fc_stats.mean(),
            mean_daily_energy_kwh: self.energy_stats.mean(),
            peak_hour,
            valley_hour,
        })
    }
}

fn standard_normal_quantile(p: f64) -> Result<f64, SimError> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| SimError::Fatal(format!("standard normal unavailable: {e}")))?;
    Ok(normal.inverse_cdf(p))
}

fn extreme_hours(profile: &[f64; 24]) -> (u32, u32) {
    let mut peak = 0usize;
    let mut valley = 0usize;
    for (h, v) in profile.iter().enumerate() {
        if *v > profile[peak] {
            peak = h;
        }
        if *v < profile[valley] {
            valley = h;
        }
    }
    (peak as u32, valley as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(horizon: Horizon, values: Vec<f64>) -> DemandSeries {
        DemandSeries { horizon, values }
    }

    fn result(replication: usize, horizon: Horizon, values: Vec<f64>) -> ReplicationResult {
        let raw = series(horizon, values);
        let (adjusted, fc) = crate::sim::coincidence::adjust(&raw, 100);
        ReplicationResult {
            replication,
            raw,
            adjusted,
            coincidence_factor: fc,
        }
    }

    #[test]
    fn welford_matches_direct_computation() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut stats = RunningStats::default();
        for x in xs {
            stats.push(x);
        }
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        // Sample variance of the series is 32/7.
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn welford_merge_is_associative() {
        let xs: Vec<f64> = (0..20).map(|i| (i as f64) * 0.7 - 3.0).collect();
        let mut whole = RunningStats::default();
        for x in &xs {
            whole.push(*x);
        }

        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        for x in &xs[..7] {
            left.push(*x);
        }
        for x in &xs[7..] {
            right.push(*x);
        }
        let mut merged = left;
        merged.merge(&right);

        assert_eq!(merged.count(), whole.count());
        assert!((merged.mean() - whole.mean()).abs() < 1e-10);
        assert!((merged.variance() - whole.variance()).abs() < 1e-10);
    }

    #[test]
    fn summary_orderings_hold() {
        let h = Horizon::new(1, 360).expect("valid horizon"); // 4 buckets
        let mut agg = Aggregator::new(h);
        agg.push(&result(0, h, vec![1.0, 5.0, 3.0, 2.0]));
        agg.push(&result(1, h, vec![2.0, 4.0, 6.0, 1.0]));
        let summary = agg.finalize(0.95, 0).expect("nonempty aggregation");

        assert!(summary.peak_demand_kw >= summary.mean_demand_kw);
        assert!(summary.mean_demand_kw >= summary.min_demand_kw);
        assert!(summary.min_demand_kw >= 0.0);
        assert!(summary.load_factor > 0.0 && summary.load_factor <= 1.0);
        assert!(summary.ci_lower_kw <= summary.ci_upper_kw);
        assert_eq!(summary.runs_completed, 2);
    }

    #[test]
    fn aggregation_is_order_independent_in_value() {
        let h = Horizon::new(1, 360).expect("valid horizon");
        let a = result(0, h, vec![1.0, 5.0, 3.0, 2.0]);
        let b = result(1, h, vec![2.0, 4.0, 6.0, 1.0]);

        let mut ab = Aggregator::new(h);
        ab.push(&a);
        ab.push(&b);
        let mut ba = Aggregator::new(h);
        ba.push(&b);
        ba.push(&a);

        let s1 = ab.finalize(0.95, 0).expect("nonempty");
        let s2 = ba.finalize(0.95, 0).expect("nonempty");
        assert!((s1.mean_demand_kw - s2.mean_demand_kw).abs() < 1e-12);
        assert!((s1.peak_sd_kw - s2.peak_sd_kw).abs() < 1e-12);
        assert_eq!(s1.peak_demand_kw, s2.peak_demand_kw);
    }

    #[test]
    fn empty_aggregation_is_fatal() {
        let h = Horizon::new(1, 60).expect("valid horizon");
        let agg = Aggregator::new(h);
        assert!(agg.finalize(0.95, 3).is_err());
    }

    #[test]
    fn peak_hour_correct_at_coarse_resolution() {
        let h = Horizon::new(1, 120).expect("valid horizon"); // 12 buckets
        let mut values = vec![1.0; 12];
        values[11] = 9.0; // 22:00–24:00
        let mut agg = Aggregator::new(h);
        agg.push(&result(0, h, values));
        let summary = agg.finalize(0.95, 0).expect("nonempty");
        // The loaded bucket covers hours 22 and 23; the scan picks the first.
        assert_eq!(summary.peak_hour, 22);
    }

    #[test]
    fn peak_and_valley_hours_from_profile() {
        let h = Horizon::new(1, 60).expect("valid horizon");
        let mut values = vec![1.0; 24];
        values[19] = 10.0;
        values[4] = 0.1;
        let mut agg = Aggregator::new(h);
        agg.push(&result(0, h, values));
        let summary = agg.finalize(0.95, 0).expect("nonempty");
        assert_eq!(summary.peak_hour, 19);
        assert_eq!(summary.valley_hour, 4);
    }
}
