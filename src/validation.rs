//! Validation: error and correlation metrics between simulated and
//! empirical demand series.

use std::fmt;

use crate::error::SimError;

/// Comparison metrics between one simulated and one empirical series.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationMetrics {
    /// Mean absolute error (kW).
    pub mae: f64,
    /// Root-mean-square error (kW).
    pub rmse: f64,
    /// Mean absolute percentage error (%). Buckets where the empirical
    /// value is exactly zero are excluded from this metric to avoid
    /// division by zero; they still contribute to MAE/RMSE/bias.
    pub mape_pct: f64,
    /// Pearson correlation coefficient, in [−1, 1]. Zero when either
    /// series has no variance.
    pub correlation: f64,
    /// Bias: mean(simulated) − mean(empirical) (kW).
    pub bias: f64,
    /// Number of aligned buckets compared (the shorter series length).
    pub sample_count: usize,
}

impl fmt::Display for ValidationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Validation Metrics ---")?;
        writeln!(f, "MAE:          {:.3} kW", self.mae)?;
        writeln!(f, "RMSE:         {:.3} kW", self.rmse)?;
        writeln!(f, "MAPE:         {:.1}%", self.mape_pct)?;
        writeln!(f, "Correlation:  {:.3}", self.correlation)?;
        writeln!(f, "Bias:         {:.3} kW", self.bias)?;
        write!(f, "Samples:      {}", self.sample_count)
    }
}

/// Compares a simulated series against an empirical one.
///
/// Both series are truncated to the shorter length before comparison. Pure
/// function: no side effects, inputs untouched.
///
/// # Errors
///
/// Returns `DataFormatError` if either series is empty or contains
/// non-finite values.
pub fn validate_series(simulated: &[f64], empirical: &[f64]) -> Result<ValidationMetrics, SimError> {
    let n = simulated.len().min(empirical.len());
    if n == 0 {
        return Err(SimError::DataFormat(
            "cannot validate against an empty series".into(),
        ));
    }
    let sim = &simulated[..n];
    let real = &empirical[..n];
    if sim.iter().chain(real).any(|v| !v.is_finite()) {
        return Err(SimError::DataFormat(
            "series contain non-finite values".into(),
        ));
    }

    let nf = n as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut ape_sum = 0.0;
    let mut ape_count = 0usize;
    for (s, r) in sim.iter().zip(real) {
        let err = s - r;
        abs_sum += err.abs();
        sq_sum += err * err;
        if *r != 0.0 {
            ape_sum += (err / r).abs();
            ape_count += 1;
        }
    }

    let sim_mean = sim.iter().sum::<f64>() / nf;
    let real_mean = real.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut sim_var = 0.0;
    let mut real_var = 0.0;
    for (s, r) in sim.iter().zip(real) {
        let ds = s - sim_mean;
        let dr = r - real_mean;
        cov += ds * dr;
        sim_var += ds * ds;
        real_var += dr * dr;
    }
    let correlation = if sim_var > 0.0 && real_var > 0.0 {
        (cov / (sim_var.sqrt() * real_var.sqrt())).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    Ok(ValidationMetrics {
        mae: abs_sum / nf,
        rmse: (sq_sum / nf).sqrt(),
        mape_pct: if ape_count > 0 {
            100.0 * ape_sum / ape_count as f64
        } else {
            0.0
        },
        correlation,
        bias: sim_mean - real_mean,
        sample_count: n,
    })
}
