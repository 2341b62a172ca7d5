//! Dynamic diversity (coincidence) correction.

use crate::sim::series::DemandSeries;

/// Asymptotic coincidence factor for very large fleets.
pub const FC_BASE: f64 = 0.222;
/// Amplitude of the fleet-size-dependent term.
pub const FC_AMPLITUDE: f64 = 0.036;
/// Exponential decay rate per vehicle.
pub const FC_DECAY: f64 = 3.0e-4;

/// Coincidence factor FC(n) = 0.222 + 0.036·e^(−0.0003·n).
///
/// For n > 0 the value lies in (0.222, 0.258] and is strictly decreasing in
/// the fleet size: naively summed demand overstates simultaneity, and the
/// overstatement grows with the fleet.
pub fn coincidence_factor(fleet_size: usize) -> f64 {
    FC_BASE + FC_AMPLITUDE * (-FC_DECAY * fleet_size as f64).exp()
}

/// Applies the diversity correction to a raw aggregate series.
///
/// Returns the adjusted series together with the scalar factor applied.
/// Deterministic, O(series length).
pub fn adjust(raw: &DemandSeries, fleet_size: usize) -> (DemandSeries, f64) {
    let factor = coincidence_factor(fleet_size);
    (raw.scaled(factor), factor)
}
