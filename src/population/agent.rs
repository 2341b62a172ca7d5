//! Static vehicle agent attributes.

use std::fmt;

/// Vehicle size class, drawn by weighted discrete sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleClass {
    Compact,
    Sedan,
    Suv,
}

impl VehicleClass {
    /// All classes, in the order matching `vehicles.class_weights`.
    pub const ALL: [Self; 3] = [Self::Compact, Self::Sedan, Self::Suv];
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Compact => "compact",
            Self::Sedan => "sedan",
            Self::Suv => "suv",
        };
        f.write_str(s)
    }
}

/// One simulated EV with fixed static attributes.
///
/// Created once by the population generator, shared by reference across all
/// Monte Carlo replications, and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Stable identifier within the population.
    pub id: u32,
    /// Vehicle size class.
    pub class: VehicleClass,
    /// Battery capacity (kWh).
    pub battery_kwh: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Driving efficiency (km/kWh).
    pub efficiency_km_per_kwh: f64,
    /// Annual mileage (km/yr).
    pub annual_km: f64,
    /// Daily distance derived as `annual_km / 365`.
    pub daily_km: f64,
    /// Whether the agent has home charging access.
    pub home_access: bool,
    /// Whether the agent has workplace charging access.
    pub work_access: bool,
    /// SOC threshold below which charging is considered (0–1).
    pub soc_start: f64,
    /// Target SOC at end of charging (0–1); always > `soc_start`.
    pub soc_end: f64,
    /// Convenience factor (0–1), Beta-distributed.
    pub convenience: f64,
    /// Time flexibility (0–1), Beta-distributed.
    pub flexibility: f64,
}

impl Agent {
    /// Energy needed to move from the start threshold to the target SOC (kWh).
    pub fn charge_window_kwh(&self) -> f64 {
        (self.soc_end - self.soc_start) * self.battery_kwh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_window_uses_soc_span() {
        let agent = Agent {
            id: 0,
            class: VehicleClass::Sedan,
            battery_kwh: 60.0,
            max_charge_kw: 11.0,
            efficiency_km_per_kwh: 6.0,
            annual_km: 15_000.0,
            daily_km: 15_000.0 / 365.0,
            home_access: true,
            work_access: false,
            soc_start: 0.3,
            soc_end: 0.9,
            convenience: 0.5,
            flexibility: 0.5,
        };
        assert!((agent.charge_window_kwh() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn class_display_is_lowercase() {
        assert_eq!(VehicleClass::Suv.to_string(), "suv");
        assert_eq!(VehicleClass::ALL.len(), 3);
    }
}
