//! Monte Carlo replication descriptors and deterministic stream seeding.

use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::sim::series::Horizon;

/// Reserved stream index for population generation, outside the replication
/// index range.
pub const POPULATION_STREAM: u64 = u64::MAX;

/// Derives an independent stream seed from (global seed, stream index).
///
/// SplitMix64 finalizer over the xor of seed and index, so every stream is a
/// pure function of those two values — never of wall-clock time, worker
/// identity, or scheduling order. This is what makes results reproducible
/// under any parallel execution width. The generator fed by these seeds is
/// `StdRng` (ChaCha12 in rand 0.9).
pub fn stream_seed(global_seed: u64, index: u64) -> u64 {
    let mut z = global_seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Lifecycle state of one replication. No back-transitions; a failure from
/// `Created` or `Sampled` moves to `Failed` and the replication is excluded
/// from aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Created,
    Sampled,
    Composed,
    Adjusted,
    Aggregated,
    Discarded,
    Failed,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Sampled => "sampled",
            Self::Composed => "composed",
            Self::Adjusted => "adjusted",
            Self::Aggregated => "aggregated",
            Self::Discarded => "discarded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One Monte Carlo replication descriptor.
///
/// References the shared population by index only; carries its own seed and
/// horizon. Executed exactly once, then discarded.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Replication index within the run.
    pub replication: usize,
    /// Independent stream seed derived from (global seed, replication).
    pub seed: u64,
    /// Simulation horizon shared by all replications.
    pub horizon: Horizon,
    /// Current lifecycle state.
    pub state: ScenarioState,
}

impl Scenario {
    /// Instantiates this scenario's random generator.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }
}

/// Builds `runs` scenario descriptors with independently seeded streams.
pub fn build_scenarios(horizon: Horizon, global_seed: u64, runs: usize) -> Vec<Scenario> {
    (0..runs)
        .map(|i| Scenario {
            replication: i,
            seed: stream_seed(global_seed, i as u64),
            horizon,
            state: ScenarioState::Created,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_seed_is_pure_and_distinct() {
        assert_eq!(stream_seed(42, 0), stream_seed(42, 0));
        assert_ne!(stream_seed(42, 0), stream_seed(42, 1));
        assert_ne!(stream_seed(42, 0), stream_seed(43, 0));
    }

    #[test]
    fn stream_seed_reference_values() {
        // Pinned literals for the reference seed, so any accidental change
        // to the mix constants or the seeding scheme is caught immediately.
        assert_eq!(stream_seed(42, 0), 0xA759_EA27_D472_7622);
        assert_eq!(stream_seed(42, 1), 0xBDD7_3226_2FEB_6E95);
        assert_eq!(stream_seed(42, POPULATION_STREAM), 0xDB5F_670C_90A3_E40E);
    }

    #[test]
    fn population_stream_does_not_collide_with_replications() {
        let pop = stream_seed(42, POPULATION_STREAM);
        for i in 0..1000 {
            assert_ne!(pop, stream_seed(42, i));
        }
    }

    #[test]
    fn build_scenarios_indexes_and_seeds() {
        let h = Horizon::new(1, 15).expect("valid horizon");
        let scenarios = build_scenarios(h, 7, 5);
        assert_eq!(scenarios.len(), 5);
        for (i, s) in scenarios.iter().enumerate() {
            assert_eq!(s.replication, i);
            assert_eq!(s.seed, stream_seed(7, i as u64));
            assert_eq!(s.state, ScenarioState::Created);
        }
    }
}
