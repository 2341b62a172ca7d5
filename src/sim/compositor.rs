//! Timeseries composition: sessions → per-agent vectors → raw aggregate.

use rand::rngs::StdRng;

use crate::population::Agent;
use crate::sim::sampler::{ChargingSession, SessionSampler};
use crate::sim::series::{DemandSeries, Horizon};

/// Adds a session's power to every bucket it covers in the full-horizon
/// vector. The covered range is `[floor(start), ceil(end))` at the horizon
/// resolution, offset by the session's day.
pub fn fold_session(buckets: &mut [f64], session: &ChargingSession, horizon: Horizon) {
    let bpd = horizon.buckets_per_day();
    let per_hour = bpd as f64 / 24.0;

    let start = ((session.start_hr * per_hour).floor() as usize).min(bpd.saturating_sub(1));
    let end_hr = session.start_hr + session.duration_hr;
    let end = ((end_hr * per_hour).ceil() as usize).min(bpd);

    let offset = session.day * bpd;
    for bucket in &mut buckets[offset + start..offset + end] {
        *bucket += session.power_kw;
    }
}

/// Bucket-wise accumulation of one agent vector into the aggregate.
/// Commutative and associative, so the aggregate is independent of agent
/// iteration order.
pub fn accumulate(target: &mut [f64], source: &[f64]) {
    debug_assert_eq!(target.len(), source.len());
    for (t, s) in target.iter_mut().zip(source) {
        *t += s;
    }
}

/// Composes the raw (pre-diversity) aggregate series for one scenario.
///
/// For each agent and each day, sessions are sampled and folded into the
/// agent's vector; agent vectors are then summed bucket-wise.
pub fn compose_raw_series(
    population: &[Agent],
    sampler: &SessionSampler,
    horizon: Horizon,
    rng: &mut StdRng,
) -> DemandSeries {
    let mut aggregate = DemandSeries::zeros(horizon);
    let mut agent_vec = vec![0.0_f64; horizon.total_buckets()];

    for agent in population {
        agent_vec.fill(0.0);
        for day in 0..horizon.days {
            for session in sampler.sample_day(agent, day, rng) {
                fold_session(&mut agent_vec, &session, horizon);
            }
        }
        accumulate(&mut aggregate.values, &agent_vec);
    }
    aggregate
}
