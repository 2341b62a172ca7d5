//! End-to-end integration tests for the Monte Carlo engine.

mod common;

use ev_demand_sim::sim::engine::run;

#[test]
fn reference_scenario_produces_expected_shape() {
    let outcome = run(&common::reference_config()).expect("reference config runs");
    assert_eq!(outcome.replications.len(), 5);
    assert!(outcome.failures.is_empty());
    for r in &outcome.replications {
        assert_eq!(r.raw.values.len(), 96);
        assert_eq!(r.adjusted.values.len(), 96);
        assert!(r.coincidence_factor > 0.222 && r.coincidence_factor <= 0.258);
    }
}

#[test]
fn summary_satisfies_demand_orderings() {
    let outcome = run(&common::reference_config()).expect("reference config runs");
    let s = &outcome.summary;
    assert!(s.peak_demand_kw >= s.mean_demand_kw);
    assert!(s.mean_demand_kw >= s.min_demand_kw);
    assert!(s.min_demand_kw >= 0.0);
    assert!(s.load_factor > 0.0 && s.load_factor <= 1.0);
    assert!(s.ci_lower_kw <= s.ci_upper_kw);
    assert!(s.peak_hour < 24 && s.valley_hour < 24);
    assert_eq!(s.runs_completed, 5);
    assert_eq!(s.runs_failed, 0);
}

#[test]
fn determinism_two_identical_runs_produce_identical_summaries() {
    let cfg = common::reference_config();
    let a = run(&cfg).expect("first run");
    let b = run(&cfg).expect("second run");

    assert_eq!(a.summary.mean_demand_kw, b.summary.mean_demand_kw);
    assert_eq!(a.summary.peak_demand_kw, b.summary.peak_demand_kw);
    assert_eq!(a.summary.min_demand_kw, b.summary.min_demand_kw);
    assert_eq!(a.summary.peak_sd_kw, b.summary.peak_sd_kw);
    assert_eq!(a.summary.ci_lower_kw, b.summary.ci_lower_kw);
    assert_eq!(a.summary.peak_hour, b.summary.peak_hour);
    for (x, y) in a.replications.iter().zip(&b.replications) {
        assert_eq!(x.raw.values, y.raw.values);
        assert_eq!(x.adjusted.values, y.adjusted.values);
    }
}

#[test]
fn determinism_is_independent_of_worker_count() {
    let cfg = common::reference_config();

    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .expect("single-thread pool")
        .install(|| run(&cfg))
        .expect("single-thread run");

    let multi = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("multi-thread pool")
        .install(|| run(&cfg))
        .expect("multi-thread run");

    assert_eq!(single.summary.mean_demand_kw, multi.summary.mean_demand_kw);
    assert_eq!(single.summary.peak_demand_kw, multi.summary.peak_demand_kw);
    assert_eq!(single.summary.peak_sd_kw, multi.summary.peak_sd_kw);
    assert_eq!(single.summary.ci_lower_kw, multi.summary.ci_lower_kw);
    for (x, y) in single.replications.iter().zip(&multi.replications) {
        assert_eq!(x.replication, y.replication);
        assert_eq!(x.adjusted.values, y.adjusted.values);
    }
}

#[test]
fn different_seeds_produce_different_demand() {
    let mut cfg_a = common::reference_config();
    let mut cfg_b = common::reference_config();
    cfg_a.simulation.seed = 1;
    cfg_b.simulation.seed = 2;
    let a = run(&cfg_a).expect("run with seed 1");
    let b = run(&cfg_b).expect("run with seed 2");
    assert_ne!(
        a.replications[0].raw.values, b.replications[0].raw.values,
        "different seeds should produce different series"
    );
}

#[test]
fn multi_day_horizon_scales_series_length() {
    let mut cfg = common::reference_config();
    cfg.simulation.days = 3;
    cfg.simulation.resolution_min = 60;
    let outcome = run(&cfg).expect("multi-day config runs");
    assert_eq!(outcome.replications[0].adjusted.values.len(), 72);
}
