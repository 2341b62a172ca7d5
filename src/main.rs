//! EV demand simulator entry point — CLI wiring and run orchestration.

use std::path::Path;
use std::process;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use ev_demand_sim::calibration::calibrate;
use ev_demand_sim::config::SimulationConfig;
use ev_demand_sim::error::SimError;
use ev_demand_sim::io::empirical::{read_empirical_csv, read_series_csv};
use ev_demand_sim::io::export::export_profile_csv;
use ev_demand_sim::sim::engine::run;
use ev_demand_sim::validation::validate_series;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    runs_override: Option<usize>,
    calibrate_path: Option<String>,
    validate_path: Option<String>,
    profile_out: Option<String>,
}

fn print_help() {
    eprintln!("ev-demand-sim — Agent-based Monte Carlo EV charging demand simulator");
    eprintln!();
    eprintln!("Usage: ev-demand-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>       Load configuration from TOML file");
    eprintln!("  --preset <name>       Use a built-in preset (baseline, large_fleet)");
    eprintln!("  --seed <u64>          Override random seed");
    eprintln!("  --runs <n>            Override Monte Carlo replication count");
    eprintln!("  --calibrate <path>    Derive fleet size from empirical meter CSV");
    eprintln!("  --validate <path>     Compare mean profile against empirical series CSV");
    eprintln!("  --out <path>          Export mean demand profile to CSV");
    eprintln!("  --help                Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        seed_override: None,
        runs_override: None,
        calibrate_path: None,
        validate_path: None,
        profile_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                cli.config_path = Some(take_value(&args, &mut i, "--config", "a path"));
            }
            "--preset" => {
                cli.preset = Some(take_value(&args, &mut i, "--preset", "a name"));
            }
            "--seed" => {
                let raw = take_value(&args, &mut i, "--seed", "a u64");
                match raw.parse::<u64>() {
                    Ok(s) => cli.seed_override = Some(s),
                    Err(_) => {
                        eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                        process::exit(1);
                    }
                }
            }
            "--runs" => {
                let raw = take_value(&args, &mut i, "--runs", "a count");
                match raw.parse::<usize>() {
                    Ok(r) => cli.runs_override = Some(r),
                    Err(_) => {
                        eprintln!("error: --runs value \"{raw}\" is not a valid count");
                        process::exit(1);
                    }
                }
            }
            "--calibrate" => {
                cli.calibrate_path = Some(take_value(&args, &mut i, "--calibrate", "a path"));
            }
            "--validate" => {
                cli.validate_path = Some(take_value(&args, &mut i, "--validate", "a path"));
            }
            "--out" => {
                cli.profile_out = Some(take_value(&args, &mut i, "--out", "a path"));
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn take_value(args: &[String], i: &mut usize, flag: &str, expected: &str) -> String {
    *i += 1;
    match args.get(*i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires {expected} argument");
            process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_args();

    // Load config: --config takes priority, then --preset, then baseline.
    let mut config = if let Some(ref path) = cli.config_path {
        match SimulationConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match SimulationConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        SimulationConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        config.simulation.seed = seed;
    }
    if let Some(runs) = cli.runs_override {
        config.simulation.monte_carlo_runs = runs;
    }

    // Calibration runs once, before scenario execution. Insufficient data
    // falls back to the configured defaults; anything else is fatal here.
    if let Some(ref path) = cli.calibrate_path {
        match read_empirical_csv(Path::new(path)).and_then(|readings| calibrate(&readings)) {
            Ok(result) => {
                println!(
                    "Calibration: fleet={} peak_hour={:02}:00 scaling={:.3}",
                    result.estimated_fleet_size, result.peak_hour, result.scaling_factor
                );
                result.apply(&mut config);
            }
            Err(e @ SimError::InsufficientData { .. }) => {
                warn!(error = %e, "calibration skipped, using configured defaults");
            }
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let outcome = match run(&config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    println!("{}", outcome.summary);

    if let Some(ref path) = cli.validate_path {
        let metrics = read_series_csv(Path::new(path))
            .and_then(|empirical| validate_series(&outcome.mean_adjusted_profile(), &empirical));
        match metrics {
            Ok(m) => println!("\n{m}"),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    }

    if let Some(ref path) = cli.profile_out {
        if let Err(e) = export_profile_csv(&outcome, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Profile written to {path}");
    }
}
