//! CSV export of simulation results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::engine::SimulationOutcome;

/// Column header for the mean-profile export.
const PROFILE_HEADER: &str = "bucket,time_hr,mean_raw_kw,mean_adjusted_kw";

/// Exports the mean demand profile to a CSV file at the given path.
///
/// One row per bucket, averaging the raw and adjusted series across all
/// successful replications. Deterministic for identical outcomes.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_profile_csv(outcome: &SimulationOutcome, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_profile_csv(outcome, buf)
}

/// Writes the mean demand profile as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_profile_csv(outcome: &SimulationOutcome, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(PROFILE_HEADER.split(','))?;

    let Some(first) = outcome.replications.first() else {
        wtr.flush()?;
        return Ok(());
    };
    let buckets = first.raw.values.len();
    let bucket_hours = first.raw.horizon.bucket_hours();
    let n = outcome.replications.len() as f64;

    for b in 0..buckets {
        let mut raw_sum = 0.0;
        let mut adj_sum = 0.0;
        for r in &outcome.replications {
            raw_sum += r.raw.values[b];
            adj_sum += r.adjusted.values[b];
        }
        wtr.write_record(&[
            b.to_string(),
            format!("{:.2}", b as f64 * bucket_hours),
            format!("{:.4}", raw_sum / n),
            format!("{:.4}", adj_sum / n),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::sim::engine::run;

    fn outcome() -> SimulationOutcome {
        let mut cfg = SimulationConfig::baseline();
        cfg.vehicles.num_vehicles = 10;
        cfg.simulation.monte_carlo_runs = 3;
        run(&cfg).expect("small config runs")
    }

    #[test]
    fn header_and_row_count() {
        let out = outcome();
        let mut buf = Vec::new();
        write_profile_csv(&out, &mut buf).expect("export should succeed");
        let text = String::from_utf8(buf).expect("valid UTF-8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(PROFILE_HEADER));
        assert_eq!(lines.count(), 96);
    }

    #[test]
    fn adjusted_column_below_raw_column() {
        let out = outcome();
        let mut buf = Vec::new();
        write_profile_csv(&out, &mut buf).expect("export should succeed");
        let text = String::from_utf8(buf).expect("valid UTF-8");
        for line in text.lines().skip(1) {
            let cols: Vec<&str> = line.split(',').collect();
            let raw: f64 = cols[2].parse().expect("numeric raw column");
            let adj: f64 = cols[3].parse().expect("numeric adjusted column");
            assert!(adj <= raw + 1e-9);
        }
    }

    #[test]
    fn deterministic_output() {
        let out = outcome();
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_profile_csv(&out, &mut a).expect("first export");
        write_profile_csv(&out, &mut b).expect("second export");
        assert_eq!(a, b);
    }
}
