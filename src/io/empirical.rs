//! CSV ingestion of empirical meter readings and demand series.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::calibration::EmpiricalReading;
use crate::error::SimError;

/// Reads empirical meter readings from a CSV file with columns
/// `meter_id,timestamp,consumption_kwh`.
///
/// # Errors
///
/// Returns a `DataFormatError` naming the offending record if the file
/// cannot be read or a row is malformed.
pub fn read_empirical_csv(path: &Path) -> Result<Vec<EmpiricalReading>, SimError> {
    let file = File::open(path).map_err(|e| {
        SimError::DataFormat(format!("cannot open \"{}\": {e}", path.display()))
    })?;
    read_empirical(file)
}

/// Reads empirical meter readings from any CSV reader.
///
/// # Errors
///
/// Returns a `DataFormatError` naming the offending record on malformed
/// rows (bad timestamp, missing field, non-numeric consumption).
pub fn read_empirical<R: Read>(reader: R) -> Result<Vec<EmpiricalReading>, SimError> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    let mut readings = Vec::new();
    for (i, record) in rdr.deserialize::<EmpiricalReading>().enumerate() {
        let reading =
            record.map_err(|e| SimError::DataFormat(format!("record {}: {e}", i + 1)))?;
        readings.push(reading);
    }
    Ok(readings)
}

#[derive(Debug, Deserialize)]
struct SeriesRow {
    power_kw: f64,
}

/// Reads a single-column demand series (`power_kw` header) from a CSV file.
///
/// # Errors
///
/// Returns a `DataFormatError` on unreadable files or non-numeric rows.
pub fn read_series_csv(path: &Path) -> Result<Vec<f64>, SimError> {
    let file = File::open(path).map_err(|e| {
        SimError::DataFormat(format!("cannot open \"{}\": {e}", path.display()))
    })?;
    read_series(file)
}

/// Reads a single-column demand series from any CSV reader.
///
/// # Errors
///
/// Returns a `DataFormatError` naming the offending record.
pub fn read_series<R: Read>(reader: R) -> Result<Vec<f64>, SimError> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
    let mut values = Vec::new();
    for (i, record) in rdr.deserialize::<SeriesRow>().enumerate() {
        let row = record.map_err(|e| SimError::DataFormat(format!("record {}: {e}", i + 1)))?;
        values.push(row.power_kw);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_readings() {
        let csv = "meter_id,timestamp,consumption_kwh\n\
                   m1,2025-03-01T08:00:00,1.5\n\
                   m2,2025-03-01T09:00:00,2.25\n";
        let readings = read_empirical(csv.as_bytes()).expect("well-formed CSV");
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].meter_id, "m1");
        assert_eq!(readings[1].consumption_kwh, 2.25);
    }

    #[test]
    fn malformed_timestamp_is_data_format_error() {
        let csv = "meter_id,timestamp,consumption_kwh\n\
                   m1,not-a-timestamp,1.5\n";
        let err = read_empirical(csv.as_bytes());
        assert!(matches!(err, Err(SimError::DataFormat(_))));
        assert!(err.unwrap_err().to_string().contains("record 1"));
    }

    #[test]
    fn missing_field_is_data_format_error() {
        let csv = "meter_id,timestamp,consumption_kwh\n\
                   m1,2025-03-01T08:00:00\n";
        assert!(matches!(
            read_empirical(csv.as_bytes()),
            Err(SimError::DataFormat(_))
        ));
    }

    #[test]
    fn parses_series_column() {
        let csv = "power_kw\n1.0\n2.5\n0.0\n";
        let series = read_series(csv.as_bytes()).expect("well-formed CSV");
        assert_eq!(series, vec![1.0, 2.5, 0.0]);
    }

    #[test]
    fn non_numeric_series_row_rejected() {
        let csv = "power_kw\nabc\n";
        assert!(matches!(
            read_series(csv.as_bytes()),
            Err(SimError::DataFormat(_))
        ));
    }
}
