//! Row encoding and decoding

use std::str::FromStr;

use bigdecimal::BigDecimal;

use gravtime_core::{
    fixed, GravtimeError, GravtimeResult, PersistenceFault, SeriesId, SimulationRecord,
    DIFFERENCE_SCALE, DILATED_TIME_SCALE, EARTH_TIME_SCALE, QUANTUM_TIME_SCALE, SERIES_HEADER,
};

/// Number of columns per row
pub const COLUMN_COUNT: usize = 5;

/// Column names, in order
pub const COLUMNS: [&str; COLUMN_COUNT] = [
    "Altitude(m)",
    "Earth_Time(s)",
    "Dilated_Time(s)",
    "Quantum_Time(s)",
    "Difference(ns)",
];

/// File name prefix of persisted series
pub const FILE_PREFIX: &str = "dilation_series_";

/// File name for a series: `dilation_series_<id>.csv`
pub fn series_file_name(id: &SeriesId) -> String {
    format!("{}{}.csv", FILE_PREFIX, id)
}

/// Recover the series id from a file name, falling back to the bare stem
pub fn series_id_from_file_name(name: &str) -> SeriesId {
    let stem = name.strip_suffix(".csv").unwrap_or(name);
    SeriesId::new(stem.strip_prefix(FILE_PREFIX).unwrap_or(stem))
}

/// Encode one record (no trailing newline)
pub fn format_row(record: &SimulationRecord) -> String {
    format!(
        "{},{},{},{},{}",
        record.altitude,
        fixed(&record.earth_time, EARTH_TIME_SCALE),
        fixed(&record.dilated_time, DILATED_TIME_SCALE),
        fixed(&record.quantum_time, QUANTUM_TIME_SCALE),
        fixed(&record.difference_ns, DIFFERENCE_SCALE),
    )
}

/// Check the header line
pub fn check_header(line: &str) -> GravtimeResult<()> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line != SERIES_HEADER {
        return Err(GravtimeError::Persistence {
            row: 0,
            fault: PersistenceFault::Header(line.to_string()),
        });
    }
    Ok(())
}

fn field_error(row: usize, column: usize, value: &str) -> GravtimeError {
    GravtimeError::Persistence {
        row,
        fault: PersistenceFault::Field {
            column: COLUMNS[column],
            value: value.to_string(),
        },
    }
}

/// `-?digits(.digits)?`; the format never uses exponents
fn is_plain_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    digits(int_part) && frac_part.map_or(true, digits)
}

fn parse_decimal(row: usize, column: usize, value: &str) -> GravtimeResult<BigDecimal> {
    if !is_plain_decimal(value) {
        return Err(field_error(row, column, value));
    }
    BigDecimal::from_str(value).map_err(|_| field_error(row, column, value))
}

/// Decode one data row; `row` is used for error reporting only
pub fn parse_row(row: usize, line: &str) -> GravtimeResult<SimulationRecord> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != COLUMN_COUNT {
        return Err(GravtimeError::Persistence {
            row,
            fault: PersistenceFault::FieldCount {
                expected: COLUMN_COUNT,
                actual: fields.len(),
            },
        });
    }

    let altitude = fields[0]
        .parse::<u64>()
        .map_err(|_| field_error(row, 0, fields[0]))?;

    Ok(SimulationRecord {
        altitude,
        earth_time: parse_decimal(row, 1, fields[1])?,
        dilated_time: parse_decimal(row, 2, fields[2])?,
        quantum_time: parse_decimal(row, 3, fields[3])?,
        difference_ns: parse_decimal(row, 4, fields[4])?,
    })
}
