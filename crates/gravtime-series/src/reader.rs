//! Series reader

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use gravtime_core::{GravtimeError, GravtimeResult, SeriesId, SimulationSeries};

use crate::format::{check_header, parse_row, series_id_from_file_name};

/// Read a persisted series
///
/// A missing or zero-byte file is an input error. A header with no rows is an
/// empty series. Blank lines are skipped.
pub fn read_series(path: impl AsRef<Path>) -> GravtimeResult<SimulationSeries> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            GravtimeError::input(format!("series file not found: {}", path.display()))
        }
        _ => GravtimeError::io(0, e),
    })?;

    let id = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(series_id_from_file_name)
        .unwrap_or_else(|| SeriesId::new(path.display().to_string()));

    let series = parse_series(id, BufReader::new(file))?;
    tracing::debug!(path = %path.display(), rows = series.len(), "series loaded");
    Ok(series)
}

/// Parse a series from any buffered source
pub fn parse_series<R: BufRead>(id: SeriesId, source: R) -> GravtimeResult<SimulationSeries> {
    let mut lines = source.lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| GravtimeError::io(0, e))?,
        None => return Err(GravtimeError::input(format!("series {} is empty", id))),
    };
    check_header(&header)?;

    let mut series = SimulationSeries::new(id);
    let mut row = 0;
    for line in lines {
        let line = line.map_err(|e| GravtimeError::io(row + 1, e))?;
        if line.trim().is_empty() {
            continue;
        }
        row += 1;
        series.append(parse_row(row, &line)?)?;
    }

    series.finalize();
    Ok(series)
}
