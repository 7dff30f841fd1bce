//! Incremental series writer
//!
//! The header is written when the file is created and every row is flushed
//! as soon as it is appended, so an interrupted run leaves a valid prefix on
//! disk.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gravtime_core::{
    GravtimeError, GravtimeResult, PersistenceFault, SeriesId, SimulationRecord, SERIES_HEADER,
};

use crate::format::{format_row, series_file_name};

/// Append-only CSV writer for one series
#[derive(Debug)]
pub struct SeriesWriter {
    id: SeriesId,
    path: PathBuf,
    out: Option<BufWriter<File>>,
    rows: usize,
    durable: bool,
}

impl SeriesWriter {
    /// Create `dilation_series_<id>.csv` inside `dir`
    ///
    /// Fails if the file already exists.
    pub fn create(dir: impl AsRef<Path>, id: &SeriesId) -> GravtimeResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| GravtimeError::io(0, e))?;
        Self::create_at(dir.join(series_file_name(id)), id.clone())
    }

    /// Create a series file at an explicit path
    pub fn create_at(path: impl Into<PathBuf>, id: SeriesId) -> GravtimeResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| GravtimeError::io(0, e))?;

        let mut out = BufWriter::new(file);
        writeln!(out, "{}", SERIES_HEADER).map_err(|e| GravtimeError::io(0, e))?;
        out.flush().map_err(|e| GravtimeError::io(0, e))?;

        tracing::debug!(path = %path.display(), "series file created");

        Ok(SeriesWriter {
            id,
            path,
            out: Some(out),
            rows: 0,
            durable: false,
        })
    }

    /// Sync each row to the device, not just the OS
    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn id(&self) -> &SeriesId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_finalized(&self) -> bool {
        self.out.is_none()
    }

    /// Write and flush one row
    pub fn append(&mut self, record: &SimulationRecord) -> GravtimeResult<()> {
        let row = self.rows + 1;
        let out = self.out.as_mut().ok_or(GravtimeError::Persistence {
            row,
            fault: PersistenceFault::Closed,
        })?;

        writeln!(out, "{}", format_row(record)).map_err(|e| GravtimeError::io(row, e))?;
        out.flush().map_err(|e| GravtimeError::io(row, e))?;
        if self.durable {
            out.get_ref()
                .sync_data()
                .map_err(|e| GravtimeError::io(row, e))?;
        }

        self.rows = row;
        Ok(())
    }

    /// Flush, sync and close; idempotent
    pub fn finalize(&mut self) -> GravtimeResult<()> {
        let Some(mut out) = self.out.take() else {
            return Ok(());
        };
        let row = self.rows;
        out.flush().map_err(|e| GravtimeError::io(row, e))?;
        out.get_ref()
            .sync_all()
            .map_err(|e| GravtimeError::io(row, e))?;

        tracing::debug!(path = %self.path.display(), rows = self.rows, "series file closed");
        Ok(())
    }
}
