//! Result ledger
//!
//! An append-only CSV log of evaluated testcases plus an in-memory skip-set
//! rebuilt from the first column on load. The file is the only state that
//! survives a restart; rows are never rewritten in place.

use crate::error::Result;
use crate::outcome::RunResult;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How to open the ledger at pass start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    /// Truncate and write a fresh header
    Fresh,
    /// Keep existing rows and skip their testcases
    Resume,
    /// Keep existing rows but skip nothing; later points of a sweep
    Append,
}

/// Column layout of the ledger
///
/// Always `Model,Result,FPS`, then `CPU,Power,Temperature` for telemetry,
/// then `Frequency,Voltage,Thermal` for the operating point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerColumns {
    /// Averaged telemetry columns
    pub telemetry: bool,
    /// Operating-point columns
    pub operating_point: bool,
}

impl LedgerColumns {
    /// `Model,Result,FPS`
    pub const BASIC: Self = Self {
        telemetry: false,
        operating_point: false,
    };

    /// `Model,Result,FPS,CPU,Power,Temperature`
    pub const WITH_TELEMETRY: Self = Self {
        telemetry: true,
        operating_point: false,
    };

    /// Same layout, with or without operating-point columns
    #[must_use]
    pub const fn with_operating_point(mut self, on: bool) -> Self {
        self.operating_point = on;
        self
    }

    /// Header fields
    pub fn header(self) -> Vec<&'static str> {
        let mut fields = vec!["Model", "Result", "FPS"];
        if self.telemetry {
            fields.extend(["CPU", "Power", "Temperature"]);
        }
        if self.operating_point {
            fields.extend(["Frequency", "Voltage", "Thermal"]);
        }
        fields
    }
}

/// Row as read back for reporting
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LedgerRow {
    /// Testcase identity
    #[serde(rename = "Model")]
    pub model: String,
    /// Outcome label
    #[serde(rename = "Result", default)]
    pub result: String,
    /// Frames per second; `None` when empty or not a number
    #[serde(rename = "FPS", default, deserialize_with = "csv::invalid_option")]
    pub fps: Option<f64>,
    /// MPU clock in MHz, when the ledger has operating-point columns
    #[serde(rename = "Frequency", default, deserialize_with = "csv::invalid_option")]
    pub frequency_mhz: Option<f64>,
    /// Core supply in mV
    #[serde(rename = "Voltage", default, deserialize_with = "csv::invalid_option")]
    pub voltage_mv: Option<f64>,
}

/// Persisted ledger state
pub struct Ledger {
    path: PathBuf,
    columns: LedgerColumns,
    evaluated: BTreeSet<String>,
    writer: csv::Writer<File>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("path", &self.path)
            .field("columns", &self.columns)
            .field("evaluated", &self.evaluated.len())
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Open the ledger for a pass
    ///
    /// `Fresh`, or a missing file, truncates and writes the header with an
    /// empty skip-set. `Resume` reads the existing rows first. `Append`
    /// keeps the rows with an empty skip-set.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or created.
    pub fn open(path: impl Into<PathBuf>, mode: LedgerMode, columns: LedgerColumns) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let fresh = mode == LedgerMode::Fresh || !path.is_file();
        let evaluated = if fresh {
            let mut w = csv::Writer::from_path(&path)?;
            w.write_record(columns.header())?;
            w.flush()?;
            info!("ledger {} created", path.display());
            BTreeSet::new()
        } else if mode == LedgerMode::Append {
            debug!("ledger {} appending", path.display());
            BTreeSet::new()
        } else {
            let set = Self::read_evaluated(&path)?;
            info!("ledger {} resumed, {} already evaluated", path.display(), set.len());
            set
        };

        let file = OpenOptions::new().append(true).open(&path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        Ok(Self {
            path,
            columns,
            evaluated,
            writer,
        })
    }

    fn read_evaluated(path: &Path) -> Result<BTreeSet<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut set = BTreeSet::new();
        for record in reader.records() {
            if let Some(name) = record?.get(0) {
                if !name.is_empty() {
                    set.insert(name.to_string());
                }
            }
        }
        Ok(set)
    }

    /// Ledger path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the testcase already has a row
    pub fn is_evaluated(&self, model: &str) -> bool {
        self.evaluated.contains(model)
    }

    /// Number of testcases with a row
    pub fn evaluated_count(&self) -> usize {
        self.evaluated.len()
    }

    /// Append one row and flush it to disk
    ///
    /// # Errors
    ///
    /// Returns error if the row cannot be written.
    pub fn append(&mut self, result: &RunResult) -> Result<()> {
        let num = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        let mut record = vec![
            result.model.clone(),
            result.outcome.label().to_string(),
            num(result.fps),
        ];
        if self.columns.telemetry {
            let t = result.telemetry.unwrap_or_default();
            record.push(num(t.cpu_percent));
            record.push(num(t.power_mw));
            record.push(num(t.temperature_c));
        }
        if self.columns.operating_point {
            let op = result.operating_point;
            record.push(num(op.map(|o| o.frequency_mhz)));
            record.push(num(op.map(|o| o.voltage_mv)));
            record.push(num(op.map(|o| o.thermal_threshold_c)));
        }
        self.writer.write_record(&record)?;
        self.writer.flush()?;
        debug!("ledger += {} {}", result.model, result.outcome);
        self.evaluated.insert(result.model.clone());
        Ok(())
    }

    /// Read `Model,Result,FPS` rows from any ledger or baseline file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or lacks a `Model` column.
    pub fn read_rows(path: &Path) -> Result<Vec<LedgerRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }
}
