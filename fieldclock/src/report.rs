//! Report delivery for sampled readings.
//!
//! Workers hand every formatted reading (and every sampling failure) to a
//! shared [`Reporter`], which serializes access to one [`ReportSink`]. The
//! async lock keeps multi-line records from interleaving; a sink failure
//! surfaces to the worker whose cycle wrote the entry and to nobody else.

use crate::config::ReporterConfig;
use crate::error::ReportError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Timestamp layout used in report records.
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// One formatted reading (or fault) on its way to a sink.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// Name of the task that produced the reading.
    pub task: String,
    /// Sample time in the station's configured zone.
    pub timestamp: DateTime<Tz>,
    /// Formatted body, possibly multi-line.
    pub body: String,
    /// True when the body describes a sampling failure instead of a reading.
    pub fault: bool,
}

impl ReportEntry {
    /// Stamps a new entry with the current time in `zone`.
    pub fn now(zone: Tz, task: impl Into<String>, body: impl Into<String>, fault: bool) -> Self {
        Self {
            task: task.into(),
            timestamp: Utc::now().with_timezone(&zone),
            body: body.into(),
            fault,
        }
    }

    fn level(&self) -> &'static str {
        if self.fault {
            "ERROR"
        } else {
            "INFO"
        }
    }

    /// Renders the station's record layout: a bracketed timestamp and task
    /// header line, the body, and a blank separator line.
    pub fn to_record(&self) -> String {
        format!(
            "[{}] ({}) {}:\n{}\n\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.task,
            self.level(),
            self.body
        )
    }
}

/// Destination for report entries.
///
/// Sinks are driven behind the shared [`Reporter`] lock, so implementations
/// can hold plain mutable state.
pub trait ReportSink: Send {
    /// Appends one entry.
    fn append(&mut self, entry: &ReportEntry) -> Result<(), ReportError>;
}

/// Emits entries through the process log, one named stream per task.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn append(&mut self, entry: &ReportEntry) -> Result<(), ReportError> {
        if entry.fault {
            warn!(task = %entry.task, "{}", entry.body);
        } else {
            info!(task = %entry.task, "{}", entry.body);
        }
        Ok(())
    }
}

/// Appends entries to a log file in the station's record layout.
#[derive(Debug)]
pub struct FileSink {
    file: File,
    path: PathBuf,
}

impl FileSink {
    /// Opens the report log, creating it if needed. A fresh (empty) file
    /// gets the station header line before any entries.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "fieldstation report log")?;
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn append(&mut self, entry: &ReportEntry) -> Result<(), ReportError> {
        self.file.write_all(entry.to_record().as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Cheap-clone handle to the shared sink.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<Mutex<Box<dyn ReportSink>>>,
}

impl Reporter {
    pub fn new(sink: Box<dyn ReportSink>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Builds the sink described by the configuration.
    pub fn from_config(cfg: &ReporterConfig) -> Result<Self, ReportError> {
        let sink: Box<dyn ReportSink> = match cfg {
            ReporterConfig::Console => Box::new(ConsoleSink),
            ReporterConfig::File { path } => Box::new(FileSink::create(path)?),
        };
        Ok(Self::new(sink))
    }

    /// Appends one entry to the shared sink.
    pub async fn write(&self, entry: &ReportEntry) -> Result<(), ReportError> {
        self.sink.lock().await.append(entry)
    }
}
