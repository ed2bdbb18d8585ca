//! Local error telemetry
//!
//! Failed loads and builds are appended to a JSONL file so recurring input
//! problems can be spotted later. Entries hold error kinds and file names
//! only, never matrix contents.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::loader::LoadError;
use crate::study::StudyError;

/// One line of the telemetry log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// UTC timestamp, `YYYY-MM-DDTHH:MM:SSZ`
    pub timestamp: String,
    /// Subcommand that failed (`analyze`, `build`, `watch`)
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Machine-readable error kind, e.g. `duplicate_category`
    pub error_type: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorEntry {
    pub fn new(
        command: impl Into<String>,
        error_type: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: utc_timestamp(),
            command: command.into(),
            file: None,
            error_type: error_type.into(),
            context: context.into(),
            suggestion: None,
        }
    }

    /// Entry for a matrix that failed to load.
    pub fn from_load_error(command: &str, file: &str, error: &LoadError) -> Self {
        let entry = Self::new(command, error.kind(), error.to_string()).with_file(file);
        match error.suggestion() {
            Some(s) => entry.with_suggestion(s),
            None => entry,
        }
    }

    /// Entry for a study that failed to load.
    pub fn from_study_error(command: &str, file: &str, error: &StudyError) -> Self {
        Self::new(command, error.kind(), error.to_string()).with_file(file)
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn utc_timestamp() -> String {
    format_timestamp(unix_seconds())
}

/// Current UTC time of day as `HH:MM:SS`.
pub fn utc_clock() -> String {
    let secs = unix_seconds() % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn format_timestamp(secs: u64) -> String {
    let (year, month, day) = civil_date(secs / 86_400);
    let secs = secs % 86_400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Days since 1970-01-01 to a (year, month, day) in the proleptic Gregorian calendar.
fn civil_date(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

/// Appends entries to a JSONL file when enabled.
#[derive(Debug, Clone)]
pub struct ErrorCollector {
    path: PathBuf,
    enabled: bool,
}

impl ErrorCollector {
    pub fn new(path: impl AsRef<Path>, enabled: bool) -> Self {
        Self { path: path.as_ref().to_path_buf(), enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. A disabled collector writes nothing.
    pub fn log(&self, entry: &ErrorEntry) -> std::io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)
    }
}
