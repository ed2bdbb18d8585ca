//! Delimited-text loading for co-occurrence matrices
//!
//! The expected layout is a header row whose first cell is ignored and whose
//! remaining cells name the categories, followed by one row per category:
//!
//! ```text
//! ,A,B,C
//! A,0,3,0
//! B,3,0,5
//! C,0,5,0
//! ```
//!
//! Loading is lenient: malformed cells become 0 and are reported as
//! [`Warning`]s. Only a missing, empty or header-less source is an error.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{CoOccurrenceMatrix, Warning};

/// Error type for load failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// Source file could not be read
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Standard input could not be read
    #[error("cannot read standard input: {0}")]
    Stdin(#[source] std::io::Error),
    /// Source contained no text
    #[error("source is empty")]
    Empty,
    /// No usable header row
    #[error("no header row found")]
    MissingHeader,
    /// The same category name appears twice in the header
    #[error("duplicate category '{name}' in header (columns {first} and {second})")]
    DuplicateCategory { name: String, first: usize, second: usize },
    /// Delimited text could not be tokenised at all
    #[error("malformed delimited text: {0}")]
    Csv(#[from] csv::Error),
}

impl LoadError {
    /// Short machine-readable kind, used for telemetry entries.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Io { .. } | LoadError::Stdin(_) => "io_error",
            LoadError::Empty => "empty_source",
            LoadError::MissingHeader => "missing_header",
            LoadError::DuplicateCategory { .. } => "duplicate_category",
            LoadError::Csv(_) => "csv_error",
        }
    }

    /// Suggested fix, if there is an obvious one.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            LoadError::Io { .. } => Some("Check that the file exists and is readable"),
            LoadError::Empty | LoadError::MissingHeader => {
                Some("The first row must list the categories, e.g. ',A,B,C'")
            }
            LoadError::DuplicateCategory { .. } => Some("Rename or merge the repeated category"),
            _ => None,
        }
    }
}

/// Options controlling how source text is tokenised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Field delimiter byte
    pub delimiter: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl LoaderOptions {
    /// Options with an explicit delimiter.
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Default options for a path: tab-delimited for `.tsv`, comma otherwise.
    pub fn for_path(path: &Path) -> Self {
        let is_tsv = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case("tsv"))
            .unwrap_or(false);
        if is_tsv {
            Self::with_delimiter(b'\t')
        } else {
            Self::default()
        }
    }
}

/// Where matrix text comes from.
///
/// Fetching is the only I/O boundary; everything after it is pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixSource {
    Path(PathBuf),
    Stdin,
    Text(String),
}

impl MatrixSource {
    /// Source for a CLI argument, where `-` means standard input.
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            MatrixSource::Stdin
        } else {
            MatrixSource::Path(arg.to_path_buf())
        }
    }

    /// Human-readable label (file name, `<stdin>` or `<inline>`).
    pub fn label(&self) -> String {
        match self {
            MatrixSource::Path(p) => p.display().to_string(),
            MatrixSource::Stdin => "<stdin>".to_string(),
            MatrixSource::Text(_) => "<inline>".to_string(),
        }
    }

    /// Fetch the raw text once.
    pub fn fetch(&self) -> Result<String, LoadError> {
        match self {
            MatrixSource::Path(path) => std::fs::read_to_string(path)
                .map_err(|source| LoadError::Io { path: path.clone(), source }),
            MatrixSource::Stdin => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text).map_err(LoadError::Stdin)?;
                Ok(text)
            }
            MatrixSource::Text(text) => Ok(text.clone()),
        }
    }
}

/// Result of a successful load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedMatrix {
    pub matrix: CoOccurrenceMatrix,
    pub warnings: Vec<Warning>,
}

impl LoadedMatrix {
    /// Category names in source order.
    pub fn categories(&self) -> &[String] {
        self.matrix.categories()
    }
}

/// Fetch a source and parse it.
pub fn load(source: &MatrixSource, options: LoaderOptions) -> Result<LoadedMatrix, LoadError> {
    let text = source.fetch()?;
    parse_matrix(&text, options)
}

/// Load a matrix file, picking the delimiter from its extension.
pub fn load_path(path: &Path) -> Result<LoadedMatrix, LoadError> {
    load(&MatrixSource::Path(path.to_path_buf()), LoaderOptions::for_path(path))
}

/// Parse delimited text into a matrix.
///
/// Data rows are matched to categories by position. Cells that are blank
/// become 0 silently; cells that are not a non-negative integer become 0 with
/// a warning.
pub fn parse_matrix(text: &str, options: LoaderOptions) -> Result<LoadedMatrix, LoadError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(LoadError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(options.delimiter)
        .from_reader(text.as_bytes());

    let mut warnings = Vec::new();
    let mut records = reader.records();

    // First non-blank record is the header
    let header = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if !is_blank(&record) {
                    break record;
                }
            }
            None => return Err(LoadError::MissingHeader),
        }
    };

    let categories: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    check_unique(&categories)?;

    let n = categories.len();
    let mut matrix = CoOccurrenceMatrix::new(categories);
    let mut row = 0usize;
    let mut surplus = 0usize;

    for record in records {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let line = line_of(&record);

        if row >= n {
            surplus += 1;
            continue;
        }

        let label = record.get(0).unwrap_or("");
        let expected = matrix.categories()[row].as_str();
        if label != expected {
            warnings.push(Warning::new(
                line,
                format!("row label '{}' does not match column '{}'", label, expected),
            ));
        }

        let cells = record.len().saturating_sub(1);
        if cells < n {
            warnings.push(Warning::new(
                line,
                format!("row '{}' has {} values, expected {}; padded with 0", label, cells, n),
            ));
        } else if cells > n {
            warnings.push(Warning::new(
                line,
                format!("row '{}' has {} values, expected {}; extra ignored", label, cells, n),
            ));
        }

        for (col, cell) in record.iter().skip(1).take(n).enumerate() {
            match parse_cell(cell) {
                Ok(value) => matrix.set(row, col, value),
                Err(reason) => warnings.push(Warning::new(
                    line,
                    format!(
                        "'{}' at ({}, {}) {}; using 0",
                        cell,
                        label,
                        matrix.categories()[col],
                        reason
                    ),
                )),
            }
        }

        row += 1;
    }

    if row < n {
        warnings.push(Warning::new(
            0,
            format!("{} of {} category rows missing; filled with 0", n - row, n),
        ));
    }
    if surplus > 0 {
        warnings.push(Warning::new(
            0,
            format!("{} surplus row(s) beyond {} categories ignored", surplus, n),
        ));
    }
    if !matrix.is_symmetric() {
        warnings.push(Warning::new(
            0,
            "matrix is not symmetric; statistics read the upper triangle",
        ));
    }

    Ok(LoadedMatrix { matrix, warnings })
}

/// Coerce one cell to a count.
///
/// Accepts integers and integral floats (`3.0`, as written by dataframe
/// exports). Blank is 0 with no complaint.
pub fn parse_cell(cell: &str) -> Result<u64, &'static str> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(0);
    }
    if let Ok(value) = cell.parse::<u64>() {
        return Ok(value);
    }
    let value: f64 = cell.parse().map_err(|_| "is not a number")?;
    if !value.is_finite() {
        Err("is not finite")
    } else if value < 0.0 {
        Err("is negative")
    } else if value.fract() != 0.0 {
        Err("is not a whole count")
    } else if value > u64::MAX as f64 {
        Err("is out of range")
    } else {
        Ok(value as u64)
    }
}

fn check_unique(categories: &[String]) -> Result<(), LoadError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (i, name) in categories.iter().enumerate() {
        if let Some(first) = seen.insert(name.as_str(), i) {
            return Err(LoadError::DuplicateCategory { name: name.clone(), first, second: i });
        }
    }
    Ok(())
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn line_of(record: &csv::StringRecord) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(0)
}
