//! Writing matrices back to delimited text
//!
//! Output uses the same layout the loader reads: an empty corner cell, the
//! category header, then one labelled row per category. A matrix with no
//! categories gets a `card` corner cell so its header is not a blank record.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::CoOccurrenceMatrix;

/// Error type for export failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// File I/O error
    #[error("cannot write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// CSV serialisation error
    #[error("failed to write matrix: {0}")]
    Csv(#[from] csv::Error),
}

/// Write a matrix to any writer.
pub fn write_matrix<W: Write>(
    matrix: &CoOccurrenceMatrix,
    writer: W,
    delimiter: u8,
) -> Result<(), ExportError> {
    let mut out = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);

    let corner = if matrix.is_empty() { "card" } else { "" };
    let mut header = vec![corner.to_string()];
    header.extend(matrix.categories().iter().cloned());
    out.write_record(&header)?;

    for (category, row) in matrix.categories().iter().zip(matrix.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(category.clone());
        record.extend(row.iter().map(u64::to_string));
        out.write_record(&record)?;
    }

    out.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render a matrix to a string.
pub fn matrix_to_string(matrix: &CoOccurrenceMatrix, delimiter: u8) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_matrix(matrix, &mut buf, delimiter)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Save a matrix to a file, creating parent directories as needed.
///
/// `.tsv` paths are written tab-delimited.
pub fn save_matrix(matrix: &CoOccurrenceMatrix, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| ExportError::Io { path: parent.to_path_buf(), source })?;
    }
    let file = fs::File::create(path)
        .map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;
    let delimiter = crate::loader::LoaderOptions::for_path(path).delimiter;
    write_matrix(matrix, file, delimiter)
}
