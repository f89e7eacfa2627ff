//! CSV table reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::DataError;
use crate::table::RawTable;

/// Reads a row-oriented, headered CSV file into a [`RawTable`].
///
/// Expected CSV format:
/// - Header row required, naming every column
/// - One row per employee, all rows with the same number of columns
/// - Cells are kept as raw strings; typing happens in [`clean`](crate::clean)
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`DataError::CsvParse`] | Malformed CSV record |
/// | [`DataError::EmptyDataset`] | Zero data rows after header |
/// | [`DataError::InconsistentRowLength`] | Row has different column count than header |
pub struct TableReader {
    path: PathBuf,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`RawTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RawTable, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|e| DataError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) allows rows with varying column counts so that our own
        // InconsistentRowLength check fires instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| DataError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let column_names: Vec<String> = header.iter().map(String::from).collect();
        let expected_cols = column_names.len();
        debug!(expected_cols, "read CSV header");

        let mut columns: Vec<Vec<String>> = vec![Vec::new(); expected_cols];
        let mut n_rows = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DataError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(DataError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            for (col_index, cell) in record.iter().enumerate() {
                columns[col_index].push(cell.to_string());
            }
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(DataError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_rows, n_columns = expected_cols, "raw table loaded");

        Ok(RawTable::new(self.path.clone(), column_names, columns))
    }
}
