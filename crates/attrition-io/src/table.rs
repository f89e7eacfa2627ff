//! Domain types for attrition-io.

use std::path::{Path, PathBuf};

use crate::DataError;

/// An as-read tabular file: header names plus string cells, column-major.
///
/// Produced by [`TableReader`](crate::TableReader). No typing has been
/// applied yet — every cell is the raw string from the CSV. Columns and
/// cells are stored in parallel: `columns[i]` holds all values for
/// `column_names[i]`, top to bottom.
#[derive(Debug, Clone)]
pub struct RawTable {
    path: PathBuf,
    column_names: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl RawTable {
    pub(crate) fn new(path: PathBuf, column_names: Vec<String>, columns: Vec<Vec<String>>) -> Self {
        debug_assert_eq!(column_names.len(), columns.len());
        Self { path, column_names, columns }
    }

    /// Return the path this table was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the column names in header order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Return the raw cells of the column at `index`, top to bottom.
    #[must_use]
    pub fn column(&self, index: usize) -> &[String] {
        &self.columns[index]
    }

    /// Return the header index of the named column, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// Return the number of data rows (excluding the header).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }
}

/// A validated run name for output artifact naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName(String);

impl RunName {
    /// Parse and validate a run name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidRunName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, DataError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(DataError::InvalidRunName { name });
        }
        Ok(Self(name))
    }

    /// Return the run name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The cleaned, fully numeric table: predictors plus the binary target.
///
/// Produced by [`clean`](crate::clean). Predictor columns come first in
/// header order, followed by one-hot indicator columns grouped per
/// original categorical column; the target is held separately so the
/// feature matrix can be handed to a classifier as-is. `features[i]`
/// and `target[i]` describe the same employee.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanTable {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    target: Vec<usize>,
}

impl CleanTable {
    pub(crate) fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        target: Vec<usize>,
    ) -> Self {
        debug_assert_eq!(features.len(), target.len());
        Self { feature_names, features, target }
    }

    /// Return the predictor column names, in the order of [`Self::features`].
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the predictor matrix (row-major): `features[row][feature]`.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the binary target labels (0 = retained, 1 = attrition).
    #[must_use]
    pub fn target(&self) -> &[usize] {
        &self.target
    }

    /// Return the number of rows (employees).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    /// Return the number of predictor columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the count of distinct target classes present.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        let has_retained = self.target.iter().any(|&t| t == 0);
        let has_attrition = self.target.iter().any(|&t| t == 1);
        usize::from(has_retained) + usize::from(has_attrition)
    }

    /// Extract the named predictor column as a contiguous vector.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownColumn`] when the cleaned table has no
    /// predictor with that name.
    pub fn feature_column(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let idx = self
            .feature_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::UnknownColumn {
                column: name.to_string(),
            })?;
        Ok(self.features.iter().map(|row| row[idx]).collect())
    }
}
