//! Cleaning and encoding: raw table -> fully numeric table.

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use crate::DataError;
use crate::table::{CleanTable, RawTable};

/// Columns that carry no predictive signal and are always dropped.
pub const DROPPED_COLUMNS: [&str; 4] =
    ["EmployeeCount", "EmployeeNumber", "Over18", "StandardHours"];

/// Name of the binary target column.
pub const TARGET_COLUMN: &str = "Attrition";

/// How a predictor column is encoded.
enum ColumnKind {
    /// Every cell parsed as a finite float.
    Numeric(Vec<f64>),
    /// At least one cell is non-numeric; one-hot encoded.
    Categorical,
}

/// Clean a raw table into the fully numeric [`CleanTable`].
///
/// Semantics:
/// 1. Drop the four non-informative columns ([`DROPPED_COLUMNS`]).
/// 2. Encode the target: `Attrition` "Yes" -> 1, "No" -> 0.
/// 3. Replace every remaining non-numeric column with drop-first one-hot
///    indicators, one per distinct category observed in the file.
///
/// Indicator columns are named `{column}_{category}` with categories in
/// lexicographic order; the lexicographically first category is the
/// dropped reference. Numeric predictors keep their header order and
/// precede all indicator groups, so the resulting column set and order
/// are a pure function of the file contents.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::MissingColumn`] | A dropped column or `Attrition` is absent |
/// | [`DataError::InvalidTargetValue`] | `Attrition` cell is neither "Yes" nor "No" |
/// | [`DataError::NonFiniteValue`] | Numeric cell parses to NaN or Inf |
#[instrument(skip(raw), fields(path = %raw.path().display(), n_rows = raw.n_rows()))]
pub fn clean(raw: &RawTable) -> Result<CleanTable, DataError> {
    // Every expected column must be present, dropped ones included.
    let mut drop_indices = Vec::with_capacity(DROPPED_COLUMNS.len());
    for column in DROPPED_COLUMNS {
        let idx = raw
            .column_index(column)
            .ok_or_else(|| DataError::MissingColumn {
                path: raw.path().to_path_buf(),
                column: column.to_string(),
            })?;
        drop_indices.push(idx);
    }

    let target_idx = raw
        .column_index(TARGET_COLUMN)
        .ok_or_else(|| DataError::MissingColumn {
            path: raw.path().to_path_buf(),
            column: TARGET_COLUMN.to_string(),
        })?;

    let target = encode_target(raw, target_idx)?;

    // Classify each surviving predictor column.
    let predictor_indices: Vec<usize> = (0..raw.n_columns())
        .filter(|i| *i != target_idx && !drop_indices.contains(i))
        .collect();

    let mut numeric: Vec<(usize, Vec<f64>)> = Vec::new();
    let mut categorical: Vec<usize> = Vec::new();
    for &col_idx in &predictor_indices {
        match classify_column(raw, col_idx)? {
            ColumnKind::Numeric(values) => numeric.push((col_idx, values)),
            ColumnKind::Categorical => categorical.push(col_idx),
        }
    }
    debug!(
        n_numeric = numeric.len(),
        n_categorical = categorical.len(),
        "predictor columns classified"
    );

    // Assemble: numeric predictors in header order, then indicator groups.
    let n_rows = raw.n_rows();
    let mut feature_names: Vec<String> = Vec::new();
    let mut feature_columns: Vec<Vec<f64>> = Vec::new();

    for (col_idx, values) in numeric {
        feature_names.push(raw.column_names()[col_idx].clone());
        feature_columns.push(values);
    }

    for col_idx in categorical {
        let name = &raw.column_names()[col_idx];
        let cells = raw.column(col_idx);
        // BTreeSet gives the lexicographic category order; the first
        // category becomes the dropped reference.
        let categories: BTreeSet<&str> = cells.iter().map(String::as_str).collect();
        for category in categories.iter().skip(1) {
            feature_names.push(format!("{name}_{category}"));
            feature_columns.push(
                cells
                    .iter()
                    .map(|cell| if cell == category { 1.0 } else { 0.0 })
                    .collect(),
            );
        }
    }

    // Transpose to row-major for the classifier.
    let features: Vec<Vec<f64>> = (0..n_rows)
        .map(|row| feature_columns.iter().map(|col| col[row]).collect())
        .collect();

    info!(
        n_rows,
        n_features = feature_names.len(),
        "table cleaned and encoded"
    );

    Ok(CleanTable::new(feature_names, features, target))
}

/// Encode the target column: "Yes" -> 1, "No" -> 0.
fn encode_target(raw: &RawTable, target_idx: usize) -> Result<Vec<usize>, DataError> {
    raw.column(target_idx)
        .iter()
        .enumerate()
        .map(|(row_index, cell)| match cell.as_str() {
            "Yes" => Ok(1),
            "No" => Ok(0),
            other => Err(DataError::InvalidTargetValue {
                path: raw.path().to_path_buf(),
                row_index,
                raw: other.to_string(),
            }),
        })
        .collect()
}

/// Decide whether a column is numeric (every cell a finite float) or categorical.
///
/// The whole column is scanned before deciding, so the verdict does not
/// depend on cell order: any unparseable cell makes the column
/// categorical, and "NaN"/"inf" cells are only an error in a column
/// that is otherwise fully numeric.
fn classify_column(raw: &RawTable, col_idx: usize) -> Result<ColumnKind, DataError> {
    let cells = raw.column(col_idx);
    let mut values = Vec::with_capacity(cells.len());
    for cell in cells {
        match cell.trim().parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => return Ok(ColumnKind::Categorical),
        }
    }
    if let Some(row_index) = values.iter().position(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteValue {
            path: raw.path().to_path_buf(),
            row_index,
            column: raw.column_names()[col_idx].clone(),
            raw: cells[row_index].clone(),
        });
    }
    Ok(ColumnKind::Numeric(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TableReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "Age,Attrition,Department,EmployeeCount,EmployeeNumber,Over18,StandardHours,MonthlyIncome,OverTime";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn valid_csv() -> String {
        format!(
            "{HEADER}\n\
             41,Yes,Sales,1,1001,Y,80,5000,Yes\n\
             49,No,Research,1,1002,Y,80,4200,No\n\
             37,No,Sales,1,1003,Y,80,3800,No\n\
             33,Yes,HumanResources,1,1004,Y,80,2900,Yes\n"
        )
    }

    fn load_clean(content: &str) -> Result<CleanTable, DataError> {
        let f = write_csv(content);
        let raw = TableReader::new(f.path()).read()?;
        clean(&raw)
    }

    #[test]
    fn cleaned_table_is_numeric_with_same_row_count() {
        let table = load_clean(&valid_csv()).unwrap();
        assert_eq!(table.n_rows(), 4);
        for row in table.features() {
            assert_eq!(row.len(), table.n_features());
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn dropped_columns_absent() {
        let table = load_clean(&valid_csv()).unwrap();
        for column in DROPPED_COLUMNS {
            assert!(
                !table.feature_names().iter().any(|n| n == column),
                "column {column} should have been dropped"
            );
        }
        assert!(!table.feature_names().iter().any(|n| n == TARGET_COLUMN));
    }

    #[test]
    fn target_encoded_yes_one_no_zero() {
        let table = load_clean(&valid_csv()).unwrap();
        assert_eq!(table.target(), &[1, 0, 0, 1]);
    }

    #[test]
    fn one_hot_drops_reference_category() {
        let table = load_clean(&valid_csv()).unwrap();
        // Department categories sorted: HumanResources (reference), Research, Sales.
        assert!(table.feature_names().contains(&"Department_Research".to_string()));
        assert!(table.feature_names().contains(&"Department_Sales".to_string()));
        assert!(!table.feature_names().contains(&"Department_HumanResources".to_string()));
        // Binary OverTime: No is the reference.
        assert!(table.feature_names().contains(&"OverTime_Yes".to_string()));
        assert!(!table.feature_names().contains(&"OverTime_No".to_string()));
    }

    #[test]
    fn indicator_values_match_rows() {
        let table = load_clean(&valid_csv()).unwrap();
        let sales = table.feature_column("Department_Sales").unwrap();
        assert_eq!(sales, vec![1.0, 0.0, 1.0, 0.0]);
        let overtime = table.feature_column("OverTime_Yes").unwrap();
        assert_eq!(overtime, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn numeric_predictors_precede_indicators() {
        let table = load_clean(&valid_csv()).unwrap();
        assert_eq!(table.feature_names()[0], "Age");
        assert_eq!(table.feature_names()[1], "MonthlyIncome");
    }

    #[test]
    fn cleaning_is_deterministic() {
        let csv = valid_csv();
        let first = load_clean(&csv).unwrap();
        let second = load_clean(&csv).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn error_missing_employee_number() {
        let csv = "Age,Attrition,EmployeeCount,Over18,StandardHours\n41,Yes,1,Y,80\n";
        let err = load_clean(csv).unwrap_err();
        assert!(
            matches!(err, DataError::MissingColumn { ref column, .. } if column == "EmployeeNumber")
        );
    }

    #[test]
    fn error_missing_target() {
        let csv = "Age,EmployeeCount,EmployeeNumber,Over18,StandardHours\n41,1,1001,Y,80\n";
        let err = load_clean(csv).unwrap_err();
        assert!(
            matches!(err, DataError::MissingColumn { ref column, .. } if column == TARGET_COLUMN)
        );
    }

    #[test]
    fn error_invalid_target_value() {
        let csv = format!("{HEADER}\n41,Maybe,Sales,1,1001,Y,80,5000,No\n");
        let err = load_clean(&csv).unwrap_err();
        assert!(
            matches!(err, DataError::InvalidTargetValue { row_index: 0, ref raw, .. } if raw == "Maybe")
        );
    }

    #[test]
    fn error_non_finite_numeric_cell() {
        let csv = format!(
            "{HEADER}\n41,Yes,Sales,1,1001,Y,80,NaN,No\n49,No,Sales,1,1002,Y,80,4200,No\n"
        );
        let err = load_clean(&csv).unwrap_err();
        assert!(
            matches!(err, DataError::NonFiniteValue { ref column, .. } if column == "MonthlyIncome")
        );
    }

    #[test]
    fn nan_in_categorical_column_is_a_category_regardless_of_order() {
        // A "NaN" cell must not turn a categorical column into an error,
        // whichever row it appears in.
        let nan_first = format!(
            "{HEADER}\n41,Yes,Sales,1,1001,Y,80,NaN,No\n49,No,Sales,1,1002,Y,80,unknown,No\n"
        );
        let nan_last = format!(
            "{HEADER}\n41,Yes,Sales,1,1001,Y,80,unknown,No\n49,No,Sales,1,1002,Y,80,NaN,No\n"
        );
        for csv in [nan_first, nan_last] {
            let table = load_clean(&csv).unwrap();
            assert!(table.feature_names().contains(&"MonthlyIncome_unknown".to_string()));
            assert!(!table.feature_names().contains(&"MonthlyIncome".to_string()));
        }
    }

    #[test]
    fn mixed_column_becomes_categorical() {
        // A lone non-numeric cell turns the whole column categorical.
        let csv = format!(
            "{HEADER}\n41,Yes,Sales,1,1001,Y,80,5000,No\n49,No,Sales,1,1002,Y,80,unknown,No\n"
        );
        let table = load_clean(&csv).unwrap();
        assert!(!table.feature_names().contains(&"MonthlyIncome".to_string()));
        assert!(table.feature_names().contains(&"MonthlyIncome_unknown".to_string()));
    }
}
