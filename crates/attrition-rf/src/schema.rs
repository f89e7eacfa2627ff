//! The ordered feature-name contract between Trainer and Predictor.

use crate::predict::InputRecord;

/// The ordered list of predictor column names a fitted model expects.
///
/// Produced by the [`Trainer`](crate::TrainerConfig) from the training
/// partition's column order; the Predictor treats it as authoritative.
/// Tree ensembles are not order-invariant across implementations, so a
/// record must be re-expressed in exactly this column order before
/// scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from an ordered list of feature names.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Return the feature names in scoring order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` when the schema has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Realign a partial record onto this schema.
    ///
    /// Features present in the schema but absent from the record are
    /// filled with 0; record keys absent from the schema are ignored;
    /// the output order matches the schema exactly.
    #[must_use]
    pub fn align(&self, record: &InputRecord) -> Vec<f64> {
        self.names
            .iter()
            .map(|name| record.get(name).unwrap_or(0.0))
            .collect()
    }
}
