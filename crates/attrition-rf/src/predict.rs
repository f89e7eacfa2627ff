//! Single-record prediction against the trained feature schema.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ModelError;
use crate::forest::RandomForest;
use crate::schema::FeatureSchema;

/// A partial prediction-time record: named fields with numeric values.
///
/// Built per prediction request and discarded after use. Any schema
/// column the record does not set is implicitly 0 at scoring time —
/// for one-hot indicator columns that means the reference category,
/// which may or may not match the caller's intent.
#[derive(Debug, Clone, Default)]
pub struct InputRecord {
    fields: BTreeMap<String, f64>,
}

impl InputRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named field, returning the record for chaining.
    #[must_use]
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Set a named field in place.
    pub fn set(&mut self, name: &str, value: f64) {
        self.fields.insert(name.to_string(), value);
    }

    /// Return the value of a named field, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Return all set fields, sorted by name.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }
}

/// Scores partial records against a fitted forest and its feature schema.
///
/// The schema is the binding contract from the Trainer: every record is
/// realigned onto it (missing features zero-filled, unknown keys
/// dropped, schema order enforced) before the forest sees it.
#[derive(Debug)]
pub struct Predictor {
    forest: RandomForest,
    schema: FeatureSchema,
}

impl Predictor {
    /// Pair a fitted forest with its feature schema.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::NotFitted`] | The schema is empty |
    /// | [`ModelError::SchemaMismatch`] | Schema length differs from the forest's feature count |
    pub fn new(forest: RandomForest, schema: FeatureSchema) -> Result<Self, ModelError> {
        if schema.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if schema.len() != forest.n_features() {
            return Err(ModelError::SchemaMismatch {
                schema_len: schema.len(),
                n_features: forest.n_features(),
            });
        }
        Ok(Self { forest, schema })
    }

    /// Score one record and return the binary label (0 = retained, 1 = attrition).
    ///
    /// # Errors
    ///
    /// Propagates forest prediction errors; with a schema validated at
    /// construction these do not occur for well-formed records.
    pub fn predict(&self, record: &InputRecord) -> Result<usize, ModelError> {
        let sample = self.schema.align(record);
        let label = self.forest.predict(&sample)?;
        debug!(label, n_set_fields = record.fields().len(), "record scored");
        Ok(label)
    }

    /// Return the feature schema this predictor scores against.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the underlying fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}
