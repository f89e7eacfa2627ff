//! Session trainer: seeded train/test split plus forest fit.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::config::RandomForestConfig;
use crate::error::ModelError;
use crate::forest::RandomForest;
use crate::predict::Predictor;
use crate::schema::FeatureSchema;

/// Accuracy on the held-out test partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldoutScore {
    /// Fraction of held-out rows predicted correctly.
    pub accuracy: f64,
    /// Number of held-out rows.
    pub n_test: usize,
}

/// Configuration for one training session.
///
/// Wraps a [`RandomForestConfig`] with the seeded train/test split that
/// precedes the fit. Construct via [`TrainerConfig::new`], then chain
/// `with_*` methods.
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `test_fraction` | 0.2     |
/// | `seed`          | 42      |
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    forest: RandomForestConfig,
    test_fraction: f64,
    seed: u64,
}

impl TrainerConfig {
    /// Create a new trainer around the given forest configuration.
    #[must_use]
    pub fn new(forest: RandomForestConfig) -> Self {
        Self {
            forest,
            test_fraction: 0.2,
            seed: 42,
        }
    }

    /// Set the fraction of rows held out for evaluation.
    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Set the random seed for the split shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the test fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the split seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Split, fit, and evaluate: the full training session.
    ///
    /// Shuffles row indices with a ChaCha8 RNG seeded from `seed`, holds
    /// out `test_fraction` of the rows, fits the forest on the remainder,
    /// and scores the held-out partition. Same seed + same data gives an
    /// identical model.
    ///
    /// The returned [`FittedModel`] carries `feature_names` as the
    /// authoritative [`FeatureSchema`] for prediction.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::InsufficientData`] | Fewer than 2 rows |
    /// | [`ModelError::SingleClass`] | Only one target class present |
    /// | [`ModelError::LabelCountMismatch`] | Label and row counts disagree |
    /// | [`ModelError::SchemaMismatch`] | `feature_names` length differs from row width |
    /// | [`ModelError::InvalidTestFraction`] | `test_fraction` outside (0.0, 1.0) |
    /// | Other model errors | From the underlying forest fit |
    #[instrument(skip_all, fields(n_samples = features.len(), test_fraction = self.test_fraction))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<FittedModel, ModelError> {
        let n_samples = features.len();
        if n_samples < 2 {
            return Err(ModelError::InsufficientData { n_samples });
        }
        if labels.len() != n_samples {
            return Err(ModelError::LabelCountMismatch {
                n_labels: labels.len(),
                n_samples,
            });
        }
        if feature_names.len() != features[0].len() {
            return Err(ModelError::SchemaMismatch {
                schema_len: feature_names.len(),
                n_features: features[0].len(),
            });
        }
        if let Some(&first) = labels.first()
            && labels.iter().all(|&l| l == first)
        {
            return Err(ModelError::SingleClass { class: first });
        }
        if self.test_fraction <= 0.0 || self.test_fraction >= 1.0 {
            return Err(ModelError::InvalidTestFraction {
                fraction: self.test_fraction,
            });
        }

        // Seeded shuffle, then hold out the leading indices.
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let n_test = ((n_samples as f64) * self.test_fraction)
            .ceil()
            .min((n_samples - 1) as f64) as usize;
        let (test_indices, train_indices) = indices.split_at(n_test);

        let train_features: Vec<Vec<f64>> =
            train_indices.iter().map(|&i| features[i].clone()).collect();
        let train_labels: Vec<usize> = train_indices.iter().map(|&i| labels[i]).collect();

        info!(
            n_train = train_indices.len(),
            n_test,
            n_features = feature_names.len(),
            "partitioned training data"
        );

        let forest = self.forest.fit(&train_features, &train_labels)?;

        let holdout = if n_test > 0 {
            let test_features: Vec<Vec<f64>> =
                test_indices.iter().map(|&i| features[i].clone()).collect();
            let predictions = forest.predict_batch(&test_features)?;
            let correct = predictions
                .iter()
                .zip(test_indices.iter().map(|&i| labels[i]))
                .filter(|&(&p, l)| p == l)
                .count();
            Some(HoldoutScore {
                accuracy: correct as f64 / n_test as f64,
                n_test,
            })
        } else {
            None
        };

        info!(
            holdout_accuracy = holdout.as_ref().map(|h| h.accuracy),
            "training session complete"
        );

        Ok(FittedModel {
            forest,
            schema: FeatureSchema::new(feature_names.to_vec()),
            holdout,
        })
    }
}

/// Output of a training session: the fitted forest plus its contract.
#[derive(Debug)]
pub struct FittedModel {
    forest: RandomForest,
    schema: FeatureSchema,
    holdout: Option<HoldoutScore>,
}

impl FittedModel {
    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return the authoritative feature schema.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the held-out accuracy, if a test partition existed.
    #[must_use]
    pub fn holdout(&self) -> Option<&HoldoutScore> {
        self.holdout.as_ref()
    }

    /// Consume the model and build a [`Predictor`] over its schema.
    ///
    /// # Errors
    ///
    /// Propagates [`Predictor::new`] errors; a model produced by
    /// [`TrainerConfig::fit`] always passes those checks.
    pub fn into_predictor(self) -> Result<Predictor, ModelError> {
        Predictor::new(self.forest, self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::predict::InputRecord;

    /// Two well-separated classes over two features.
    fn make_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..25 {
            features.push(vec![20.0 + i as f64 * 0.2, 3000.0 + i as f64 * 10.0]);
            labels.push(0);
        }
        for i in 0..25 {
            features.push(vec![50.0 + i as f64 * 0.2, 6000.0 + i as f64 * 10.0]);
            labels.push(1);
        }
        let names = vec!["Age".to_string(), "MonthlyIncome".to_string()];
        (features, labels, names)
    }

    fn make_trainer() -> TrainerConfig {
        let forest = RandomForestConfig::new(25)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42);
        TrainerConfig::new(forest).with_seed(42)
    }

    #[test]
    fn fit_returns_schema_in_input_order() {
        let (features, labels, names) = make_data();
        let model = make_trainer().fit(&features, &labels, &names).unwrap();
        assert_eq!(model.schema().names(), &names);
    }

    #[test]
    fn holdout_score_computed() {
        let (features, labels, names) = make_data();
        let model = make_trainer().fit(&features, &labels, &names).unwrap();
        let holdout = model.holdout().expect("20% of 50 rows should be held out");
        assert_eq!(holdout.n_test, 10);
        assert!(holdout.accuracy > 0.8, "accuracy = {}", holdout.accuracy);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_data();
        let model1 = make_trainer().fit(&features, &labels, &names).unwrap();
        let model2 = make_trainer().fit(&features, &labels, &names).unwrap();

        assert_eq!(
            model1.holdout().map(|h| h.n_test),
            model2.holdout().map(|h| h.n_test)
        );
        let preds1 = model1.forest().predict_batch(&features).unwrap();
        let preds2 = model2.forest().predict_batch(&features).unwrap();
        assert_eq!(preds1, preds2);
    }

    #[test]
    fn into_predictor_scores_records() {
        let (features, labels, names) = make_data();
        let model = make_trainer().fit(&features, &labels, &names).unwrap();
        let predictor = model.into_predictor().unwrap();

        let record = InputRecord::new().with("Age", 55.0).with("MonthlyIncome", 6100.0);
        assert_eq!(predictor.predict(&record).unwrap(), 1);
    }

    #[test]
    fn insufficient_data_error() {
        let features = vec![vec![30.0]];
        let labels = vec![0];
        let names = vec!["Age".to_string()];
        let err = make_trainer().fit(&features, &labels, &names).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { n_samples: 1 }));
    }

    #[test]
    fn single_class_error() {
        let features = vec![vec![30.0], vec![40.0], vec![50.0]];
        let labels = vec![1, 1, 1];
        let names = vec!["Age".to_string()];
        let err = make_trainer().fit(&features, &labels, &names).unwrap_err();
        assert!(matches!(err, ModelError::SingleClass { class: 1 }));
    }

    #[test]
    fn invalid_test_fraction_error() {
        let (features, labels, names) = make_data();
        let err = make_trainer()
            .with_test_fraction(1.0)
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTestFraction { .. }));
    }

    #[test]
    fn schema_width_mismatch_error() {
        let (features, labels, _) = make_data();
        let names = vec!["Age".to_string()];
        let err = make_trainer().fit(&features, &labels, &names).unwrap_err();
        assert!(matches!(
            err,
            ModelError::SchemaMismatch { schema_len: 1, n_features: 2 }
        ));
    }

    #[test]
    fn tiny_table_keeps_a_training_row() {
        // ceil(2 * 0.2) = 1 held out, 1 left to train on; both classes must
        // survive in the cleaned table, but the split itself may isolate one.
        let features = vec![vec![30.0], vec![50.0]];
        let labels = vec![0, 1];
        let names = vec!["Age".to_string()];
        let model = make_trainer().fit(&features, &labels, &names).unwrap();
        let record = InputRecord::new().with("Age", 40.0);
        let label = model.into_predictor().unwrap().predict(&record).unwrap();
        assert!(label == 0 || label == 1);
    }
}
