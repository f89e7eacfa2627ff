//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::ModelError;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, ModelError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(ModelError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Generate a bootstrap sample of row indices.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<RandomForest, ModelError> {
    // --- Validate inputs ---
    if features.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ModelError::ZeroFeatures);
    }
    if labels.len() != n_samples {
        return Err(ModelError::LabelCountMismatch {
            n_labels: labels.len(),
            n_samples,
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(ModelError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }

    // --- Validate config ---
    // Tree hyperparameters are checked here, before the parallel stage,
    // so bad values surface as errors rather than tree-fit panics.
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;

    if let Some(d) = config.max_depth
        && d == 0
    {
        return Err(ModelError::InvalidMaxDepth { max_depth: 0 });
    }
    if config.min_samples_split < 2 {
        return Err(ModelError::InvalidMinSamplesSplit {
            min_samples_split: config.min_samples_split,
        });
    }
    if config.min_samples_leaf < 1 {
        return Err(ModelError::InvalidMinSamplesLeaf {
            min_samples_leaf: config.min_samples_leaf,
        });
    }
    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(ModelError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        draw_count,
        "training random forest"
    );

    // Generate per-tree seeds from master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    // Capture config fields needed in closure (avoids borrowing config across thread boundary).
    let criterion = config.criterion;
    let max_depth = config.max_depth;
    let min_samples_split = config.min_samples_split;
    let min_samples_leaf = config.min_samples_leaf;

    // Parallel tree training.
    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap_indices = bootstrap_sample(n_samples, draw_count, &mut rng);

            // Build bootstrap dataset: row-major features.
            let boot_features: Vec<Vec<f64>> = bootstrap_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();
            let boot_labels: Vec<usize> = bootstrap_indices.iter().map(|&i| labels[i]).collect();

            let tree_config = DecisionTreeConfig::new()
                .with_criterion(criterion)
                .with_max_depth(max_depth)
                .with_min_samples_split(min_samples_split)
                .with_min_samples_leaf(min_samples_leaf)
                .with_max_features(Some(max_features_resolved))
                .with_seed(rng.r#gen());

            // All inputs are pre-validated — fit cannot fail on data errors.
            tree_config
                .fit(&boot_features, &boot_labels)
                .expect("tree fit should not fail on pre-validated data")
        })
        .collect();

    debug!(n_trees_trained = trees.len(), "tree training complete");

    Ok(RandomForest {
        trees,
        n_features,
        n_classes,
    })
}

impl RandomForest {
    /// Predict the class label for a single sample.
    ///
    /// Returns the argmax of the averaged probability distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ModelError> {
        let proba = self.predict_proba(sample)?;
        Ok(proba
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0))
    }

    /// Return the averaged class probability distribution for a single sample.
    ///
    /// Averages the leaf distributions from all trees.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, ModelError> {
        if sample.len() != self.n_features {
            return Err(ModelError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(sample)?;
            for (i, p) in proba.iter().enumerate() {
                avg[i] += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(avg)
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};

    /// Generate a simple 2-class separable dataset.
    fn make_separable_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        // Class 0: x in [0, 3]
        for i in 0..20 {
            features.push(vec![i as f64 * 0.15, 0.5]);
            labels.push(0);
        }
        // Class 1: x in [10, 13]
        for i in 0..20 {
            features.push(vec![10.0 + i as f64 * 0.15, 0.5]);
            labels.push(1);
        }
        (features, labels)
    }

    #[test]
    fn separable_accuracy() {
        let (features, labels) = make_separable_data();
        let config = RandomForestConfig::new(50)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42);
        let forest = config.fit(&features, &labels).unwrap();

        let predictions = forest.predict_batch(&features).unwrap();
        let correct = predictions
            .iter()
            .zip(&labels)
            .filter(|&(&p, &l)| p == l)
            .count();
        let accuracy = correct as f64 / labels.len() as f64;
        assert!(accuracy > 0.9, "accuracy = {accuracy}");
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels) = make_separable_data();
        let forest1 = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels)
            .unwrap();
        let forest2 = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels)
            .unwrap();

        let preds1 = forest1.predict_batch(&features).unwrap();
        let preds2 = forest2.predict_batch(&features).unwrap();
        assert_eq!(preds1, preds2);
    }

    #[test]
    fn predict_proba_averages_trees() {
        let (features, labels) = make_separable_data();
        let config = RandomForestConfig::new(10).unwrap().with_seed(42);
        let forest = config.fit(&features, &labels).unwrap();

        for sample in &features {
            let proba = forest.predict_proba(sample).unwrap();
            assert_eq!(proba.len(), 2);
            let sum: f64 = proba.iter().sum();
            assert!((sum - 1.0).abs() < 1e-10, "sum = {sum}");
        }
    }

    #[test]
    fn prediction_always_a_known_class() {
        let (features, labels) = make_separable_data();
        let config = RandomForestConfig::new(25).unwrap().with_seed(7);
        let forest = config.fit(&features, &labels).unwrap();

        for sample in &features {
            let label = forest.predict(sample).unwrap();
            assert!(label <= 1);
        }
    }

    #[test]
    fn invalid_tree_count_error() {
        assert!(RandomForestConfig::new(0).is_err());
    }

    #[test]
    fn empty_dataset_error() {
        let config = RandomForestConfig::new(10).unwrap();
        let err = config.fit(&[], &[]).unwrap_err();
        assert!(matches!(err, crate::ModelError::EmptyDataset));
    }

    #[test]
    fn label_count_mismatch_error() {
        let config = RandomForestConfig::new(10).unwrap();
        let features = vec![vec![1.0], vec![2.0]];
        let labels = vec![0];
        let err = config.fit(&features, &labels).unwrap_err();
        assert!(matches!(
            err,
            crate::ModelError::LabelCountMismatch { n_labels: 1, n_samples: 2 }
        ));
    }

    #[test]
    fn max_depth_zero_errors_instead_of_panicking() {
        let (features, labels) = make_separable_data();
        let config = RandomForestConfig::new(10)
            .unwrap()
            .with_max_depth(Some(0));
        let err = config.fit(&features, &labels).unwrap_err();
        assert!(matches!(err, crate::ModelError::InvalidMaxDepth { max_depth: 0 }));
    }

    #[test]
    fn min_samples_split_below_two_errors() {
        let (features, labels) = make_separable_data();
        let config = RandomForestConfig::new(10)
            .unwrap()
            .with_min_samples_split(1);
        let err = config.fit(&features, &labels).unwrap_err();
        assert!(matches!(
            err,
            crate::ModelError::InvalidMinSamplesSplit { min_samples_split: 1 }
        ));
    }

    #[test]
    fn min_samples_leaf_zero_errors() {
        let (features, labels) = make_separable_data();
        let config = RandomForestConfig::new(10)
            .unwrap()
            .with_min_samples_leaf(0);
        let err = config.fit(&features, &labels).unwrap_err();
        assert!(matches!(
            err,
            crate::ModelError::InvalidMinSamplesLeaf { min_samples_leaf: 0 }
        ));
    }

    #[test]
    fn invalid_bootstrap_fraction_error() {
        let (features, labels) = make_separable_data();
        let config = RandomForestConfig::new(10)
            .unwrap()
            .with_bootstrap_fraction(0.0);
        let err = config.fit(&features, &labels).unwrap_err();
        assert!(matches!(err, crate::ModelError::InvalidBootstrapFraction { .. }));
    }
}
