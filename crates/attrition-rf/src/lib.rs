//! Random forest classifier for the attrition pipeline.
//!
//! The crate is organized bottom-up: [`Node`] and [`SplitCriterion`] are the
//! building blocks, [`DecisionTree`] fits a single tree over them, and
//! [`RandomForest`] bags seeded trees in parallel. [`TrainerConfig`] wraps
//! the forest in a full session (seeded train/test split, fit, holdout
//! score), and [`Predictor`] scores named-field records against the schema
//! captured at training time.
//!
//! All randomness flows from explicit seeds through ChaCha8, so a fit is
//! reproducible across runs and thread counts.
//!
//! # Example
//!
//! ```
//! use attrition_rf::{InputRecord, RandomForestConfig, TrainerConfig};
//!
//! let features = vec![
//!     vec![25.0, 3000.0], vec![28.0, 3200.0], vec![31.0, 3500.0],
//!     vec![52.0, 8000.0], vec![55.0, 8500.0], vec![58.0, 9000.0],
//! ];
//! let labels = vec![1, 1, 1, 0, 0, 0];
//! let names = vec!["Age".to_string(), "MonthlyIncome".to_string()];
//!
//! let config = TrainerConfig::new(RandomForestConfig::new(10)?);
//! let model = config.fit(&features, &labels, &names)?;
//! let predictor = model.into_predictor()?;
//!
//! let record = InputRecord::new().with("Age", 26.0).with("MonthlyIncome", 3100.0);
//! let label = predictor.predict(&record)?;
//! assert!(label == 0 || label == 1);
//! # Ok::<(), attrition_rf::ModelError>(())
//! ```

mod config;
mod error;
mod forest;
mod node;
mod predict;
mod schema;
mod split;
mod trainer;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use error::ModelError;
pub use forest::RandomForest;
pub use node::{FeatureIndex, Node, NodeIndex};
pub use predict::{InputRecord, Predictor};
pub use schema::FeatureSchema;
pub use split::SplitCriterion;
pub use trainer::{FittedModel, HoldoutScore, TrainerConfig};
pub use tree::{DecisionTree, DecisionTreeConfig};
