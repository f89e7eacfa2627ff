//! JSON artifact writer for training, prediction, and chart outputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::DataError;
use crate::charts::{BoxSummary, ScatterPoint, TargetCounts};
use crate::table::RunName;

/// Writes pipeline results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{run}_training.json`, `{run}_prediction.json`,
/// and `{run}_charts.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    run: RunName,
}

#[derive(Serialize)]
struct TrainingArtifact<'a> {
    run: &'a str,
    n_rows: usize,
    n_features: usize,
    counts: TargetCounts,
    holdout_accuracy: Option<f64>,
    n_trees: usize,
}

#[derive(Serialize)]
struct PredictionArtifact<'a> {
    run: &'a str,
    label: usize,
    at_risk: bool,
    inputs: &'a BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct ChartsArtifact<'a> {
    run: &'a str,
    counts: TargetCounts,
    scatter: &'a [ScatterPoint],
    boxes: &'a [BoxSummary],
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: RunName) -> Result<Self, DataError> {
        fs::create_dir_all(output_dir).map_err(|e| DataError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    /// Write a training summary to `{run}_training.json`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_training(
        &self,
        n_rows: usize,
        n_features: usize,
        counts: TargetCounts,
        holdout_accuracy: Option<f64>,
        n_trees: usize,
    ) -> Result<(), DataError> {
        let artifact = TrainingArtifact {
            run: self.run.as_str(),
            n_rows,
            n_features,
            counts,
            holdout_accuracy,
            n_trees,
        };
        self.write_json("training", &artifact)
    }

    /// Write a prediction result to `{run}_prediction.json`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_prediction(
        &self,
        label: usize,
        inputs: &BTreeMap<String, f64>,
    ) -> Result<(), DataError> {
        let artifact = PredictionArtifact {
            run: self.run.as_str(),
            label,
            at_risk: label == 1,
            inputs,
        };
        self.write_json("prediction", &artifact)
    }

    /// Write chart summaries to `{run}_charts.json`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_charts(
        &self,
        counts: TargetCounts,
        scatter: &[ScatterPoint],
        boxes: &[BoxSummary],
    ) -> Result<(), DataError> {
        let artifact = ChartsArtifact {
            run: self.run.as_str(),
            counts,
            scatter,
            boxes,
        };
        self.write_json("charts", &artifact)
    }

    fn write_json(&self, suffix: &str, artifact: &impl Serialize) -> Result<(), DataError> {
        let path = self
            .output_dir
            .join(format!("{}_{suffix}.json", self.run.as_str()));
        let json = serde_json::to_string_pretty(artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| DataError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "{suffix} artifact written");
        Ok(())
    }
}
