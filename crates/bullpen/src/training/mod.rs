//! Offline model fitting from historical reliever appearances.
//!
//! Rows go through the same [`FeatureEncoder`] the live engine uses, so a
//! trained [`LinearScorer`] sees identical feature columns at serving time.

pub mod events;
pub mod linear;

pub use events::{read_event_log, synthetic_events, write_event_log, EventRecord};
pub use linear::{fit_linear, FitOptions};

use serde::Serialize;
use tracing::{info, warn};

use crate::recommender::{FeatureEncoder, FeatureVector, LinearScorer, Scorer, ScorerError};

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("event log could not be parsed: {0}")]
    Csv(#[from] csv::Error),
    #[error("event log io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("event row {row} is invalid: {detail}")]
    InvalidRow { row: usize, detail: String },
    #[error("training needs at least {required} rows, found {rows}")]
    TooFewRows { rows: usize, required: usize },
    #[error("{features} feature rows but {targets} targets")]
    LengthMismatch { features: usize, targets: usize },
    #[error("ridge penalty must be a positive number, found {0}")]
    InvalidRidge(f64),
    #[error("normal equations are singular")]
    Singular,
    #[error("validation scoring failed: {0}")]
    Scoring(#[from] ScorerError),
    #[error("validation fraction must be in [0, 1), found {0}")]
    InvalidFraction(f64),
}

/// Encoded design rows and their observed runs.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub fn build_training_set(
    encoder: &FeatureEncoder,
    events: &[EventRecord],
) -> Result<TrainingSet, TrainingError> {
    let rows = events
        .iter()
        .enumerate()
        .map(|(index, event)| event.to_domain(index + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let features = encoder.encode_batch(
        rows.iter()
            .map(|(situation, candidate)| (situation, candidate)),
    );
    let targets = events.iter().map(|event| event.runs).collect();

    Ok(TrainingSet { features, targets })
}

/// Index where the held-out tail starts. Rows keep their log order, so the
/// validation slice is always the most recent appearances.
pub fn train_validate_split(rows: usize, validation_fraction: f64) -> Result<usize, TrainingError> {
    if !(0.0..1.0).contains(&validation_fraction) {
        return Err(TrainingError::InvalidFraction(validation_fraction));
    }
    let held_out = (rows as f64 * validation_fraction).floor() as usize;
    Ok(rows - held_out)
}

/// Returns `None` for empty input.
pub fn mean_absolute_error(predictions: &[f64], targets: &[f64]) -> Option<f64> {
    if predictions.is_empty() || predictions.len() != targets.len() {
        return None;
    }
    let total: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(prediction, target)| (prediction - target).abs())
        .sum();
    Some(total / predictions.len() as f64)
}

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub fit: FitOptions,
    pub validation_fraction: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            fit: FitOptions::default(),
            validation_fraction: 0.3,
        }
    }
}

/// Hold-out quality of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub validation_rows: usize,
    /// Mean absolute error of the model on the held-out tail.
    pub validation_mae: Option<f64>,
    /// Same metric for always predicting the training mean.
    pub baseline_mae: Option<f64>,
}

#[derive(Debug)]
pub struct TrainingOutcome {
    pub scorer: LinearScorer,
    pub report: TrainingReport,
}

pub fn train(
    encoder: &FeatureEncoder,
    events: &[EventRecord],
    options: &TrainOptions,
) -> Result<TrainingOutcome, TrainingError> {
    let set = build_training_set(encoder, events)?;
    let split = train_validate_split(set.len(), options.validation_fraction)?;
    if split == 0 {
        return Err(TrainingError::TooFewRows {
            rows: set.len(),
            required: 1,
        });
    }

    let (train_features, validation_features) = set.features.split_at(split);
    let (train_targets, validation_targets) = set.targets.split_at(split);

    let scorer = fit_linear(train_features, train_targets, &options.fit)?;

    let predictions = validation_features
        .iter()
        .map(|features| scorer.score(features))
        .collect::<Result<Vec<_>, _>>()?;
    let train_mean = train_targets.iter().sum::<f64>() / train_targets.len() as f64;
    let baseline = vec![train_mean; validation_targets.len()];

    let report = TrainingReport {
        train_rows: train_targets.len(),
        validation_rows: validation_targets.len(),
        validation_mae: mean_absolute_error(&predictions, validation_targets),
        baseline_mae: mean_absolute_error(&baseline, validation_targets),
    };

    match report.validation_mae {
        Some(mae) => info!(
            train_rows = report.train_rows,
            validation_rows = report.validation_rows,
            validation_mae = mae,
            baseline_mae = report.baseline_mae.unwrap_or_default(),
            "linear scorer trained"
        ),
        None => warn!(
            train_rows = report.train_rows,
            "linear scorer trained without a validation slice"
        ),
    }

    Ok(TrainingOutcome { scorer, report })
}
