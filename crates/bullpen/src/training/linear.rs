use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use nalgebra::{DMatrix, DVector};

use super::TrainingError;
use crate::recommender::{FeatureValue, FeatureVector, LinearScorer};

/// Ridge-regularized least squares settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// L2 penalty on every coefficient except the intercept. Must be > 0 so
    /// one-hot columns that sum to the intercept stay solvable.
    pub ridge: f64,
    pub horizon_batters: u32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            ridge: 0.1,
            horizon_batters: 3,
        }
    }
}

/// Design-matrix column: a numeric feature or one category code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Column {
    Numeric(&'static str),
    Category(&'static str, u32),
}

fn design_columns(rows: &[FeatureVector]) -> Vec<Column> {
    let mut numeric = Vec::new();
    let mut categories = BTreeSet::new();

    if let Some(first) = rows.first() {
        for (name, value) in first.values() {
            if let FeatureValue::Numeric(_) = value {
                numeric.push(Column::Numeric(name));
            }
        }
    }
    for row in rows {
        for (name, value) in row.values() {
            if let FeatureValue::Categorical(code) = value {
                categories.insert(Column::Category(name, code));
            }
        }
    }

    numeric.into_iter().chain(categories).collect()
}

fn design_row(columns: &[Column], features: &FeatureVector) -> Vec<f64> {
    let values = features.values();
    let lookup = |column: &str| {
        values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| *value)
    };

    let mut row = Vec::with_capacity(columns.len() + 1);
    row.push(1.0);
    for column in columns {
        let cell = match column {
            Column::Numeric(name) => match lookup(*name) {
                Some(FeatureValue::Numeric(number)) => number,
                _ => 0.0,
            },
            Column::Category(name, code) => match lookup(*name) {
                Some(FeatureValue::Categorical(seen)) if seen == *code => 1.0,
                _ => 0.0,
            },
        };
        row.push(cell);
    }
    row
}

/// Fits a [`LinearScorer`] with a Cholesky solve of the ridge normal equations.
pub fn fit_linear(
    features: &[FeatureVector],
    targets: &[f64],
    options: &FitOptions,
) -> Result<LinearScorer, TrainingError> {
    if features.len() != targets.len() {
        return Err(TrainingError::LengthMismatch {
            features: features.len(),
            targets: targets.len(),
        });
    }
    if features.is_empty() {
        return Err(TrainingError::TooFewRows {
            rows: 0,
            required: 1,
        });
    }
    if !(options.ridge.is_finite() && options.ridge > 0.0) {
        return Err(TrainingError::InvalidRidge(options.ridge));
    }

    let columns = design_columns(features);
    let width = columns.len() + 1;
    let design = DMatrix::from_row_iterator(
        features.len(),
        width,
        features.iter().flat_map(|row| design_row(&columns, row)),
    );
    let observed = DVector::from_column_slice(targets);

    let mut gram = design.tr_mul(&design);
    for index in 1..width {
        gram[(index, index)] += options.ridge;
    }
    let moment = design.tr_mul(&observed);

    let coefficients = gram
        .cholesky()
        .ok_or(TrainingError::Singular)?
        .solve(&moment);
    if coefficients.iter().any(|weight| !weight.is_finite()) {
        return Err(TrainingError::Singular);
    }

    let mut numeric = BTreeMap::new();
    let mut categorical: BTreeMap<String, BTreeMap<u32, f64>> = BTreeMap::new();
    for (column, weight) in columns.iter().zip(coefficients.iter().skip(1)) {
        match column {
            Column::Numeric(name) => {
                numeric.insert(name.to_string(), *weight);
            }
            Column::Category(name, code) => {
                categorical
                    .entry(name.to_string())
                    .or_default()
                    .insert(*code, *weight);
            }
        }
    }

    Ok(LinearScorer {
        horizon_batters: options.horizon_batters,
        trained_at: Utc::now(),
        intercept: coefficients[0],
        numeric,
        categorical,
    })
}
