use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::features::{FeatureKind, FeatureValue, FeatureVector, FEATURE_SCHEMA};

/// Trained regression mapping a feature vector to expected runs allowed.
pub trait Scorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScorerError>;

    fn is_ready(&self) -> bool;

    fn name(&self) -> &str;
}

/// Failure raised while producing a score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScorerError {
    #[error("no trained model is loaded")]
    ModelNotReady,
    #[error("model produced a non-finite score ({0})")]
    NonFinite(f64),
    #[error("model failed: {0}")]
    Failed(String),
}

/// Placeholder used until an artifact is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnloadedScorer;

impl Scorer for UnloadedScorer {
    fn score(&self, _features: &FeatureVector) -> Result<f64, ScorerError> {
        Err(ScorerError::ModelNotReady)
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unloaded"
    }
}

/// Linear model over the feature schema with one weight per category code.
/// Category codes never seen in training contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScorer {
    pub horizon_batters: u32,
    pub trained_at: DateTime<Utc>,
    pub intercept: f64,
    pub numeric: BTreeMap<String, f64>,
    pub categorical: BTreeMap<String, BTreeMap<u32, f64>>,
}

impl LinearScorer {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let raw = fs::read(path.as_ref())?;
        let scorer: LinearScorer = serde_json::from_slice(&raw)?;
        scorer.check_schema()?;
        Ok(scorer)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_vec_pretty(self)?;
        fs::write(path, body)?;
        Ok(())
    }

    /// A model only answers for the horizon it was fit on.
    pub fn check_horizon(&self, configured: u32) -> Result<(), ArtifactError> {
        if self.horizon_batters == configured {
            Ok(())
        } else {
            Err(ArtifactError::HorizonMismatch {
                artifact: self.horizon_batters,
                configured,
            })
        }
    }

    /// Every weight must name a column of the matching kind.
    pub fn check_schema(&self) -> Result<(), ArtifactError> {
        let kind_of = |column: &str| {
            FEATURE_SCHEMA
                .iter()
                .find(|(name, _)| *name == column)
                .map(|(_, kind)| *kind)
        };

        for (column, weight) in &self.numeric {
            if kind_of(column) != Some(FeatureKind::Numeric) {
                return Err(ArtifactError::UnknownColumn(column.clone()));
            }
            if !weight.is_finite() {
                return Err(ArtifactError::NonFiniteWeight(column.clone()));
            }
        }
        for (column, weights) in &self.categorical {
            if kind_of(column) != Some(FeatureKind::Categorical) {
                return Err(ArtifactError::UnknownColumn(column.clone()));
            }
            if weights.values().any(|weight| !weight.is_finite()) {
                return Err(ArtifactError::NonFiniteWeight(column.clone()));
            }
        }
        if !self.intercept.is_finite() {
            return Err(ArtifactError::NonFiniteWeight("intercept".to_string()));
        }
        Ok(())
    }
}

impl Scorer for LinearScorer {
    fn score(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
        let mut total = self.intercept;
        for (column, value) in features.values() {
            total += match value {
                FeatureValue::Numeric(number) => {
                    self.numeric.get(column).copied().unwrap_or(0.0) * number
                }
                FeatureValue::Categorical(code) => self
                    .categorical
                    .get(column)
                    .and_then(|weights| weights.get(&code))
                    .copied()
                    .unwrap_or(0.0),
            };
        }

        if total.is_finite() {
            Ok(total)
        } else {
            Err(ScorerError::NonFinite(total))
        }
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "linear"
    }
}

/// Error loading or persisting a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("artifact references unknown feature column '{0}'")]
    UnknownColumn(String),
    #[error("artifact weight '{0}' is not finite")]
    NonFiniteWeight(String),
    #[error("artifact was trained for {artifact} batters but the service forecasts {configured}")]
    HorizonMismatch { artifact: u32, configured: u32 },
}

/// Process-wide scorer slot. Reloads replace the whole model in one atomic
/// swap; callers that took a [`snapshot`](Self::snapshot) keep using it.
pub struct ScorerHandle {
    current: ArcSwap<Box<dyn Scorer>>,
}

impl ScorerHandle {
    pub fn new<S>(scorer: S) -> Self
    where
        S: Scorer + 'static,
    {
        Self {
            current: ArcSwap::from_pointee(Box::new(scorer) as Box<dyn Scorer>),
        }
    }

    pub fn unloaded() -> Self {
        Self::new(UnloadedScorer)
    }

    pub fn snapshot(&self) -> Arc<Box<dyn Scorer>> {
        self.current.load_full()
    }

    /// Installs a new scorer and returns the one it replaced.
    pub fn replace<S>(&self, scorer: S) -> Arc<Box<dyn Scorer>>
    where
        S: Scorer + 'static,
    {
        self.current
            .swap(Arc::new(Box::new(scorer) as Box<dyn Scorer>))
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_ready()
    }

    pub fn name(&self) -> String {
        self.current.load().name().to_string()
    }
}

impl Default for ScorerHandle {
    fn default() -> Self {
        Self::unloaded()
    }
}

impl std::fmt::Debug for ScorerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerHandle")
            .field("scorer", &self.name())
            .field("ready", &self.is_ready())
            .finish()
    }
}
