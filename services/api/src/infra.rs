use bullpen::config::{AppConfig, ConfigError};
use bullpen::error::AppError;
use bullpen::recommender::{
    Candidate, CandidateFields, CandidateId, FeatureEncoder, Hand, LinearScorer, PenaltyPolicy,
    RecommenderEngine, Runners, ScorerHandle, Situation, SituationFields,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

const MAX_INNING: u32 = 12;
const MAX_REST_DAYS: u32 = 5;
const MAX_PITCHES_LAST_OUTING: u32 = 60;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<RecommenderEngine>,
    pub(crate) model_path: Arc<PathBuf>,
}

/// Body of `POST /api/v1/recommend`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RecommendRequest {
    pub(crate) state: GameStateIn,
    pub(crate) bullpen: Vec<RelieverIn>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GameStateIn {
    pub(crate) outs: u8,
    pub(crate) runners: Runners,
    pub(crate) inning: u32,
    pub(crate) score_diff: i32,
    pub(crate) home: bool,
    pub(crate) park_id: u32,
    pub(crate) batter_segment: u8,
    #[serde(default)]
    pub(crate) leverage_hint: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RelieverIn {
    #[serde(alias = "reliever_id")]
    pub(crate) id: String,
    pub(crate) throws: Hand,
    pub(crate) rest_days: u32,
    pub(crate) pitches_last_outing: u32,
    #[serde(default = "default_available")]
    pub(crate) available: bool,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

fn default_available() -> bool {
    true
}

impl RecommendRequest {
    /// Applies the wire-level bounds, then builds the validated domain values.
    pub(crate) fn into_domain(self) -> Result<(Situation, Vec<Candidate>), AppError> {
        let RecommendRequest { state, bullpen } = self;

        if state.inning > MAX_INNING {
            return Err(AppError::Validation(format!(
                "state.inning must be at most {MAX_INNING}, found {}",
                state.inning
            )));
        }
        let situation = Situation::new(SituationFields {
            outs: state.outs,
            runners: state.runners,
            inning: state.inning,
            score_diff: state.score_diff,
            home: state.home,
            park_id: state.park_id,
            batter_segment: state.batter_segment,
            leverage_hint: state.leverage_hint,
        })
        .map_err(|err| AppError::Validation(err.to_string()))?;

        let mut candidates = Vec::with_capacity(bullpen.len());
        for reliever in bullpen {
            if reliever.rest_days > MAX_REST_DAYS {
                return Err(AppError::Validation(format!(
                    "reliever '{}' rest_days must be at most {MAX_REST_DAYS}, found {}",
                    reliever.id, reliever.rest_days
                )));
            }
            if reliever.pitches_last_outing > MAX_PITCHES_LAST_OUTING {
                return Err(AppError::Validation(format!(
                    "reliever '{}' pitches_last_outing must be at most {MAX_PITCHES_LAST_OUTING}, found {}",
                    reliever.id, reliever.pitches_last_outing
                )));
            }
            let candidate = Candidate::new(CandidateFields {
                id: CandidateId(reliever.id),
                throws: reliever.throws,
                rest_days: reliever.rest_days,
                pitches_last_outing: reliever.pitches_last_outing,
                available: reliever.available,
                notes: reliever.notes,
            })
            .map_err(|err| AppError::Validation(err.to_string()))?;
            candidates.push(candidate);
        }

        Ok((situation, candidates))
    }
}

/// Loads the artifact when present. A missing file leaves the service
/// running with an unloaded scorer; a corrupt one, or one fit for another
/// horizon, is an error.
pub(crate) fn load_scorer(path: &Path, horizon_batters: u32) -> Result<ScorerHandle, AppError> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "no model artifact found; recommendations unavailable until reload"
        );
        return Ok(ScorerHandle::unloaded());
    }

    let scorer = LinearScorer::from_path(path)?;
    scorer.check_horizon(horizon_batters)?;
    info!(
        path = %path.display(),
        trained_at = %scorer.trained_at,
        horizon_batters = scorer.horizon_batters,
        "model artifact loaded"
    );
    Ok(ScorerHandle::new(scorer))
}

pub(crate) fn build_engine(
    config: &AppConfig,
    scorer: ScorerHandle,
) -> Result<RecommenderEngine, AppError> {
    let policy = PenaltyPolicy::new(config.penalties.clone())
        .map_err(|err| AppError::Config(ConfigError::InvalidPenalties(err)))?;

    Ok(RecommenderEngine::new(Arc::new(scorer))
        .with_encoder(FeatureEncoder::default())
        .with_policy(policy)
        .with_horizon(config.model.horizon_batters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullpen::recommender::ArtifactError;
    use serde_json::json;

    fn request(reliever: serde_json::Value) -> RecommendRequest {
        serde_json::from_value(json!({
            "state": {
                "outs": 2,
                "runners": "1-3",
                "inning": 9,
                "score_diff": -1,
                "home": false,
                "park_id": 0,
                "batter_segment": 3
            },
            "bullpen": [reliever]
        }))
        .expect("request parses")
    }

    #[test]
    fn accepts_reliever_id_alias() {
        let (situation, candidates) = request(json!({
            "reliever_id": "closer",
            "throws": "L",
            "rest_days": 1,
            "pitches_last_outing": 18
        }))
        .into_domain()
        .expect("valid request");

        assert_eq!(situation.runners(), Runners::FirstThird);
        assert_eq!(candidates[0].id().as_str(), "closer");
        assert!(candidates[0].available());
    }

    #[test]
    fn wire_bounds_reject_overworked_relievers() {
        let err = request(json!({
            "id": "A",
            "throws": "R",
            "rest_days": 1,
            "pitches_last_outing": 75
        }))
        .into_domain()
        .expect_err("pitch count out of range");

        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("pitches_last_outing"));
    }

    #[test]
    fn artifact_for_another_horizon_is_refused() {
        let path = std::env::temp_dir()
            .join(format!("bullpen-api-horizon-{}", std::process::id()))
            .join("bms.json");
        LinearScorer {
            horizon_batters: 3,
            trained_at: chrono::Utc::now(),
            intercept: 0.4,
            numeric: Default::default(),
            categorical: Default::default(),
        }
        .save(&path)
        .expect("artifact saved");

        assert!(load_scorer(&path, 3).expect("matching horizon").is_ready());
        let err = load_scorer(&path, 4).expect_err("horizon differs");
        assert!(matches!(
            err,
            AppError::Artifact(ArtifactError::HorizonMismatch { .. })
        ));

        let _ = std::fs::remove_dir_all(path.parent().expect("artifact dir"));
    }
}
