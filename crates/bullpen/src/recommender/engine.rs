use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{Candidate, CandidateId, InvalidCandidate, InvalidSituation, Situation};
use super::features::{FeatureEncoder, FeatureVector};
use super::penalty::{PenaltyAdjustment, PenaltyPolicy, PenaltyReason};
use super::scorer::{Scorer, ScorerError, ScorerHandle};

pub const DEFAULT_HORIZON_BATTERS: u32 = 3;

/// A candidate's scores after the penalty rules ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: CandidateId,
    pub available: bool,
    pub rest_days: u32,
    pub raw_score: f64,
    pub penalized_score: f64,
    pub reasons: Vec<PenaltyReason>,
}

impl ScoredCandidate {
    pub fn has_reason(&self, reason: PenaltyReason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// Everything needed to audit one candidate's position in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateExplanation {
    pub id: CandidateId,
    pub features: FeatureVector,
    pub raw_score: f64,
    pub penalized_score: f64,
    pub adjustments: Vec<PenaltyAdjustment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub scorer: String,
    pub horizon_batters: u32,
    pub situation: Situation,
    /// Same order as the ranking.
    pub candidates: Vec<CandidateExplanation>,
}

/// Ranked bullpen for one situation. `ranking[0]` is the recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommendation: ScoredCandidate,
    pub ranking: Vec<ScoredCandidate>,
    /// Set when even the best candidate is unavailable; callers should surface it.
    pub all_unavailable: bool,
    pub explanation: Explanation,
}

/// Failure of a single `recommend` call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecommendError {
    #[error(transparent)]
    InvalidSituation(#[from] InvalidSituation),
    #[error(transparent)]
    InvalidCandidate(#[from] InvalidCandidate),
    #[error("no candidates submitted")]
    EmptyRoster,
    #[error("scorer '{scorer}' has no trained model loaded")]
    ModelNotReady { scorer: String },
    #[error("scoring candidate '{candidate}' failed: {source}")]
    Scoring {
        candidate: CandidateId,
        source: ScorerError,
    },
}

/// Orchestrates encoding, scoring, penalties, ranking, and explanation.
/// Holds no per-request state; one instance serves concurrent callers.
#[derive(Debug)]
pub struct RecommenderEngine {
    scorer: Arc<ScorerHandle>,
    encoder: FeatureEncoder,
    policy: PenaltyPolicy,
    horizon_batters: u32,
}

struct Evaluation {
    scored: ScoredCandidate,
    explanation: CandidateExplanation,
}

impl RecommenderEngine {
    pub fn new(scorer: Arc<ScorerHandle>) -> Self {
        Self {
            scorer,
            encoder: FeatureEncoder::default(),
            policy: PenaltyPolicy::default(),
            horizon_batters: DEFAULT_HORIZON_BATTERS,
        }
    }

    pub fn with_encoder(mut self, encoder: FeatureEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_policy(mut self, policy: PenaltyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_horizon(mut self, horizon_batters: u32) -> Self {
        self.horizon_batters = horizon_batters;
        self
    }

    pub fn scorer(&self) -> &Arc<ScorerHandle> {
        &self.scorer
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn horizon_batters(&self) -> u32 {
        self.horizon_batters
    }

    pub fn recommend(
        &self,
        situation: &Situation,
        candidates: &[Candidate],
    ) -> Result<RecommendationResult, RecommendError> {
        if candidates.is_empty() {
            return Err(RecommendError::EmptyRoster);
        }
        validate_request(situation, candidates)?;

        // One snapshot for the whole request so a concurrent reload cannot mix models.
        let snapshot = self.scorer.snapshot();
        let scorer: &dyn Scorer = &**snapshot;
        if !scorer.is_ready() {
            return Err(RecommendError::ModelNotReady {
                scorer: scorer.name().to_string(),
            });
        }

        let outcomes: Vec<Result<Evaluation, RecommendError>> = candidates
            .par_iter()
            .map(|candidate| self.evaluate(scorer, situation, candidate))
            .collect();

        let mut evaluations = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            evaluations.push(outcome?);
        }

        evaluations.sort_by(|left, right| ranking_order(&left.scored, &right.scored));

        let (ranking, explanations): (Vec<_>, Vec<_>) = evaluations
            .into_iter()
            .map(|evaluation| (evaluation.scored, evaluation.explanation))
            .unzip();

        let recommendation = ranking[0].clone();
        let all_unavailable = !recommendation.available;
        let summary = summarize(&recommendation, self.horizon_batters, all_unavailable);

        if all_unavailable {
            warn!(
                candidates = ranking.len(),
                best = %recommendation.id,
                "every candidate is unavailable"
            );
        }
        info!(
            recommendation = %recommendation.id,
            penalized_score = recommendation.penalized_score,
            candidates = ranking.len(),
            "bullpen recommendation ranked"
        );

        Ok(RecommendationResult {
            recommendation,
            ranking,
            all_unavailable,
            explanation: Explanation {
                summary,
                scorer: scorer.name().to_string(),
                horizon_batters: self.horizon_batters,
                situation: situation.clone(),
                candidates: explanations,
            },
        })
    }

    fn evaluate(
        &self,
        scorer: &dyn Scorer,
        situation: &Situation,
        candidate: &Candidate,
    ) -> Result<Evaluation, RecommendError> {
        let features = self.encoder.encode(situation, candidate);
        let raw_score = scorer.score(&features).map_err(|source| match source {
            ScorerError::ModelNotReady => RecommendError::ModelNotReady {
                scorer: scorer.name().to_string(),
            },
            source => RecommendError::Scoring {
                candidate: candidate.id().clone(),
                source,
            },
        })?;
        let outcome = self.policy.apply(raw_score, candidate);

        debug!(
            candidate = %candidate.id(),
            raw_score,
            penalized_score = outcome.penalized_score,
            adjustments = outcome.adjustments.len(),
            "candidate scored"
        );

        Ok(Evaluation {
            scored: ScoredCandidate {
                id: candidate.id().clone(),
                available: candidate.available(),
                rest_days: candidate.rest_days(),
                raw_score,
                penalized_score: outcome.penalized_score,
                reasons: outcome.reasons(),
            },
            explanation: CandidateExplanation {
                id: candidate.id().clone(),
                features,
                raw_score,
                penalized_score: outcome.penalized_score,
                adjustments: outcome.adjustments,
                notes: candidate.notes().map(str::to_string),
            },
        })
    }
}

fn validate_request(situation: &Situation, candidates: &[Candidate]) -> Result<(), RecommendError> {
    situation.validate()?;

    let mut seen = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        candidate.validate()?;
        if !seen.insert(candidate.id()) {
            return Err(InvalidCandidate::new(
                candidate.id().clone(),
                "id",
                "appears more than once in the bullpen",
            )
            .into());
        }
    }
    Ok(())
}

/// Available before unavailable, then penalized score ascending, then more
/// rest, then identifier. Total, so identical requests rank identically.
pub fn ranking_order(left: &ScoredCandidate, right: &ScoredCandidate) -> Ordering {
    right
        .available
        .cmp(&left.available)
        .then_with(|| left.penalized_score.total_cmp(&right.penalized_score))
        .then_with(|| right.rest_days.cmp(&left.rest_days))
        .then_with(|| left.id.cmp(&right.id))
}

fn summarize(best: &ScoredCandidate, horizon_batters: u32, all_unavailable: bool) -> String {
    let mut summary = format!(
        "{} projects {:.3} runs over the next {} batters",
        best.id, best.raw_score, horizon_batters
    );
    if !best.reasons.is_empty() {
        let labels: Vec<&str> = best.reasons.iter().map(|reason| reason.label()).collect();
        summary.push_str(&format!(" (penalized: {})", labels.join(", ")));
    }
    if all_unavailable {
        summary.push_str("; no available reliever, best of an unavailable bullpen");
    }
    summary
}
