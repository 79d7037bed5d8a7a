//! Reliever recommendation: feature encoding, scoring, penalty rules, ranking.
//!
//! The scorer is an injected capability; everything else in this module is
//! pure computation, so a given situation, bullpen, and model always produce
//! the same ranking.

pub mod domain;
pub mod engine;
pub mod features;
pub mod penalty;
pub mod scorer;

#[cfg(test)]
mod tests;

pub use domain::{
    Candidate, CandidateFields, CandidateId, Hand, InvalidCandidate, InvalidSituation, Runners,
    Situation, SituationFields,
};
pub use engine::{
    ranking_order, CandidateExplanation, Explanation, RecommendError, RecommendationResult,
    RecommenderEngine, ScoredCandidate, DEFAULT_HORIZON_BATTERS,
};
pub use features::{
    FeatureEncoder, FeatureKind, FeatureValue, FeatureVector, PlatoonTable, FEATURE_SCHEMA,
};
pub use penalty::{
    InvalidPenaltyConfig, PenaltyAdjustment, PenaltyConfig, PenaltyOutcome, PenaltyPolicy,
    PenaltyReason, MIN_UNAVAILABLE_PENALTY,
};
pub use scorer::{ArtifactError, LinearScorer, Scorer, ScorerError, ScorerHandle, UnloadedScorer};
