use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::recommender::domain::{
    Candidate, CandidateFields, CandidateId, Hand, Runners, Situation, SituationFields,
};
use crate::recommender::features::FeatureVector;
use crate::recommender::scorer::{Scorer, ScorerError, ScorerHandle};
use crate::recommender::RecommenderEngine;

/// One out, runner on second, top of the eighth, up one, at home.
pub(super) fn situation_fields() -> SituationFields {
    SituationFields {
        outs: 1,
        runners: Runners::Second,
        inning: 8,
        score_diff: 1,
        home: true,
        park_id: 3,
        batter_segment: 2,
        leverage_hint: None,
    }
}

pub(super) fn situation() -> Situation {
    Situation::new(situation_fields()).expect("valid situation")
}

pub(super) fn candidate(
    id: &str,
    throws: Hand,
    rest_days: u32,
    pitches_last_outing: u32,
    available: bool,
) -> Candidate {
    Candidate::new(CandidateFields {
        id: CandidateId::from(id),
        throws,
        rest_days,
        pitches_last_outing,
        available,
        notes: None,
    })
    .expect("valid candidate")
}

pub(super) fn overused_righty() -> Candidate {
    candidate("A", Hand::Right, 0, 25, true)
}

pub(super) fn rested_lefty() -> Candidate {
    candidate("B", Hand::Left, 3, 10, true)
}

/// Scores every feature vector with the same value.
pub(super) struct ConstantScorer(pub(super) f64);

impl Scorer for ConstantScorer {
    fn score(&self, _features: &FeatureVector) -> Result<f64, ScorerError> {
        Ok(self.0)
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Delegates to a closure so tests can key raw scores off features.
pub(super) struct FnScorer<F>(pub(super) F);

impl<F> Scorer for FnScorer<F>
where
    F: Fn(&FeatureVector) -> f64 + Send + Sync,
{
    fn score(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
        Ok((self.0)(features))
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Counts calls; shares the counter so tests can inspect it after handing the scorer off.
#[derive(Clone, Default)]
pub(super) struct CountingScorer {
    pub(super) calls: Arc<AtomicUsize>,
}

impl CountingScorer {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Scorer for CountingScorer {
    fn score(&self, _features: &FeatureVector) -> Result<f64, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(0.5)
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "counting"
    }
}

pub(super) fn engine_with<S>(scorer: S) -> RecommenderEngine
where
    S: Scorer + 'static,
{
    RecommenderEngine::new(Arc::new(ScorerHandle::new(scorer)))
}
