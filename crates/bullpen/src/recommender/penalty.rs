use serde::{Deserialize, Serialize};

use super::domain::Candidate;

/// Lowest accepted unavailable penalty. Expected runs over a few batters stay
/// far below it, so an unavailable reliever always scores above an available one.
pub const MIN_UNAVAILABLE_PENALTY: f64 = 1_000.0;

/// Business-rule dials layered on top of the model's raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// Added to unavailable relievers; must exceed any plausible expected-runs score.
    pub unavailable_penalty: f64,
    /// Pitches in the previous outing above which a zero-rest reliever counts as overused.
    pub overuse_pitch_threshold: u32,
    pub overuse_penalty: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            unavailable_penalty: 1_000_000.0,
            overuse_pitch_threshold: 20,
            overuse_penalty: 0.35,
        }
    }
}

impl PenaltyConfig {
    pub fn validate(&self) -> Result<(), InvalidPenaltyConfig> {
        if !(self.unavailable_penalty.is_finite()
            && self.unavailable_penalty >= MIN_UNAVAILABLE_PENALTY)
        {
            return Err(InvalidPenaltyConfig::UnavailableTooSmall {
                found: self.unavailable_penalty,
                minimum: MIN_UNAVAILABLE_PENALTY,
            });
        }
        if !(self.overuse_penalty.is_finite() && self.overuse_penalty >= 0.0) {
            return Err(InvalidPenaltyConfig::NegativeOveruse(self.overuse_penalty));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidPenaltyConfig {
    #[error("unavailable penalty must be at least {minimum}, found {found}")]
    UnavailableTooSmall { found: f64, minimum: f64 },
    #[error("overuse penalty must be a non-negative number, found {0}")]
    NegativeOveruse(f64),
}

/// Tag explaining why a score was adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyReason {
    Unavailable,
    Overused,
}

impl PenaltyReason {
    pub const fn label(self) -> &'static str {
        match self {
            PenaltyReason::Unavailable => "unavailable",
            PenaltyReason::Overused => "overused",
        }
    }
}

/// One itemized adjustment, kept so audits can see every penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyAdjustment {
    pub reason: PenaltyReason,
    pub amount: f64,
    pub notes: String,
}

/// Penalized score plus the adjustments that produced it, in rule order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyOutcome {
    pub penalized_score: f64,
    pub adjustments: Vec<PenaltyAdjustment>,
}

impl PenaltyOutcome {
    pub fn reasons(&self) -> Vec<PenaltyReason> {
        self.adjustments
            .iter()
            .map(|adjustment| adjustment.reason)
            .collect()
    }
}

/// Deterministic rule set. Every rule is evaluated; penalties accumulate.
#[derive(Debug, Clone, Default)]
pub struct PenaltyPolicy {
    config: PenaltyConfig,
}

impl PenaltyPolicy {
    pub fn new(config: PenaltyConfig) -> Result<Self, InvalidPenaltyConfig> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PenaltyConfig {
        &self.config
    }

    pub fn apply(&self, raw_score: f64, candidate: &Candidate) -> PenaltyOutcome {
        let mut adjustments = Vec::new();

        if !candidate.available() {
            adjustments.push(PenaltyAdjustment {
                reason: PenaltyReason::Unavailable,
                amount: self.config.unavailable_penalty,
                notes: "reliever marked unavailable".to_string(),
            });
        }

        if candidate.rest_days() == 0
            && candidate.pitches_last_outing() > self.config.overuse_pitch_threshold
        {
            adjustments.push(PenaltyAdjustment {
                reason: PenaltyReason::Overused,
                amount: self.config.overuse_penalty,
                notes: format!(
                    "no rest after {} pitches (threshold {})",
                    candidate.pitches_last_outing(),
                    self.config.overuse_pitch_threshold
                ),
            });
        }

        let penalized_score = adjustments
            .iter()
            .fold(raw_score, |score, adjustment| score + adjustment.amount);

        PenaltyOutcome {
            penalized_score,
            adjustments,
        }
    }
}
