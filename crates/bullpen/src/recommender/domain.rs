use std::fmt;

use serde::{Deserialize, Serialize};

/// Base occupancy, one of the eight canonical states. Wire codes use one
/// character per base, `-` for empty (`"1-3"` is first and third).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Runners {
    Empty,
    First,
    Second,
    Third,
    FirstSecond,
    FirstThird,
    SecondThird,
    Loaded,
}

impl Runners {
    pub const ALL: [Runners; 8] = [
        Runners::Empty,
        Runners::First,
        Runners::Second,
        Runners::Third,
        Runners::FirstSecond,
        Runners::FirstThird,
        Runners::SecondThird,
        Runners::Loaded,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Runners::Empty => "---",
            Runners::First => "1--",
            Runners::Second => "-2-",
            Runners::Third => "--3",
            Runners::FirstSecond => "12-",
            Runners::FirstThird => "1-3",
            Runners::SecondThird => "-23",
            Runners::Loaded => "123",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|runners| runners.code() == code.trim())
    }

    /// Number of occupied bases (0-3).
    pub const fn occupied(self) -> u8 {
        match self {
            Runners::Empty => 0,
            Runners::First | Runners::Second | Runners::Third => 1,
            Runners::FirstSecond | Runners::FirstThird | Runners::SecondThird => 2,
            Runners::Loaded => 3,
        }
    }
}

impl fmt::Display for Runners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for Runners {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Runners::from_code(&value).ok_or_else(|| format!("unknown base state '{value}'"))
    }
}

impl From<Runners> for String {
    fn from(value: Runners) -> Self {
        value.code().to_string()
    }
}

/// Throwing hand of a pitcher, or batting side of a hitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    #[serde(rename = "R", alias = "r")]
    Right,
    #[serde(rename = "L", alias = "l")]
    Left,
}

impl Hand {
    pub const fn code(self) -> &'static str {
        match self {
            Hand::Right => "R",
            Hand::Left => "L",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "R" | "r" => Some(Hand::Right),
            "L" | "l" => Some(Hand::Left),
            _ => None,
        }
    }
}

/// Game context at the moment a reliever is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SituationFields")]
pub struct Situation {
    outs: u8,
    runners: Runners,
    inning: u32,
    score_diff: i32,
    home: bool,
    park_id: u32,
    batter_segment: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    leverage_hint: Option<f64>,
}

/// Unchecked field bag used to build a [`Situation`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SituationFields {
    pub outs: u8,
    pub runners: Runners,
    pub inning: u32,
    pub score_diff: i32,
    pub home: bool,
    pub park_id: u32,
    pub batter_segment: u8,
    #[serde(default)]
    pub leverage_hint: Option<f64>,
}

impl Situation {
    pub fn new(fields: SituationFields) -> Result<Self, InvalidSituation> {
        let situation = Self {
            outs: fields.outs,
            runners: fields.runners,
            inning: fields.inning,
            score_diff: fields.score_diff,
            home: fields.home,
            park_id: fields.park_id,
            batter_segment: fields.batter_segment,
            leverage_hint: fields.leverage_hint,
        };
        situation.validate()?;
        Ok(situation)
    }

    /// Checks the value invariants; the engine repeats this before scoring.
    pub fn validate(&self) -> Result<(), InvalidSituation> {
        if self.outs > 2 {
            return Err(InvalidSituation::new(
                "outs",
                format!("{} is outside 0..=2", self.outs),
            ));
        }
        if self.inning == 0 {
            return Err(InvalidSituation::new("inning", "must be at least 1"));
        }
        if !(1..=3).contains(&self.batter_segment) {
            return Err(InvalidSituation::new(
                "batter_segment",
                format!("{} is not one of 1, 2, 3", self.batter_segment),
            ));
        }
        if let Some(hint) = self.leverage_hint {
            if !hint.is_finite() {
                return Err(InvalidSituation::new("leverage_hint", "must be finite"));
            }
        }
        Ok(())
    }

    pub fn outs(&self) -> u8 {
        self.outs
    }

    pub fn runners(&self) -> Runners {
        self.runners
    }

    pub fn inning(&self) -> u32 {
        self.inning
    }

    pub fn score_diff(&self) -> i32 {
        self.score_diff
    }

    pub fn home(&self) -> bool {
        self.home
    }

    pub fn park_id(&self) -> u32 {
        self.park_id
    }

    pub fn batter_segment(&self) -> u8 {
        self.batter_segment
    }

    pub fn leverage_hint(&self) -> Option<f64> {
        self.leverage_hint
    }
}

impl TryFrom<SituationFields> for Situation {
    type Error = InvalidSituation;

    fn try_from(value: SituationFields) -> Result<Self, Self::Error> {
        Situation::new(value)
    }
}

/// Identifier of a reliever, unique within one request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A reliever under consideration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CandidateFields")]
pub struct Candidate {
    id: CandidateId,
    throws: Hand,
    rest_days: u32,
    pitches_last_outing: u32,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

/// Unchecked field bag used to build a [`Candidate`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CandidateFields {
    pub id: CandidateId,
    pub throws: Hand,
    pub rest_days: u32,
    pub pitches_last_outing: u32,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_available() -> bool {
    true
}

impl Candidate {
    pub fn new(fields: CandidateFields) -> Result<Self, InvalidCandidate> {
        let candidate = Self {
            id: fields.id,
            throws: fields.throws,
            rest_days: fields.rest_days,
            pitches_last_outing: fields.pitches_last_outing,
            available: fields.available,
            notes: fields.notes,
        };
        candidate.validate()?;
        Ok(candidate)
    }

    pub fn validate(&self) -> Result<(), InvalidCandidate> {
        if self.id.0.trim().is_empty() {
            return Err(InvalidCandidate::new(
                self.id.clone(),
                "id",
                "identifier must not be blank",
            ));
        }
        Ok(())
    }

    pub fn id(&self) -> &CandidateId {
        &self.id
    }

    pub fn throws(&self) -> Hand {
        self.throws
    }

    pub fn rest_days(&self) -> u32 {
        self.rest_days
    }

    pub fn pitches_last_outing(&self) -> u32 {
        self.pitches_last_outing
    }

    pub fn available(&self) -> bool {
        self.available
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl TryFrom<CandidateFields> for Candidate {
    type Error = InvalidCandidate;

    fn try_from(value: CandidateFields) -> Result<Self, Self::Error> {
        Candidate::new(value)
    }
}

/// Situation rejected because a field broke its invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid situation: {field} {detail}")]
pub struct InvalidSituation {
    pub field: &'static str,
    pub detail: String,
}

impl InvalidSituation {
    fn new(field: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field,
            detail: detail.into(),
        }
    }
}

/// Candidate rejected because a field broke its invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid candidate '{candidate}': {field} {detail}")]
pub struct InvalidCandidate {
    pub candidate: CandidateId,
    pub field: &'static str,
    pub detail: String,
}

impl InvalidCandidate {
    pub(crate) fn new(candidate: CandidateId, field: &'static str, detail: impl Into<String>) -> Self {
        Self {
            candidate,
            field,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_codes_map_to_occupied_bases() {
        let counts: Vec<u8> = Runners::ALL.iter().map(|r| r.occupied()).collect();
        assert_eq!(counts, vec![0, 1, 1, 1, 2, 2, 2, 3]);
        assert_eq!(Runners::from_code("-2-"), Some(Runners::Second));
        assert_eq!(Runners::from_code("2--"), None);
    }

    #[test]
    fn situation_deserialization_enforces_invariants() {
        let raw = r#"{"outs":3,"runners":"---","inning":8,"score_diff":0,"home":true,"park_id":1,"batter_segment":2}"#;
        let err = serde_json::from_str::<Situation>(raw).expect_err("three outs rejected");
        assert!(err.to_string().contains("outs"));

        let raw = r#"{"outs":1,"runners":"1-3","inning":8,"score_diff":0,"home":true,"park_id":1,"batter_segment":2}"#;
        let situation: Situation = serde_json::from_str(raw).expect("valid situation");
        assert_eq!(situation.runners(), Runners::FirstThird);
        assert_eq!(situation.leverage_hint(), None);
    }

    #[test]
    fn candidate_defaults_to_available() {
        let raw = r#"{"id":"A","throws":"L","rest_days":2,"pitches_last_outing":12}"#;
        let candidate: Candidate = serde_json::from_str(raw).expect("valid candidate");
        assert!(candidate.available());
        assert_eq!(candidate.throws(), Hand::Left);
        assert_eq!(candidate.notes(), None);
    }

    #[test]
    fn blank_candidate_id_is_rejected() {
        let err = Candidate::new(CandidateFields {
            id: CandidateId("  ".to_string()),
            throws: Hand::Right,
            rest_days: 1,
            pitches_last_outing: 10,
            available: true,
            notes: None,
        })
        .expect_err("blank id rejected");
        assert_eq!(err.field, "id");
    }

    #[test]
    fn batter_segment_outside_order_is_rejected() {
        let err = Situation::new(SituationFields {
            outs: 0,
            runners: Runners::Empty,
            inning: 7,
            score_diff: 0,
            home: false,
            park_id: 0,
            batter_segment: 4,
            leverage_hint: None,
        })
        .expect_err("segment 4 rejected");
        assert_eq!(err.field, "batter_segment");
    }
}
