use serde::{Deserialize, Serialize};

use super::domain::{Candidate, Hand, Situation};

/// Innings from which a game counts as late.
pub const LATE_INNING_THRESHOLD: u32 = 7;
/// Pitch count in the previous outing above which a reliever is flagged fatigued.
pub const FATIGUE_PITCH_THRESHOLD: u32 = 20;
/// Rest days beyond this are treated as fully rested.
pub const REST_DAYS_CAP: u32 = 5;

const LEVERAGE_LATE_WEIGHT: f64 = 0.7;
const LEVERAGE_CLOSE_WEIGHT: f64 = 0.6;
const LEVERAGE_TRAFFIC_WEIGHT: f64 = 0.5;

/// Whether a feature is fed to the scorer as a number or as a category code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// Column names, in order, shared by training and serving. Reordering or
/// renaming a column invalidates every trained model.
pub const FEATURE_SCHEMA: [(&str, FeatureKind); 12] = [
    ("outs", FeatureKind::Numeric),
    ("runners_on", FeatureKind::Numeric),
    ("inning", FeatureKind::Numeric),
    ("close_game", FeatureKind::Numeric),
    ("late_inning", FeatureKind::Numeric),
    ("platoon", FeatureKind::Numeric),
    ("rest_days", FeatureKind::Numeric),
    ("fatigued", FeatureKind::Numeric),
    ("home", FeatureKind::Numeric),
    ("park_id", FeatureKind::Categorical),
    ("batter_segment", FeatureKind::Categorical),
    ("leverage_proxy", FeatureKind::Numeric),
];

/// A single encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Categorical(u32),
    Numeric(f64),
}

/// Encoded (situation, candidate) pair. Field order matches [`FEATURE_SCHEMA`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub outs: u8,
    pub runners_on: u8,
    pub inning: u32,
    pub close_game: u8,
    pub late_inning: u8,
    pub platoon: u8,
    pub rest_days: u32,
    pub fatigued: u8,
    pub home: u8,
    pub park_id: u32,
    pub batter_segment: u8,
    pub leverage_proxy: f64,
}

impl FeatureVector {
    /// Values in schema order.
    pub fn values(&self) -> [(&'static str, FeatureValue); 12] {
        [
            ("outs", FeatureValue::Numeric(f64::from(self.outs))),
            ("runners_on", FeatureValue::Numeric(f64::from(self.runners_on))),
            ("inning", FeatureValue::Numeric(f64::from(self.inning))),
            ("close_game", FeatureValue::Numeric(f64::from(self.close_game))),
            ("late_inning", FeatureValue::Numeric(f64::from(self.late_inning))),
            ("platoon", FeatureValue::Numeric(f64::from(self.platoon))),
            ("rest_days", FeatureValue::Numeric(f64::from(self.rest_days))),
            ("fatigued", FeatureValue::Numeric(f64::from(self.fatigued))),
            ("home", FeatureValue::Numeric(f64::from(self.home))),
            ("park_id", FeatureValue::Categorical(self.park_id)),
            (
                "batter_segment",
                FeatureValue::Categorical(u32::from(self.batter_segment)),
            ),
            ("leverage_proxy", FeatureValue::Numeric(self.leverage_proxy)),
        ]
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.values()
            .into_iter()
            .find(|(column, _)| *column == name)
            .and_then(|(_, value)| match value {
                FeatureValue::Numeric(number) => Some(number),
                FeatureValue::Categorical(_) => None,
            })
    }
}

/// Expected handedness of the next hitters for each part of the batting order.
///
/// A reliever holds the platoon advantage when throwing with the same hand
/// the expected hitters bat from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatoonTable {
    pub top: Hand,
    pub middle: Hand,
    pub bottom: Hand,
}

impl Default for PlatoonTable {
    fn default() -> Self {
        Self {
            top: Hand::Left,
            middle: Hand::Right,
            bottom: Hand::Right,
        }
    }
}

impl PlatoonTable {
    pub fn expected_batter(&self, batter_segment: u8) -> Hand {
        match batter_segment {
            1 => self.top,
            2 => self.middle,
            _ => self.bottom,
        }
    }

    pub fn has_advantage(&self, throws: Hand, batter_segment: u8) -> bool {
        self.expected_batter(batter_segment) == throws
    }
}

/// Stateless encoder producing the scorer's input schema.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    platoon: PlatoonTable,
}

impl FeatureEncoder {
    pub fn new(platoon: PlatoonTable) -> Self {
        Self { platoon }
    }

    pub fn platoon(&self) -> &PlatoonTable {
        &self.platoon
    }

    pub fn encode(&self, situation: &Situation, candidate: &Candidate) -> FeatureVector {
        let outs = situation.outs().min(2);
        let runners_on = situation.runners().occupied();
        let inning = situation.inning();
        let close_game = u8::from(situation.score_diff().unsigned_abs() <= 1);
        let late_inning = u8::from(inning >= LATE_INNING_THRESHOLD);
        let platoon = u8::from(
            self.platoon
                .has_advantage(candidate.throws(), situation.batter_segment()),
        );
        let leverage_proxy = situation.leverage_hint().unwrap_or_else(|| {
            LEVERAGE_LATE_WEIGHT * f64::from(late_inning)
                + LEVERAGE_CLOSE_WEIGHT * f64::from(close_game)
                + LEVERAGE_TRAFFIC_WEIGHT * f64::from(u8::from(runners_on >= 2))
        });

        FeatureVector {
            outs,
            runners_on,
            inning,
            close_game,
            late_inning,
            platoon,
            rest_days: candidate.rest_days().min(REST_DAYS_CAP),
            fatigued: u8::from(candidate.pitches_last_outing() > FATIGUE_PITCH_THRESHOLD),
            home: u8::from(situation.home()),
            park_id: situation.park_id(),
            batter_segment: situation.batter_segment(),
            leverage_proxy,
        }
    }

    /// Row-wise [`encode`](Self::encode) for building training tables.
    pub fn encode_batch<'a, I>(&self, rows: I) -> Vec<FeatureVector>
    where
        I: IntoIterator<Item = (&'a Situation, &'a Candidate)>,
    {
        rows.into_iter()
            .map(|(situation, candidate)| self.encode(situation, candidate))
            .collect()
    }
}
