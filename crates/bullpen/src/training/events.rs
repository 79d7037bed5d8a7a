use std::io::Read;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize};

use super::TrainingError;
use crate::recommender::{
    Candidate, CandidateFields, CandidateId, Hand, Runners, Situation, SituationFields,
};

/// One historical reliever appearance with the runs allowed over the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub outs: u8,
    pub runners: Runners,
    pub inning: u32,
    pub score_diff: i32,
    pub throws: Hand,
    pub rest_days: u32,
    pub pitches_last_outing: u32,
    #[serde(deserialize_with = "flag")]
    pub home: bool,
    pub park_id: u32,
    pub batter_segment: u8,
    pub runs: f64,
}

impl EventRecord {
    /// Rebuilds the domain values the live service would have seen.
    pub fn to_domain(&self, row: usize) -> Result<(Situation, Candidate), TrainingError> {
        let situation = Situation::new(SituationFields {
            outs: self.outs,
            runners: self.runners,
            inning: self.inning,
            score_diff: self.score_diff,
            home: self.home,
            park_id: self.park_id,
            batter_segment: self.batter_segment,
            leverage_hint: None,
        })
        .map_err(|err| TrainingError::InvalidRow {
            row,
            detail: err.to_string(),
        })?;

        let candidate = Candidate::new(CandidateFields {
            id: CandidateId(format!("event-{row}")),
            throws: self.throws,
            rest_days: self.rest_days,
            pitches_last_outing: self.pitches_last_outing,
            available: true,
            notes: None,
        })
        .map_err(|err| TrainingError::InvalidRow {
            row,
            detail: err.to_string(),
        })?;

        Ok((situation, candidate))
    }
}

/// Reads a CSV event log with a header row. Column order is free.
pub fn read_event_log<R: Read>(reader: R) -> Result<Vec<EventRecord>, TrainingError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut events = Vec::new();

    for record in csv_reader.deserialize::<EventRecord>() {
        let event = record?;
        if !event.runs.is_finite() || event.runs < 0.0 {
            return Err(TrainingError::InvalidRow {
                row: events.len() + 1,
                detail: format!("runs must be a non-negative number, found {}", event.runs),
            });
        }
        events.push(event);
    }

    Ok(events)
}

pub fn write_event_log<W: std::io::Write>(
    writer: W,
    events: &[EventRecord],
) -> Result<(), TrainingError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for event in events {
        csv_writer.serialize(event)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Seeded demonstration data: late, close, crowded, tired, and unrested
/// situations allow more runs.
pub fn synthetic_events(count: usize, seed: u64) -> Vec<EventRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut events = Vec::with_capacity(count);

    for _ in 0..count {
        let runners = Runners::ALL[rng.gen_range(0..Runners::ALL.len())];
        let inning: u32 = rng.gen_range(7..10);
        let score_diff: i32 = rng.gen_range(-3..=3);
        let rest_days: u32 = rng.gen_range(0..4);
        let pitches_last_outing: u32 = rng.gen_range(5..35);

        let late_and_close = inning >= 8 && score_diff.abs() <= 1;
        let runs = 0.2 * f64::from(u8::from(late_and_close))
            + 0.25 * f64::from(u8::from(runners != Runners::Empty))
            + 0.15 * f64::from(u8::from(rest_days == 0))
            + 0.08 * f64::from(u8::from(pitches_last_outing > 20))
            + rng.gen_range(-0.05..0.05);

        events.push(EventRecord {
            outs: rng.gen_range(0..3),
            runners,
            inning,
            score_diff,
            throws: if rng.gen_bool(0.7) {
                Hand::Right
            } else {
                Hand::Left
            },
            rest_days,
            pitches_last_outing,
            home: rng.gen_bool(0.5),
            park_id: rng.gen_range(1..4),
            batter_segment: rng.gen_range(1..4),
            runs: runs.max(0.0),
        });
    }

    events
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" => Ok(true),
        "0" | "false" | "f" | "no" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected 0/1 or true/false, found '{other}'"
        ))),
    }
}
