use super::common::*;
use crate::recommender::domain::Hand;
use crate::recommender::penalty::{
    InvalidPenaltyConfig, PenaltyConfig, PenaltyPolicy, PenaltyReason,
};

#[test]
fn rested_available_reliever_keeps_raw_score() {
    let policy = PenaltyPolicy::default();
    let outcome = policy.apply(0.42, &rested_lefty());

    assert_eq!(outcome.penalized_score, 0.42);
    assert!(outcome.adjustments.is_empty());
}

#[test]
fn zero_rest_after_heavy_outing_is_overused() {
    let policy = PenaltyPolicy::default();
    let outcome = policy.apply(0.42, &overused_righty());

    assert_eq!(outcome.reasons(), vec![PenaltyReason::Overused]);
    assert!((outcome.penalized_score - (0.42 + 0.35)).abs() < 1e-12);
}

#[test]
fn overuse_requires_zero_rest_and_pitches_above_threshold() {
    let policy = PenaltyPolicy::default();

    let at_threshold = candidate("C", Hand::Right, 0, 20, true);
    assert!(policy.apply(0.3, &at_threshold).adjustments.is_empty());

    let one_day_rest = candidate("D", Hand::Right, 1, 40, true);
    assert!(policy.apply(0.3, &one_day_rest).adjustments.is_empty());
}

#[test]
fn penalties_accumulate_in_rule_order() {
    let policy = PenaltyPolicy::default();
    let tired_and_out = candidate("E", Hand::Left, 0, 35, false);

    let outcome = policy.apply(0.5, &tired_and_out);

    assert_eq!(
        outcome.reasons(),
        vec![PenaltyReason::Unavailable, PenaltyReason::Overused]
    );
    let expected = 0.5 + PenaltyConfig::default().unavailable_penalty + 0.35;
    assert!((outcome.penalized_score - expected).abs() < 1e-6);
}

#[test]
fn unavailable_penalty_dominates_any_available_score() {
    let policy = PenaltyPolicy::default();
    let available = candidate("F", Hand::Left, 0, 60, true);
    let unavailable = candidate("G", Hand::Left, 5, 0, false);

    for (available_raw, unavailable_raw) in [(0.0, 0.0), (25.0, 0.0), (9.5, -3.0), (100.0, 0.01)] {
        let kept = policy.apply(available_raw, &available).penalized_score;
        let benched = policy.apply(unavailable_raw, &unavailable).penalized_score;
        assert!(
            benched > kept,
            "unavailable {benched} must exceed available {kept}"
        );
    }
}

#[test]
fn thresholds_are_configurable() {
    let policy = PenaltyPolicy::new(PenaltyConfig {
        unavailable_penalty: 5_000.0,
        overuse_pitch_threshold: 30,
        overuse_penalty: 1.0,
    })
    .expect("valid penalties");

    assert!(policy.apply(0.2, &overused_righty()).adjustments.is_empty());

    let heavy = candidate("H", Hand::Right, 0, 31, true);
    let outcome = policy.apply(0.2, &heavy);
    assert_eq!(outcome.reasons(), vec![PenaltyReason::Overused]);
    assert!((outcome.penalized_score - 1.2).abs() < 1e-12);
    assert!(outcome.adjustments[0].notes.contains("31 pitches"));
}

#[test]
fn unavailable_penalty_below_floor_is_rejected() {
    for unavailable_penalty in [0.0, 999.0, f64::NAN] {
        let result = PenaltyPolicy::new(PenaltyConfig {
            unavailable_penalty,
            ..PenaltyConfig::default()
        });
        assert!(matches!(
            result,
            Err(InvalidPenaltyConfig::UnavailableTooSmall { .. })
        ));
    }

    let result = PenaltyPolicy::new(PenaltyConfig {
        overuse_penalty: -0.1,
        ..PenaltyConfig::default()
    });
    assert_eq!(result.unwrap_err(), InvalidPenaltyConfig::NegativeOveruse(-0.1));
}
