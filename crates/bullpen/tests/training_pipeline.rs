use std::sync::Arc;

use bullpen::recommender::{
    Candidate, CandidateFields, CandidateId, FeatureEncoder, Hand, LinearScorer,
    RecommenderEngine, Runners, Scorer, ScorerHandle, Situation, SituationFields,
};
use bullpen::training::{read_event_log, synthetic_events, train, write_event_log, TrainOptions};

fn artifact_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("bullpen-pipeline-{}", std::process::id()))
        .join(name)
}

#[test]
fn synthetic_log_trains_a_servable_model() {
    let events = synthetic_events(300, 7);
    let mut log = Vec::new();
    write_event_log(&mut log, &events).expect("log written");
    let parsed = read_event_log(log.as_slice()).expect("log parses");

    let encoder = FeatureEncoder::default();
    let outcome = train(&encoder, &parsed, &TrainOptions::default()).expect("model fitted");
    let mae = outcome.report.validation_mae.expect("held-out rows");
    assert!(mae < outcome.report.baseline_mae.expect("held-out rows"));

    let path = artifact_path("model.json");
    outcome.scorer.save(&path).expect("artifact saved");
    let loaded = LinearScorer::from_path(&path).expect("artifact loads");
    assert_eq!(loaded.intercept, outcome.scorer.intercept);

    let handle = Arc::new(ScorerHandle::unloaded());
    handle.replace(loaded);
    let engine = RecommenderEngine::new(handle).with_encoder(encoder);

    let situation = Situation::new(SituationFields {
        outs: 2,
        runners: Runners::FirstThird,
        inning: 9,
        score_diff: 0,
        home: false,
        park_id: 2,
        batter_segment: 3,
        leverage_hint: None,
    })
    .expect("valid situation");
    let bullpen: Vec<Candidate> = [("tired", 0, 30), ("fresh", 2, 12)]
        .into_iter()
        .map(|(id, rest_days, pitches_last_outing)| {
            Candidate::new(CandidateFields {
                id: CandidateId::from(id),
                throws: Hand::Right,
                rest_days,
                pitches_last_outing,
                available: true,
                notes: None,
            })
            .expect("valid candidate")
        })
        .collect();

    let result = engine.recommend(&situation, &bullpen).expect("ranked");
    assert_eq!(result.recommendation.id.as_str(), "fresh");
    assert_eq!(result.explanation.scorer, "linear");

    let _ = std::fs::remove_dir_all(path.parent().expect("artifact dir"));
}

#[test]
fn training_and_serving_encode_the_same_columns() {
    let events = synthetic_events(5, 21);
    let encoder = FeatureEncoder::default();
    for (row, event) in events.iter().enumerate() {
        let (situation, candidate) = event.to_domain(row).expect("valid event");
        let served = encoder.encode(&situation, &candidate);
        let trained = encoder.encode_batch([(&situation, &candidate)]);
        assert_eq!(trained, vec![served]);
    }

    let scorer = train(&encoder, &synthetic_events(60, 5), &TrainOptions::default())
        .expect("model fitted")
        .scorer;
    assert!(scorer.is_ready());
}
