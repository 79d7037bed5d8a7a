use crate::infra::{build_engine, load_scorer, RecommendRequest};
use bullpen::config::AppConfig;
use bullpen::error::AppError;
use bullpen::recommender::{FeatureEncoder, RecommendationResult};
use bullpen::telemetry;
use bullpen::training::{
    read_event_log, synthetic_events, train, FitOptions, TrainOptions, TrainingReport,
};
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// JSON file with `state` and `bullpen` fields
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Model artifact to score with (defaults to MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    /// Print the full explanation instead of the ranking table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TrainArgs {
    /// CSV event log with one row per reliever appearance
    #[arg(long, conflicts_with = "synthetic")]
    pub(crate) events: Option<PathBuf>,
    /// Generate this many seeded synthetic appearances instead of reading a log
    #[arg(long)]
    pub(crate) synthetic: Option<usize>,
    /// Seed for synthetic generation
    #[arg(long, default_value_t = 7)]
    pub(crate) seed: u64,
    /// Ridge penalty applied to every coefficient except the intercept
    #[arg(long, default_value_t = 0.1)]
    pub(crate) ridge: f64,
    /// Share of the most recent rows held out for validation
    #[arg(long, default_value_t = 0.3)]
    pub(crate) validation_fraction: f64,
    /// Where to write the artifact (defaults to MODEL_PATH)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

const DEFAULT_SYNTHETIC_ROWS: usize = 1000;

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let model_path = args
        .model
        .unwrap_or_else(|| config.model.artifact_path.clone());
    let scorer = load_scorer(&model_path, config.model.horizon_batters)?;
    let engine = build_engine(&config, scorer)?;

    let reader = BufReader::new(File::open(&args.input)?);
    let request: RecommendRequest = serde_json::from_reader(reader)
        .map_err(|err| AppError::Validation(format!("{}: {err}", args.input.display())))?;
    let (situation, bullpen) = request.into_domain()?;

    let result = engine.recommend(&situation, &bullpen)?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&result)
            .map_err(|err| AppError::Io(err.into()))?;
        println!("{rendered}");
    } else {
        print_ranking(&result);
    }
    Ok(())
}

fn print_ranking(result: &RecommendationResult) {
    println!("{}", result.explanation.summary);
    if result.all_unavailable {
        println!("WARNING: every reliever in this bullpen is marked unavailable");
    }
    println!();
    println!("{:<4} {:<16} {:>10} {:>10}  penalties", "rank", "reliever", "raw", "penalized");
    for (position, scored) in result.ranking.iter().enumerate() {
        let reasons = scored
            .reasons
            .iter()
            .map(|reason| reason.label())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<4} {:<16} {:>10.3} {:>10.3}  {}",
            position + 1,
            scored.id.as_str(),
            scored.raw_score,
            scored.penalized_score,
            if reasons.is_empty() { "-" } else { reasons.as_str() }
        );
    }
}

pub(crate) fn run_train(args: TrainArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let events = match &args.events {
        Some(path) => read_event_log(BufReader::new(File::open(path)?))?,
        None => synthetic_events(
            args.synthetic.unwrap_or(DEFAULT_SYNTHETIC_ROWS),
            args.seed,
        ),
    };

    let options = TrainOptions {
        fit: FitOptions {
            ridge: args.ridge,
            horizon_batters: config.model.horizon_batters,
        },
        validation_fraction: args.validation_fraction,
    };
    let outcome = train(&FeatureEncoder::default(), &events, &options)?;

    let out = args.out.unwrap_or(config.model.artifact_path);
    outcome.scorer.save(&out)?;

    print_report(&outcome.report);
    println!("Model artifact written to {}", out.display());
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!("Training rows:   {}", report.train_rows);
    println!("Validation rows: {}", report.validation_rows);
    match (report.validation_mae, report.baseline_mae) {
        (Some(mae), Some(baseline)) => {
            println!("Validation MAE:  {mae:.4}");
            println!("Baseline MAE:    {baseline:.4}");
        }
        _ => println!("Validation MAE:  n/a (no held-out rows)"),
    }
}
