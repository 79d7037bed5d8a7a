use crate::config::ConfigError;
use crate::recommender::{ArtifactError, RecommendError};
use crate::telemetry::TelemetryError;
use crate::training::TrainingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Recommend(RecommendError),
    Artifact(ArtifactError),
    Training(TrainingError),
    /// Request rejected at the wire boundary before reaching the engine.
    Validation(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Recommend(
                RecommendError::InvalidSituation(_)
                | RecommendError::InvalidCandidate(_)
                | RecommendError::EmptyRoster,
            )
            | AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Recommend(RecommendError::ModelNotReady { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Artifact(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Recommend(RecommendError::Scoring { .. })
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Training(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Recommend(err) => write!(f, "recommendation error: {}", err),
            AppError::Artifact(err) => write!(f, "model artifact error: {}", err),
            AppError::Training(err) => write!(f, "training error: {}", err),
            AppError::Validation(detail) => write!(f, "invalid request: {}", detail),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Recommend(err) => Some(err),
            AppError::Artifact(err) => Some(err),
            AppError::Training(err) => Some(err),
            AppError::Validation(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RecommendError> for AppError {
    fn from(value: RecommendError) -> Self {
        Self::Recommend(value)
    }
}

impl From<ArtifactError> for AppError {
    fn from(value: ArtifactError) -> Self {
        Self::Artifact(value)
    }
}

impl From<TrainingError> for AppError {
    fn from(value: TrainingError) -> Self {
        Self::Training(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::{CandidateId, ScorerError};

    #[test]
    fn recommend_errors_map_to_client_and_server_statuses() {
        assert_eq!(
            AppError::from(RecommendError::EmptyRoster).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(RecommendError::ModelNotReady {
                scorer: "unloaded".to_string()
            })
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(RecommendError::Scoring {
                candidate: CandidateId::from("A"),
                source: ScorerError::NonFinite(f64::NAN),
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_names_the_failing_layer() {
        let err = AppError::from(RecommendError::EmptyRoster);
        assert_eq!(err.to_string(), "recommendation error: no candidates submitted");
    }
}
