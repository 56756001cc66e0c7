use crate::config::ConfigError;
use crate::engine::batch::{BatchError, LookupError, RecordError};
use crate::engine::record::ValidationError;
use crate::engine::scorer::ModelError;
use crate::ingest::SchemaError;
use crate::telemetry::TelemetryError;
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
    Schema(SchemaError),
    Validation(ValidationError),
    Model(ModelError),
    Batch(BatchError),
    NotFound(LookupError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Schema(err) => write!(f, "schema error: {}", err),
            AppError::Validation(err) => write!(f, "validation error: {}", err),
            AppError::Model(err) => write!(f, "model error: {}", err),
            AppError::Batch(err) => write!(f, "batch error: {}", err),
            AppError::NotFound(err) => write!(f, "{}", err),
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
            AppError::Schema(err) => Some(err),
            AppError::Validation(err) => Some(err),
            AppError::Model(err) => Some(err),
            AppError::Batch(err) => Some(err),
            AppError::NotFound(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Schema(_) | AppError::Validation(_) | AppError::Batch(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

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

impl From<SchemaError> for AppError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ModelError> for AppError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

impl From<BatchError> for AppError {
    fn from(value: BatchError) -> Self {
        Self::Batch(value)
    }
}

impl From<LookupError> for AppError {
    fn from(value: LookupError) -> Self {
        Self::NotFound(value)
    }
}

impl From<RecordError> for AppError {
    fn from(value: RecordError) -> Self {
        match value {
            RecordError::Validation(err) => Self::Validation(err),
            RecordError::Model { source, .. } => Self::Model(source),
        }
    }
}
