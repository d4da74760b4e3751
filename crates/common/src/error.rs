//! Error types for the weather poster.
//!
//! `Error` is what the HTTP clients and the config loader return.
//! `ErrorEnvelope` is the normalized failure that crosses stage
//! boundaries and is finally handed to the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{service} API error: {status} {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Parse(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limit exceeded, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Closed set of codes an `ErrorEnvelope` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    GeocodingError,
    CurrentWeatherError,
    ForecastError,
    ApiError,
    ParsingError,
    ServiceError,
    RateLimitError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::GeocodingError => "GEOCODING_ERROR",
            Self::CurrentWeatherError => "CURRENT_WEATHER_ERROR",
            Self::ForecastError => "FORECAST_ERROR",
            Self::ApiError => "API_ERROR",
            Self::ParsingError => "PARSING_ERROR",
            Self::ServiceError => "SERVICE_ERROR",
            Self::RateLimitError => "RATE_LIMIT_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure as seen by the layer that produced or last re-wrapped it.
///
/// Built once where the failure happens. Outer layers go through
/// [`ErrorEnvelope::rewrap`], which may replace the code, message, service
/// and retryable flag but keeps the original timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ErrorEnvelope {
    code: ErrorCode,
    message: String,
    service: String,
    retryable: bool,
    timestamp: DateTime<Utc>,
}

impl ErrorEnvelope {
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        service: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            service: service.into(),
            retryable,
            timestamp: Utc::now(),
        }
    }

    /// Non-retryable `VALIDATION_ERROR`.
    pub fn validation(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message, service, false)
    }

    /// Re-wrap for an outer layer: new code, service and retry decision,
    /// same message and timestamp.
    pub fn rewrap(self, code: ErrorCode, service: impl Into<String>, retryable: bool) -> Self {
        Self {
            code,
            service: service.into(),
            retryable,
            ..self
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::CurrentWeatherError).unwrap();
        assert_eq!(json, "\"CURRENT_WEATHER_ERROR\"");

        let parsed: ErrorCode = serde_json::from_str("\"RATE_LIMIT_ERROR\"").unwrap();
        assert_eq!(parsed, ErrorCode::RateLimitError);
    }

    #[test]
    fn test_error_code_display_matches_wire_name() {
        assert_eq!(ErrorCode::ApiError.to_string(), "API_ERROR");
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_rewrap_keeps_message_and_timestamp() {
        let inner = ErrorEnvelope::new(
            ErrorCode::ApiError,
            "Geocoding API error: 500 Internal Server Error",
            "Geocoding",
            true,
        );
        let ts = inner.timestamp();

        let outer = inner.rewrap(ErrorCode::GeocodingError, "CurrentWeather", false);

        assert_eq!(outer.code(), ErrorCode::GeocodingError);
        assert_eq!(outer.message(), "Geocoding API error: 500 Internal Server Error");
        assert_eq!(outer.service(), "CurrentWeather");
        assert!(!outer.retryable());
        assert_eq!(outer.timestamp(), ts);
    }

    #[test]
    fn test_envelope_json_shape() {
        let env = ErrorEnvelope::validation("Orchestrator", "City is required");
        let value = serde_json::to_value(&env).unwrap();

        assert_eq!(value["code"], "VALIDATION_ERROR");
        assert_eq!(value["message"], "City is required");
        assert_eq!(value["service"], "Orchestrator");
        assert_eq!(value["retryable"], false);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            service: "Current Weather".into(),
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "Current Weather API error: 503 Service Unavailable");
    }
}
