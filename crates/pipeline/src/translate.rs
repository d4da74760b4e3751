//! Maps provider failures into envelopes and re-wraps envelopes across
//! layers.

use std::any::Any;

use common::{Error, ErrorCode, ErrorEnvelope};

/// Classify a transport/provider error as seen by `service`.
pub fn classify(err: &Error, service: &str) -> ErrorEnvelope {
    let (code, message, retryable) = match err {
        Error::Api { status, .. } => (ErrorCode::ApiError, err.to_string(), *status >= 500),
        Error::Http(_) | Error::Timeout(_) => (ErrorCode::ApiError, err.to_string(), true),
        Error::NotFound(_) => (ErrorCode::ApiError, "City not found".to_string(), false),
        Error::Parse(_) | Error::Json(_) => (ErrorCode::ParsingError, err.to_string(), false),
        Error::RateLimited { .. } => (ErrorCode::RateLimitError, err.to_string(), true),
        Error::Auth(_) | Error::Config(_) | Error::Io(_) | Error::Other(_) => {
            (ErrorCode::ServiceError, err.to_string(), false)
        }
    };
    ErrorEnvelope::new(code, message, service, retryable)
}

/// Re-wrap for an outer layer: the message survives, code, service and
/// retry decision belong to the wrapping layer.
pub fn rewrap(
    inner: ErrorEnvelope,
    code: ErrorCode,
    service: &str,
    retryable: bool,
) -> ErrorEnvelope {
    inner.rewrap(code, service, retryable)
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retryable() {
        let err = Error::Api {
            service: "Geocoding".into(),
            status: 500,
            message: "Internal Server Error".into(),
        };
        let env = classify(&err, "GeocodingStage");
        assert_eq!(env.code(), ErrorCode::ApiError);
        assert!(env.retryable());
        assert_eq!(env.message(), "Geocoding API error: 500 Internal Server Error");
        assert_eq!(env.service(), "GeocodingStage");
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let err = Error::Api {
            service: "Current Weather".into(),
            status: 401,
            message: "Unauthorized".into(),
        };
        assert!(!classify(&err, "CurrentWeatherStage").retryable());
    }

    #[test]
    fn test_not_found_maps_to_city_not_found() {
        let env = classify(&Error::NotFound("no candidates".into()), "GeocodingStage");
        assert_eq!(env.code(), ErrorCode::ApiError);
        assert_eq!(env.message(), "City not found");
        assert!(!env.retryable());
    }

    #[test]
    fn test_parse_and_timeout() {
        let parse = classify(&Error::Parse("bad body".into()), "ForecastStage");
        assert_eq!(parse.code(), ErrorCode::ParsingError);
        assert!(!parse.retryable());

        let timeout = classify(&Error::Timeout("Geocoding API timed out".into()), "GeocodingStage");
        assert_eq!(timeout.code(), ErrorCode::ApiError);
        assert!(timeout.retryable());
    }

    #[test]
    fn test_rate_limited() {
        let env = classify(&Error::RateLimited { retry_after_ms: 1000 }, "GeocodingStage");
        assert_eq!(env.code(), ErrorCode::RateLimitError);
        assert!(env.retryable());
    }

    #[test]
    fn test_rewrap_forces_layer_flag() {
        let inner = ErrorEnvelope::new(ErrorCode::ApiError, "boom", "GeocodingStage", true);
        let outer = rewrap(inner, ErrorCode::GeocodingError, "CurrentWeatherStage", false);
        assert_eq!(outer.code(), ErrorCode::GeocodingError);
        assert_eq!(outer.message(), "boom");
        assert!(!outer.retryable());
    }

    #[test]
    fn test_panic_message_variants() {
        let r = std::panic::catch_unwind(|| panic!("static text"));
        assert_eq!(panic_message(&*r.unwrap_err()), "static text");

        let r = std::panic::catch_unwind(|| panic!("formatted {}", 42));
        assert_eq!(panic_message(&*r.unwrap_err()), "formatted 42");
    }
}
