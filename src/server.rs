//! HTTP surface: `POST /v1/tweets` and `GET /health`.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use common::{ErrorCode, ErrorEnvelope};
use pipeline::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

#[derive(Debug, Default, Deserialize)]
pub struct CityParams {
    pub city: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/tweets", post(create_tweet_handler))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!("Listening on {}", bind_addr);
    info!("Create post: POST http://{}/v1/tweets?city=<name>", bind_addr);

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}

pub async fn health_handler() -> &'static str {
    "ok"
}

/// `city` comes from the query string, falling back to a JSON body field.
pub async fn create_tweet_handler(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
    body: Bytes,
) -> Response {
    let city = params
        .city
        .or_else(|| city_from_body(&body))
        .unwrap_or_default();

    match state.orchestrator.post_weather(&city).await {
        Ok(post) => (StatusCode::CREATED, Json(post)).into_response(),
        Err(err) => error_response(err),
    }
}

fn city_from_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<CityParams>(body) {
        Ok(parsed) => parsed.city,
        Err(e) => {
            warn!("Ignoring unparseable request body: {}", e);
            None
        }
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::GeocodingError => StatusCode::NOT_FOUND,
        ErrorCode::ServiceError | ErrorCode::ApiError => StatusCode::BAD_GATEWAY,
        ErrorCode::RateLimitError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::CurrentWeatherError | ErrorCode::ForecastError | ErrorCode::ParsingError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: ErrorEnvelope) -> Response {
    let status = status_for(err.code());
    warn!("Request failed with {}: {}", err.code(), err.message());
    (status, Json(json!({ "error": err }))).into_response()
}
