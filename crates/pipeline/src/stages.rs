//! Fetch stages and report assembly.
//!
//! Each stage serves from the cache when its field is fresh, otherwise
//! spends one rate-limiter slot on a bounded provider call and writes
//! the result back. Failures leave as envelopes named after the stage.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use common::{
    City, Coordinates, CurrentConditions, DailyAverage, Error, ErrorCode, ErrorEnvelope,
    ForecastSample, WeatherReport,
};
use openweather_client::{CURRENT_WEATHER_SERVICE, FORECAST_SERVICE, GEOCODING_SERVICE};

use crate::aggregate;
use crate::api::WeatherApi;
use crate::cache::FreshnessCache;
use crate::clock::Clock;
use crate::rate_limit::RateLimiter;
use crate::report;
use crate::translate::{classify, rewrap};

pub const GEOCODING_STAGE: &str = "GeocodingStage";
pub const CURRENT_WEATHER_STAGE: &str = "CurrentWeatherStage";
pub const FORECAST_STAGE: &str = "ForecastStage";
pub const REPORT_BUILDER: &str = "ReportBuilder";

pub type StageResult<T> = Result<T, ErrorEnvelope>;

/// Non-retryable `VALIDATION_ERROR` for blank input.
pub fn validate_city(raw: &str, service: &str) -> StageResult<City> {
    City::parse(raw).ok_or_else(|| ErrorEnvelope::validation(service, "City is required"))
}

pub struct Stages {
    weather: Arc<dyn WeatherApi>,
    cache: FreshnessCache,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    stage_timeout: Duration,
}

impl Stages {
    pub fn new(
        weather: Arc<dyn WeatherApi>,
        cache: FreshnessCache,
        limiter: RateLimiter,
        clock: Arc<dyn Clock>,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            weather,
            cache,
            limiter,
            clock,
            stage_timeout,
        }
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn geocode(&self, city: &City) -> StageResult<Coordinates> {
        if let Some(coords) = self.cache.fresh_coordinates(city, self.now()) {
            return Ok(coords);
        }

        info!("Geocoding request for city: {}", city);
        let coords = self
            .call(GEOCODING_SERVICE, GEOCODING_STAGE, self.weather.geocode(city.as_str()))
            .await?;

        debug!(
            "Resolved {} to {} ({}) at {:.4},{:.4}",
            city, coords.resolved_city_name, coords.country_code, coords.latitude, coords.longitude
        );
        self.cache.store_coordinates(city, coords.clone(), self.now());
        Ok(coords)
    }

    pub async fn current_weather(&self, city: &City) -> StageResult<CurrentConditions> {
        if let Some(current) = self.cache.fresh_current_weather(city, self.now()) {
            return Ok(current);
        }

        let coords = self
            .geocode(city)
            .await
            .map_err(|e| rewrap(e, ErrorCode::GeocodingError, CURRENT_WEATHER_STAGE, false))?;

        info!("Current weather request for city: {}", city);
        let current = self
            .call(
                CURRENT_WEATHER_SERVICE,
                CURRENT_WEATHER_STAGE,
                self.weather.current_weather(coords.latitude, coords.longitude),
            )
            .await?;

        self.cache.store_current_weather(city, current.clone(), self.now());
        Ok(current)
    }

    pub async fn forecast(&self, city: &City) -> StageResult<Vec<ForecastSample>> {
        if let Some(samples) = self.cache.fresh_forecast(city, self.now()) {
            return Ok(samples);
        }

        let coords = self
            .geocode(city)
            .await
            .map_err(|e| rewrap(e, ErrorCode::GeocodingError, FORECAST_STAGE, false))?;

        info!("Weather forecast request for city: {}", city);
        let samples = self
            .call(
                FORECAST_SERVICE,
                FORECAST_STAGE,
                self.weather.forecast(coords.latitude, coords.longitude),
            )
            .await?;

        self.cache.store_forecast(city, samples.clone(), self.now());
        Ok(samples)
    }

    /// Forecast reduced to daily averages for the days after today.
    pub async fn daily_forecast(&self, city: &City) -> StageResult<Vec<DailyAverage>> {
        let samples = self.forecast(city).await?;
        Ok(aggregate::daily_averages(&samples, self.now().date_naive()))
    }

    pub async fn build_report(&self, city: &City) -> StageResult<WeatherReport> {
        info!("Building weather report for city: {}", city);

        let current = self
            .current_weather(city)
            .await
            .map_err(|e| rewrap(e, ErrorCode::CurrentWeatherError, REPORT_BUILDER, false))?;
        let days = self
            .daily_forecast(city)
            .await
            .map_err(|e| rewrap(e, ErrorCode::ForecastError, REPORT_BUILDER, false))?;

        Ok(report::render(&current, &days, self.now().date_naive()))
    }

    async fn call<T, F>(&self, provider: &str, stage: &str, request: F) -> StageResult<T>
    where
        F: Future<Output = Result<T, Error>>,
    {
        if !self.limiter.try_acquire() {
            let retry_after_ms =
                u64::try_from(self.limiter.retry_after().as_millis()).unwrap_or(u64::MAX);
            warn!("{}: weather API budget exhausted, retry in {}ms", stage, retry_after_ms);
            return Err(classify(&Error::RateLimited { retry_after_ms }, stage));
        }

        let outcome = match tokio::time::timeout(self.stage_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{} API timed out after {}s",
                provider,
                self.stage_timeout.as_secs()
            ))),
        };

        outcome.map_err(|e| {
            let envelope = classify(&e, stage);
            error!("{} failed: {} (retryable={})", stage, envelope.message(), envelope.retryable());
            envelope
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTtls;
    use crate::testing::{fixed_clock, FakeWeather};

    fn stages_with(weather: Arc<FakeWeather>, limiter: RateLimiter) -> Stages {
        Stages::new(
            weather,
            FreshnessCache::in_memory(CacheTtls::default()),
            limiter,
            fixed_clock(),
            Duration::from_secs(10),
        )
    }

    fn city(name: &str) -> City {
        City::parse(name).unwrap()
    }

    #[test]
    fn test_validate_city() {
        let err = validate_city("  ", GEOCODING_STAGE).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.message(), "City is required");
        assert!(!err.retryable());
        assert_eq!(validate_city(" Lisboa ", GEOCODING_STAGE).unwrap().as_str(), "Lisboa");
    }

    #[tokio::test]
    async fn test_geocode_is_cached() {
        let weather = Arc::new(FakeWeather::sunny());
        let stages = stages_with(weather.clone(), RateLimiter::default());

        let a = stages.geocode(&city("São Paulo")).await.unwrap();
        let b = stages.geocode(&city("são paulo")).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(weather.geocode_calls(), 1);
    }

    #[tokio::test]
    async fn test_current_and_forecast_share_geocoding() {
        let weather = Arc::new(FakeWeather::sunny());
        let stages = stages_with(weather.clone(), RateLimiter::default());
        let c = city("São Paulo");

        stages.current_weather(&c).await.unwrap();
        stages.forecast(&c).await.unwrap();

        assert_eq!(weather.geocode_calls(), 1);
        assert_eq!(weather.current_calls(), 1);
        assert_eq!(weather.forecast_calls(), 1);
    }

    #[tokio::test]
    async fn test_geocoding_failure_wrapped_non_retryable() {
        let weather = Arc::new(FakeWeather::sunny().with_geocode_error(Error::Api {
            service: GEOCODING_SERVICE.into(),
            status: 500,
            message: "Internal Server Error".into(),
        }));
        let stages = stages_with(weather, RateLimiter::default());

        let direct = stages.geocode(&city("Lisboa")).await.unwrap_err();
        assert_eq!(direct.code(), ErrorCode::ApiError);
        assert!(direct.retryable());

        let err = stages.current_weather(&city("Lisboa")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeocodingError);
        assert_eq!(err.service(), CURRENT_WEATHER_STAGE);
        assert_eq!(err.message(), "Geocoding API error: 500 Internal Server Error");
        assert!(!err.retryable());

        let err = stages.forecast(&city("Lisboa")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GeocodingError);
        assert_eq!(err.service(), FORECAST_STAGE);
    }

    #[tokio::test]
    async fn test_city_not_found() {
        let weather = Arc::new(
            FakeWeather::sunny().with_geocode_error(Error::NotFound("City not found".into())),
        );
        let stages = stages_with(weather, RateLimiter::default());

        let err = stages.geocode(&city("Atlantis")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ApiError);
        assert_eq!(err.message(), "City not found");
        assert!(!err.retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_denial() {
        let weather = Arc::new(FakeWeather::sunny());
        let stages = stages_with(weather.clone(), RateLimiter::new(1, Duration::from_secs(60)));

        stages.geocode(&city("Lisboa")).await.unwrap();
        let err = stages.geocode(&city("Porto")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::RateLimitError);
        assert!(err.retryable());
        assert_eq!(weather.geocode_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout_is_retryable_api_error() {
        let weather = Arc::new(FakeWeather::sunny().with_delay(Duration::from_secs(60)));
        let stages = stages_with(weather, RateLimiter::default());

        let err = stages.geocode(&city("Lisboa")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ApiError);
        assert_eq!(err.message(), "Geocoding API timed out after 10s");
        assert!(err.retryable());
    }

    #[tokio::test]
    async fn test_report_layer_codes() {
        let weather = Arc::new(FakeWeather::sunny().with_current_error(Error::Api {
            service: CURRENT_WEATHER_SERVICE.into(),
            status: 503,
            message: "Service Unavailable".into(),
        }));
        let stages = stages_with(weather, RateLimiter::default());
        let err = stages.build_report(&city("Lisboa")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CurrentWeatherError);
        assert_eq!(err.service(), REPORT_BUILDER);
        assert!(!err.retryable());

        let weather = Arc::new(
            FakeWeather::sunny().with_forecast_error(Error::Parse("Invalid JSON".into())),
        );
        let stages = stages_with(weather, RateLimiter::default());
        let err = stages.build_report(&city("Lisboa")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ForecastError);
        assert_eq!(err.message(), "Invalid JSON");
    }

    #[tokio::test]
    async fn test_build_report_text() {
        let weather = Arc::new(FakeWeather::sunny());
        let stages = stages_with(weather, RateLimiter::default());

        let report = stages.build_report(&city("sao paulo")).await.unwrap();
        assert_eq!(
            report.text,
            "25°C e céu limpo em São Paulo em 01/01. \
             Média para os próximos dias: 19°C em 02/01, 22°C em 03/01."
        );
    }
}
