//! In-process providers for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};

use common::{Coordinates, CurrentConditions, Error, ForecastSample, PublishResult};

use crate::api::{SocialFeed, WeatherApi};
use crate::clock::FixedClock;

/// 2024-01-01 12:00:00 UTC.
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()))
}

fn replay(err: &Error) -> Error {
    match err {
        Error::Http(m) => Error::Http(m.clone()),
        Error::Timeout(m) => Error::Timeout(m.clone()),
        Error::Api {
            service,
            status,
            message,
        } => Error::Api {
            service: service.clone(),
            status: *status,
            message: message.clone(),
        },
        Error::NotFound(m) => Error::NotFound(m.clone()),
        Error::Parse(m) => Error::Parse(m.clone()),
        Error::RateLimited { retry_after_ms } => Error::RateLimited {
            retry_after_ms: *retry_after_ms,
        },
        Error::Auth(m) => Error::Auth(m.clone()),
        other => Error::Other(other.to_string()),
    }
}

fn sample(ts: &str, kelvin: f64) -> ForecastSample {
    ForecastSample {
        timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
        temperature_kelvin: kelvin,
    }
}

#[derive(Default)]
pub struct FakeWeather {
    geocode_error: Option<Error>,
    current_error: Option<Error>,
    forecast_error: Option<Error>,
    forecast_panics: bool,
    delay: Option<Duration>,
    geocode_calls: AtomicUsize,
    current_calls: AtomicUsize,
    forecast_calls: AtomicUsize,
}

impl FakeWeather {
    /// São Paulo, 24.6°C, two future forecast days (19.35 and 22.0).
    pub fn sunny() -> Self {
        Self::default()
    }

    pub fn with_geocode_error(mut self, err: Error) -> Self {
        self.geocode_error = Some(err);
        self
    }

    pub fn with_current_error(mut self, err: Error) -> Self {
        self.current_error = Some(err);
        self
    }

    pub fn with_forecast_error(mut self, err: Error) -> Self {
        self.forecast_error = Some(err);
        self
    }

    pub fn with_forecast_panic(mut self) -> Self {
        self.forecast_panics = true;
        self
    }

    /// Every geocoding call sleeps this long first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn current_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    pub fn forecast_calls(&self) -> usize {
        self.forecast_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherApi for FakeWeather {
    async fn geocode(&self, _city: &str) -> Result<Coordinates, Error> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.geocode_error {
            return Err(replay(err));
        }
        Ok(Coordinates {
            latitude: -23.5505,
            longitude: -46.6333,
            resolved_city_name: "São Paulo".into(),
            country_code: "BR".into(),
        })
    }

    async fn current_weather(&self, _lat: f64, _lon: f64) -> Result<CurrentConditions, Error> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.current_error {
            return Err(replay(err));
        }
        Ok(CurrentConditions {
            temperature_celsius: 24.6,
            condition: "céu limpo".into(),
            humidity_pct: 65,
            resolved_city_name: "São Paulo".into(),
            country_code: "BR".into(),
        })
    }

    async fn forecast(&self, _lat: f64, _lon: f64) -> Result<Vec<ForecastSample>, Error> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        if self.forecast_panics {
            panic!("forecast exploded");
        }
        if let Some(err) = &self.forecast_error {
            return Err(replay(err));
        }
        Ok(vec![
            sample("2024-01-01 15:00:00", 300.0),
            sample("2024-01-01 18:00:00", 310.0),
            sample("2024-01-02 12:00:00", 290.0),
            sample("2024-01-02 15:00:00", 295.0),
            sample("2024-01-03 12:00:00", 295.0),
            sample("2024-01-03 15:00:00", 295.3),
        ])
    }
}

#[derive(Default)]
pub struct FakeFeed {
    error: Option<Error>,
    delay: Option<Duration>,
    posts: AtomicUsize,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, err: Error) -> Self {
        self.error = Some(err);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocialFeed for FakeFeed {
    async fn post(&self, text: &str) -> Result<PublishResult, Error> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.error {
            return Err(replay(err));
        }
        let n = self.posts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PublishResult {
            post_id: format!("17000000000000000{n:02}"),
            text: text.to_string(),
        })
    }
}
