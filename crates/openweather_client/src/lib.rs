//! OpenWeatherMap API client.
//!
//! Covers the three endpoints the poster chains together: direct
//! geocoding, current weather (metric) and the 5-day / 3-hour forecast
//! (Kelvin, the provider default).

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime};
use common::config::EndpointsConfig;
use common::{Coordinates, CurrentConditions, Error, ForecastSample};
use serde::Deserialize;
use tracing::{debug, warn};

pub const GEOCODING_SERVICE: &str = "Geocoding";
pub const CURRENT_WEATHER_SERVICE: &str = "Current Weather";
pub const FORECAST_SERVICE: &str = "Weather Forecast";

const USER_AGENT: &str = "weather-poster/0.1";
const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// OpenWeatherMap client with connection pooling.
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    geocoding_base_url: String,
    weather_base_url: String,
}

impl fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("api_key", &"<redacted>")
            .field("geocoding_base_url", &self.geocoding_base_url)
            .field("weather_base_url", &self.weather_base_url)
            .finish()
    }
}

// ── OpenWeatherMap response types ─────────────────────────────────────

/// One entry of the `/geo/1.0/direct` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoCandidate {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: String,
}

/// `/data/2.5/weather` response (only the fields we read).
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sys: Option<SysBlock>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    #[serde(default)]
    pub humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionBlock {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct SysBlock {
    #[serde(default)]
    pub country: String,
}

/// `/data/2.5/forecast` response.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    #[serde(default)]
    pub dt: Option<i64>,
    #[serde(default)]
    pub dt_txt: Option<String>,
    pub main: ForecastMain,
}

#[derive(Debug, Deserialize)]
pub struct ForecastMain {
    pub temp: f64,
}

// ── Implementation ────────────────────────────────────────────────────

impl OpenWeatherClient {
    pub fn new(api_key: String, endpoints: &EndpointsConfig, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build OpenWeather HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            geocoding_base_url: endpoints.geocoding_base_url.trim_end_matches('/').to_string(),
            weather_base_url: endpoints.weather_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a city name. Only the first candidate is kept.
    pub async fn geocode(&self, city: &str) -> Result<Coordinates, Error> {
        let url = format!("{}/direct", self.geocoding_base_url);
        let body = self
            .get_body(
                GEOCODING_SERVICE,
                &url,
                &[("q", city.to_string()), ("limit", "1".to_string())],
            )
            .await?;

        parse_geocoding(&body)
    }

    pub async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentConditions, Error> {
        let url = format!("{}/weather", self.weather_base_url);
        let body = self
            .get_body(
                CURRENT_WEATHER_SERVICE,
                &url,
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("units", "metric".to_string()),
                ],
            )
            .await?;

        parse_current_weather(&body)
    }

    pub async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<ForecastSample>, Error> {
        let url = format!("{}/forecast", self.weather_base_url);
        let body = self
            .get_body(
                FORECAST_SERVICE,
                &url,
                &[("lat", lat.to_string()), ("lon", lon.to_string())],
            )
            .await?;

        let samples = parse_forecast(&body)?;
        debug!("Got {} forecast samples for ({lat},{lon})", samples.len());
        Ok(samples)
    }

    async fn get_body(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, Error> {
        debug!("Making {} request to: {}", service, url);

        let resp = self
            .client
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                "{} API error: {} {}",
                service,
                status.as_u16(),
                body.chars().take(500).collect::<String>()
            );
            return Err(Error::Api {
                service: service.to_string(),
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        resp.text().await.map_err(|e| transport_error(service, e))
    }
}

fn transport_error(service: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{service} API timed out"))
    } else {
        Error::Http(format!("{service} request failed: {e}"))
    }
}

fn parse_geocoding(body: &str) -> Result<Coordinates, Error> {
    let candidates: Vec<GeoCandidate> = serde_json::from_str(body).map_err(|e| {
        warn!("JSON parsing error: {}", e);
        Error::Parse("Invalid JSON response from geocoding API".into())
    })?;

    let Some(first) = candidates.into_iter().next() else {
        return Err(Error::NotFound("City not found".into()));
    };

    Ok(Coordinates {
        latitude: first.lat,
        longitude: first.lon,
        resolved_city_name: first.name,
        country_code: first.country,
    })
}

fn parse_current_weather(body: &str) -> Result<CurrentConditions, Error> {
    let data: CurrentWeatherResponse = serde_json::from_str(body).map_err(|e| {
        warn!("JSON parsing error: {}", e);
        Error::Parse("Invalid JSON response from weather API".into())
    })?;

    let condition = data
        .weather
        .into_iter()
        .next()
        .map(|w| w.description)
        .ok_or_else(|| Error::Parse("Weather API response has no conditions".into()))?;

    Ok(CurrentConditions {
        temperature_celsius: data.main.temp,
        condition,
        humidity_pct: data.main.humidity.unwrap_or(0),
        resolved_city_name: data.name,
        country_code: data.sys.map(|s| s.country).unwrap_or_default(),
    })
}

fn parse_forecast(body: &str) -> Result<Vec<ForecastSample>, Error> {
    let data: ForecastResponse = serde_json::from_str(body).map_err(|e| {
        warn!("JSON parsing error: {}", e);
        Error::Parse("Invalid JSON response from forecast API".into())
    })?;

    data.list
        .into_iter()
        .map(|entry| {
            let timestamp = sample_time(&entry).ok_or_else(|| {
                Error::Parse("Forecast sample without a usable timestamp".into())
            })?;
            Ok(ForecastSample {
                timestamp,
                temperature_kelvin: entry.main.temp,
            })
        })
        .collect()
}

/// `dt_txt` is the provider's reference time; `dt` is the fallback.
fn sample_time(entry: &ForecastEntry) -> Option<NaiveDateTime> {
    entry
        .dt_txt
        .as_deref()
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, DT_TXT_FORMAT).ok())
        .or_else(|| {
            entry
                .dt
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.naive_utc())
        })
}
