//! Domain types shared across the poster.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ── City ──────────────────────────────────────────────────────────────

/// A validated, non-blank city name as typed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct City(String);

impl City {
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key; case-insensitive so "Lisboa" and "LISBOA" share a record.
    pub fn cache_key(&self) -> String {
        format!("weather:{}", self.0.to_lowercase())
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Provider data ─────────────────────────────────────────────────────

/// Resolved location for a city. First geocoding candidate wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub resolved_city_name: String,
    pub country_code: String,
}

/// Current conditions in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_celsius: f64,
    pub condition: String,
    pub humidity_pct: u8,
    pub resolved_city_name: String,
    pub country_code: String,
}

/// One raw forecast point, temperature as delivered (Kelvin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Provider reference time of the sample.
    pub timestamp: NaiveDateTime,
    pub temperature_kelvin: f64,
}

/// Mean temperature for one future calendar day, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAverage {
    pub date: NaiveDate,
    pub average_temperature_celsius: f64,
}

// ── Outputs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub text: String,
}

/// What the social feed returned for a new post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub post_id: String,
    pub text: String,
}

/// Success payload of a full build-and-publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherPost {
    pub success: bool,
    pub city: String,
    pub weather_report: String,
    pub tweet_id: String,
    pub tweet_text: String,
}

impl WeatherPost {
    pub fn new(city: &City, report: &WeatherReport, published: PublishResult) -> Self {
        Self {
            success: true,
            city: city.to_string(),
            weather_report: report.text.clone(),
            tweet_id: published.post_id,
            tweet_text: published.text,
        }
    }
}
