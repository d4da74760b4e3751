//! Poster configuration types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level poster configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct PosterConfig {
    /// OpenWeatherMap API key.
    #[serde(default)]
    pub weather_api_key: String,

    /// X (Twitter) OAuth 1.0a user-context credentials.
    #[serde(default)]
    pub social: SocialCredentials,

    /// Per-field cache lifetimes.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Outbound weather-provider call budget.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Timeouts (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Provider base URLs.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Inbound HTTP surface.
    #[serde(default)]
    pub server: ServerConfig,
}

impl fmt::Debug for PosterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosterConfig")
            .field("weather_api_key", &"<redacted>")
            .field("social", &self.social)
            .field("cache", &self.cache)
            .field("rate_limit", &self.rate_limit)
            .field("timing", &self.timing)
            .field("endpoints", &self.endpoints)
            .field("server", &self.server)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SocialCredentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_key_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_secret: String,
}

impl SocialCredentials {
    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty()
            && !self.api_key_secret.trim().is_empty()
            && !self.access_token.trim().is_empty()
            && !self.access_token_secret.trim().is_empty()
    }
}

impl fmt::Debug for SocialCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialCredentials")
            .field("api_key", &"<redacted>")
            .field("api_key_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// Cache TTLs, in seconds, one per cached field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_coordinates_ttl")]
    pub coordinates_ttl_secs: u64,

    #[serde(default = "default_current_weather_ttl")]
    pub current_weather_ttl_secs: u64,

    #[serde(default = "default_forecast_ttl")]
    pub forecast_ttl_secs: u64,

    /// Also the de-duplication window for posts.
    #[serde(default = "default_published_report_ttl")]
    pub published_report_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Calls allowed per window.
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,

    #[serde(default = "default_window")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Upper bound for a single stage's outbound call.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,

    /// reqwest client timeout.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl TimingConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Geocoding API base (`{base}/direct`).
    #[serde(default = "default_geocoding_url")]
    pub geocoding_base_url: String,

    /// Weather data API base (`{base}/weather`, `{base}/forecast`).
    #[serde(default = "default_weather_url")]
    pub weather_base_url: String,

    /// X API base (`{base}/2/tweets`).
    #[serde(default = "default_social_url")]
    pub social_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_coordinates_ttl() -> u64 {
    24 * 60 * 60
}
fn default_current_weather_ttl() -> u64 {
    30 * 60
}
fn default_forecast_ttl() -> u64 {
    2 * 60 * 60
}
fn default_published_report_ttl() -> u64 {
    2 * 60 * 60
}

fn default_max_calls() -> u32 {
    60
}
fn default_window() -> u64 {
    60
}

fn default_stage_timeout() -> u64 {
    10
}
fn default_http_timeout() -> u64 {
    15
}

fn default_geocoding_url() -> String {
    "http://api.openweathermap.org/geo/1.0".into()
}
fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}
fn default_social_url() -> String {
    "https://api.twitter.com".into()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".into()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            coordinates_ttl_secs: default_coordinates_ttl(),
            current_weather_ttl_secs: default_current_weather_ttl(),
            forecast_ttl_secs: default_forecast_ttl(),
            published_report_ttl_secs: default_published_report_ttl(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            window_secs: default_window(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: default_stage_timeout(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            geocoding_base_url: default_geocoding_url(),
            weather_base_url: default_weather_url(),
            social_base_url: default_social_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            weather_api_key: String::new(),
            social: SocialCredentials::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            timing: TimingConfig::default(),
            endpoints: EndpointsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}
