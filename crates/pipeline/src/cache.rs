//! Per-city cache with independent per-field freshness.
//!
//! One `CacheRecord` per normalized city key. Each field carries its own
//! `cached_at`; a field is fresh iff `now < cached_at + ttl(field)`.
//! Records are never deleted, only overwritten field by field.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::config::CacheConfig;
use common::{City, Coordinates, CurrentConditions, ForecastSample, WeatherPost};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cached<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> Cached<T> {
    pub fn new(value: T, cached_at: DateTime<Utc>) -> Self {
        Self { value, cached_at }
    }

    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now < self.cached_at + ttl
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub coordinates: Option<Cached<Coordinates>>,
    pub current_weather: Option<Cached<CurrentConditions>>,
    pub forecast: Option<Cached<Vec<ForecastSample>>>,
    pub published_report: Option<Cached<WeatherPost>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheField {
    Coordinates,
    CurrentWeather,
    Forecast,
    PublishedReport,
}

impl CacheField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinates => "coordinates",
            Self::CurrentWeather => "current_weather",
            Self::Forecast => "forecast",
            Self::PublishedReport => "published_report",
        }
    }
}

impl fmt::Display for CacheField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CacheRecord {
    pub fn cached_at(&self, field: CacheField) -> Option<DateTime<Utc>> {
        match field {
            CacheField::Coordinates => self.coordinates.as_ref().map(|c| c.cached_at),
            CacheField::CurrentWeather => self.current_weather.as_ref().map(|c| c.cached_at),
            CacheField::Forecast => self.forecast.as_ref().map(|c| c.cached_at),
            CacheField::PublishedReport => self.published_report.as_ref().map(|c| c.cached_at),
        }
    }
}

/// Key-value storage under the freshness policy.
///
/// `update` must be atomic per key: concurrent updates to different
/// fields of the same record may not lose each other's writes.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheRecord>;
    fn set(&self, key: &str, record: CacheRecord);
    fn update(&self, key: &str, f: &mut dyn FnMut(&mut CacheRecord));
}

/// Process-wide in-memory store. DashMap shards give per-key locking.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: DashMap<String, CacheRecord>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Option<CacheRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, record: CacheRecord) {
        self.records.insert(key.to_string(), record);
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(&mut CacheRecord)) {
        let mut entry = self.records.entry(key.to_string()).or_default();
        f(entry.value_mut());
    }
}

/// Upper bound on any TTL, keeps `cached_at + ttl` in range.
const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub coordinates: Duration,
    pub current_weather: Duration,
    pub forecast: Duration,
    pub published_report: Duration,
}

impl CacheTtls {
    pub fn from_config(cfg: &CacheConfig) -> Self {
        let secs = |s: u64| {
            Duration::seconds(i64::try_from(s).unwrap_or(MAX_TTL_SECS).min(MAX_TTL_SECS))
        };
        Self {
            coordinates: secs(cfg.coordinates_ttl_secs),
            current_weather: secs(cfg.current_weather_ttl_secs),
            forecast: secs(cfg.forecast_ttl_secs),
            published_report: secs(cfg.published_report_ttl_secs),
        }
    }

    pub fn ttl(&self, field: CacheField) -> Duration {
        match field {
            CacheField::Coordinates => self.coordinates,
            CacheField::CurrentWeather => self.current_weather,
            CacheField::Forecast => self.forecast,
            CacheField::PublishedReport => self.published_report,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// Freshness policy over a shared [`CacheStore`].
#[derive(Clone)]
pub struct FreshnessCache {
    store: Arc<dyn CacheStore>,
    ttls: CacheTtls,
}

impl FreshnessCache {
    pub fn new(store: Arc<dyn CacheStore>, ttls: CacheTtls) -> Self {
        Self { store, ttls }
    }

    pub fn in_memory(ttls: CacheTtls) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), ttls)
    }

    pub fn get(&self, city: &City) -> Option<CacheRecord> {
        self.store.get(&city.cache_key())
    }

    /// Replaces the whole record.
    pub fn set(&self, city: &City, record: CacheRecord) {
        self.store.set(&city.cache_key(), record);
    }

    pub fn is_fresh(&self, city: &City, field: CacheField, now: DateTime<Utc>) -> bool {
        self.get(city)
            .and_then(|r| r.cached_at(field))
            .map(|at| now < at + self.ttls.ttl(field))
            .unwrap_or(false)
    }

    // Each `fresh_*` reads the record once, so check and value are the
    // same observation even if another run overwrites the field after.

    pub fn fresh_coordinates(&self, city: &City, now: DateTime<Utc>) -> Option<Coordinates> {
        let ttl = self.ttls.coordinates;
        self.lookup(city, CacheField::Coordinates, |r| {
            r.coordinates.filter(|c| c.is_fresh(ttl, now)).map(|c| c.value)
        })
    }

    pub fn fresh_current_weather(&self, city: &City, now: DateTime<Utc>) -> Option<CurrentConditions> {
        let ttl = self.ttls.current_weather;
        self.lookup(city, CacheField::CurrentWeather, |r| {
            r.current_weather.filter(|c| c.is_fresh(ttl, now)).map(|c| c.value)
        })
    }

    pub fn fresh_forecast(&self, city: &City, now: DateTime<Utc>) -> Option<Vec<ForecastSample>> {
        let ttl = self.ttls.forecast;
        self.lookup(city, CacheField::Forecast, |r| {
            r.forecast.filter(|c| c.is_fresh(ttl, now)).map(|c| c.value)
        })
    }

    pub fn fresh_published_report(&self, city: &City, now: DateTime<Utc>) -> Option<WeatherPost> {
        let ttl = self.ttls.published_report;
        self.lookup(city, CacheField::PublishedReport, |r| {
            r.published_report.filter(|c| c.is_fresh(ttl, now)).map(|c| c.value)
        })
    }

    pub fn store_coordinates(&self, city: &City, value: Coordinates, now: DateTime<Utc>) {
        let mut slot = Some(Cached::new(value, now));
        self.store.update(&city.cache_key(), &mut |r| {
            if let Some(v) = slot.take() {
                r.coordinates = Some(v);
            }
        });
    }

    pub fn store_current_weather(&self, city: &City, value: CurrentConditions, now: DateTime<Utc>) {
        let mut slot = Some(Cached::new(value, now));
        self.store.update(&city.cache_key(), &mut |r| {
            if let Some(v) = slot.take() {
                r.current_weather = Some(v);
            }
        });
    }

    pub fn store_forecast(&self, city: &City, value: Vec<ForecastSample>, now: DateTime<Utc>) {
        let mut slot = Some(Cached::new(value, now));
        self.store.update(&city.cache_key(), &mut |r| {
            if let Some(v) = slot.take() {
                r.forecast = Some(v);
            }
        });
    }

    pub fn store_published_report(&self, city: &City, value: WeatherPost, now: DateTime<Utc>) {
        let mut slot = Some(Cached::new(value, now));
        self.store.update(&city.cache_key(), &mut |r| {
            if let Some(v) = slot.take() {
                r.published_report = Some(v);
            }
        });
    }

    fn lookup<T>(
        &self,
        city: &City,
        field: CacheField,
        pick: impl FnOnce(CacheRecord) -> Option<T>,
    ) -> Option<T> {
        let hit = self.get(city).and_then(pick);
        if hit.is_some() {
            debug!("Cache hit: {} {}", city.cache_key(), field);
        }
        hit
    }
}
