//! Build-and-publish state machine.
//!
//! Validate → CheckPublishCache → geocoding → current + forecast →
//! aggregate → BuildReport → Publish → CachePublishResult. The city lock
//! spans CheckPublishCache through CachePublishResult, so concurrent runs
//! for one city publish at most once per publish-cache window.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use common::config::PosterConfig;
use common::{
    City, Coordinates, CurrentConditions, DailyAverage, ErrorCode, ErrorEnvelope, ForecastSample,
    WeatherPost, WeatherReport,
};

use crate::api::{SocialFeed, WeatherApi};
use crate::cache::{CacheStore, CacheTtls, FreshnessCache, MemoryCacheStore};
use crate::clock::{Clock, SystemClock};
use crate::lock::CityLocks;
use crate::publish::Publisher;
use crate::rate_limit::RateLimiter;
use crate::stages::{
    validate_city, StageResult, Stages, CURRENT_WEATHER_STAGE, FORECAST_STAGE, GEOCODING_STAGE,
    REPORT_BUILDER,
};
use crate::translate::{panic_message, rewrap};

pub const ORCHESTRATOR: &str = "Orchestrator";

struct Inner {
    stages: Stages,
    publisher: Publisher,
    locks: CityLocks,
}

/// Cheap to clone; clones share cache, limiter and locks.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(stages: Stages, publisher: Publisher) -> Self {
        Self {
            inner: Arc::new(Inner {
                stages,
                publisher,
                locks: CityLocks::new(),
            }),
        }
    }

    /// Production wiring: in-memory store, system clock, limits from config.
    pub fn from_config(
        cfg: &PosterConfig,
        weather: Arc<dyn WeatherApi>,
        feed: Arc<dyn SocialFeed>,
    ) -> Self {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        Self::with_store(cfg, weather, feed, store, Arc::new(SystemClock))
    }

    pub fn with_store(
        cfg: &PosterConfig,
        weather: Arc<dyn WeatherApi>,
        feed: Arc<dyn SocialFeed>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stages = Stages::new(
            weather,
            FreshnessCache::new(store, CacheTtls::from_config(&cfg.cache)),
            RateLimiter::from_config(&cfg.rate_limit),
            clock,
            cfg.timing.stage_timeout(),
        );
        let publisher = Publisher::new(feed, cfg.timing.stage_timeout());
        Self::new(stages, publisher)
    }

    pub fn cache(&self) -> &FreshnessCache {
        self.inner.stages.cache()
    }

    pub async fn geocode(&self, city: &str) -> StageResult<Coordinates> {
        let city = validate_city(city, GEOCODING_STAGE)?;
        self.guarded(city, |inner, city| async move { inner.stages.geocode(&city).await })
            .await
    }

    pub async fn current_weather(&self, city: &str) -> StageResult<CurrentConditions> {
        let city = validate_city(city, CURRENT_WEATHER_STAGE)?;
        self.guarded(city, |inner, city| async move {
            inner.stages.current_weather(&city).await
        })
        .await
    }

    pub async fn forecast(&self, city: &str) -> StageResult<Vec<ForecastSample>> {
        let city = validate_city(city, FORECAST_STAGE)?;
        self.guarded(city, |inner, city| async move { inner.stages.forecast(&city).await })
            .await
    }

    pub async fn daily_forecast(&self, city: &str) -> StageResult<Vec<DailyAverage>> {
        let city = validate_city(city, FORECAST_STAGE)?;
        self.guarded(city, |inner, city| async move {
            inner.stages.daily_forecast(&city).await
        })
        .await
    }

    pub async fn build_report(&self, city: &str) -> StageResult<WeatherReport> {
        let city = validate_city(city, REPORT_BUILDER)?;
        self.guarded(city, |inner, city| async move { inner.stages.build_report(&city).await })
            .await
    }

    /// Dry run: the report that `post_weather` would publish. Never posts
    /// and never reads or writes the publish cache.
    pub async fn preview(&self, city: &str) -> StageResult<WeatherReport> {
        let city = validate_city(city, ORCHESTRATOR)?;
        self.guarded(city, |inner, city| async move { inner.stages.build_report(&city).await })
            .await
    }

    /// Build the report for `city` and publish it, unless a post for the
    /// city is still fresh, in which case that post is returned verbatim.
    pub async fn post_weather(&self, city: &str) -> StageResult<WeatherPost> {
        let city = validate_city(city, ORCHESTRATOR)?;
        info!("Creating weather post for city: {}", city);

        let guard = self.inner.locks.acquire(&city).await;
        let inner = self.inner.clone();
        let task_city = city.clone();

        // The guard moves into the task: a dropped caller does not abort
        // a publish half way, and a panic still releases the city.
        run_guarded(&city, async move {
            let _guard = guard;
            inner.publish_run(&task_city).await
        })
        .await
    }

    /// Unlocked run of one stage call under `run_guarded`.
    async fn guarded<T, F, Fut>(&self, city: City, work: F) -> StageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Inner>, City) -> Fut,
        Fut: Future<Output = StageResult<T>> + Send + 'static,
    {
        let task = work(self.inner.clone(), city.clone());
        run_guarded(&city, task).await
    }
}

impl Inner {
    async fn publish_run(&self, city: &City) -> StageResult<WeatherPost> {
        if let Some(post) = self.stages.cache().fresh_published_report(city, self.stages.now()) {
            info!("Returning cached post {} for {}", post.tweet_id, city);
            return Ok(post);
        }

        let report = self
            .stages
            .build_report(city)
            .await
            .map_err(|e| rewrap(e, ErrorCode::ServiceError, ORCHESTRATOR, false))?;

        let published = self
            .publisher
            .publish(&report.text)
            .await
            .map_err(|e| rewrap(e, ErrorCode::ServiceError, ORCHESTRATOR, true))?;

        let post = WeatherPost::new(city, &report, published);
        self.stages
            .cache()
            .store_published_report(city, post.clone(), self.stages.now());

        info!("Weather post published for {}: id={}", city, post.tweet_id);
        Ok(post)
    }
}

/// Runs `work` as its own task; a panic becomes a retryable SERVICE_ERROR.
async fn run_guarded<T, F>(city: &City, work: F) -> StageResult<T>
where
    T: Send + 'static,
    F: Future<Output = StageResult<T>> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(join_err) => {
            let detail = if join_err.is_panic() {
                panic_message(&*join_err.into_panic())
            } else {
                join_err.to_string()
            };
            error!("Weather run for '{}' aborted: {}", city, detail);
            Err(ErrorEnvelope::new(
                ErrorCode::ServiceError,
                format!("Unable to create weather post: {detail}"),
                ORCHESTRATOR,
                true,
            ))
        }
    }
}
