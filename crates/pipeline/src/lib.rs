//! Weather-post orchestration: cache policy, rate limiting, fetch stages,
//! report rendering, publishing and error translation.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod lock;
pub mod orchestrator;
pub mod publish;
pub mod rate_limit;
pub mod report;
pub mod stages;
pub mod translate;

#[cfg(test)]
mod testing;

pub use api::{SocialFeed, WeatherApi};
pub use cache::{CacheField, CacheRecord, CacheStore, CacheTtls, Cached, FreshnessCache, MemoryCacheStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use lock::CityLocks;
pub use orchestrator::{Orchestrator, ORCHESTRATOR};
pub use publish::Publisher;
pub use rate_limit::RateLimiter;
pub use stages::{StageResult, Stages};
