//! Provider seams. The orchestrator only talks to these traits.

use async_trait::async_trait;

use common::{Coordinates, CurrentConditions, Error, ForecastSample, PublishResult};
use openweather_client::OpenWeatherClient;
use x_client::XClient;

#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn geocode(&self, city: &str) -> Result<Coordinates, Error>;

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentConditions, Error>;

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<ForecastSample>, Error>;
}

#[async_trait]
pub trait SocialFeed: Send + Sync {
    /// Creates a new post. Every successful call is externally visible.
    async fn post(&self, text: &str) -> Result<PublishResult, Error>;
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn geocode(&self, city: &str) -> Result<Coordinates, Error> {
        OpenWeatherClient::geocode(self, city).await
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentConditions, Error> {
        OpenWeatherClient::current_weather(self, lat, lon).await
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<ForecastSample>, Error> {
        OpenWeatherClient::forecast(self, lat, lon).await
    }
}

#[async_trait]
impl SocialFeed for XClient {
    async fn post(&self, text: &str) -> Result<PublishResult, Error> {
        self.post_tweet(text).await
    }
}
