//! weather-poster: publishes a current-weather summary and short forecast
//! for a city to X.
//!
//! Single-binary Tokio application with three entry points:
//! 1. `serve` exposes `POST /v1/tweets` over HTTP
//! 2. `post` builds and publishes once from the command line
//! 3. `report` renders the report without publishing

mod config;
mod server;

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};

use common::config::PosterConfig;
use common::{Error, PublishResult};
use openweather_client::OpenWeatherClient;
use pipeline::{Orchestrator, SocialFeed};
use x_client::XClient;

/// Weather report poster
#[derive(Parser)]
#[command(name = "weather-poster", about = "Posts city weather reports to X")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Override `server.bind_addr`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Build and publish a report for one city, print the JSON result.
    Post {
        #[arg(long)]
        city: String,
    },
    /// Build a report for one city without publishing it (dry-run).
    Report {
        #[arg(long)]
        city: String,
    },
}

/// Stands in for the X client when only reports are rendered.
struct NoFeed;

#[async_trait]
impl SocialFeed for NoFeed {
    async fn post(&self, _text: &str) -> Result<PublishResult, Error> {
        Err(Error::Auth("X credentials not configured".into()))
    }
}

fn build_orchestrator(cfg: &PosterConfig, with_feed: bool) -> anyhow::Result<Orchestrator> {
    let http_timeout = cfg.timing.http_timeout();
    let weather = OpenWeatherClient::new(cfg.weather_api_key.clone(), &cfg.endpoints, http_timeout)?;

    let feed: Arc<dyn SocialFeed> = if with_feed {
        Arc::new(XClient::new(&cfg.social, &cfg.endpoints.social_base_url, http_timeout)?)
    } else {
        Arc::new(NoFeed)
    };

    Ok(Orchestrator::from_config(cfg, Arc::new(weather), feed))
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "weather_poster=info,pipeline=info,openweather_client=info,x_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let code = match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(command: Command) -> anyhow::Result<i32> {
    let publishes = !matches!(command, Command::Report { .. });
    let cfg = config::load_config(publishes)?;

    info!(
        "Cache TTLs: coordinates={}s, current={}s, forecast={}s, post={}s",
        cfg.cache.coordinates_ttl_secs,
        cfg.cache.current_weather_ttl_secs,
        cfg.cache.forecast_ttl_secs,
        cfg.cache.published_report_ttl_secs,
    );
    info!(
        "Weather API budget: {} calls / {}s, stage timeout {}s",
        cfg.rate_limit.max_calls, cfg.rate_limit.window_secs, cfg.timing.stage_timeout_secs,
    );

    let orchestrator = build_orchestrator(&cfg, publishes)?;

    match command {
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| cfg.server.bind_addr.clone());
            server::serve(&bind_addr, server::AppState { orchestrator }).await?;
            Ok(0)
        }
        Command::Post { city } => match orchestrator.post_weather(&city).await {
            Ok(post) => {
                println!("{}", serde_json::to_string_pretty(&post)?);
                Ok(0)
            }
            Err(err) => {
                println!("{}", serde_json::to_string_pretty(&json!({ "error": err }))?);
                Ok(1)
            }
        },
        Command::Report { city } => match orchestrator.preview(&city).await {
            Ok(report) => {
                println!("{}", report.text);
                Ok(0)
            }
            Err(err) => {
                println!("{}", serde_json::to_string_pretty(&json!({ "error": err }))?);
                Ok(1)
            }
        },
    }
}
