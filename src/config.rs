//! Configuration loader: merges config.toml, .env and environment variables.

use common::config::PosterConfig;
use common::Error;
use std::path::Path;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_positive_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    let parsed = parse_positive_u64(raw, env_name)?;
    u32::try_from(parsed).map_err(|_| Error::Config(format!("{env_name} is too large")))
}

/// Parse a `config.toml` document. Missing sections keep their defaults.
pub fn parse_config_toml(contents: &str) -> Result<PosterConfig, Error> {
    toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))
}

/// Apply environment overrides (highest priority). `lookup` is
/// `std::env::var` in production.
pub fn apply_env_overrides<F>(config: &mut PosterConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("WEATHER_API_KEY") {
        config.weather_api_key = key;
    }
    if let Some(key) = lookup("TWITTER_API_KEY") {
        config.social.api_key = key;
    }
    if let Some(secret) = lookup("TWITTER_API_KEY_SECRET") {
        config.social.api_key_secret = secret;
    }
    if let Some(token) = lookup("TWITTER_ACCESS_TOKEN") {
        config.social.access_token = token;
    }
    if let Some(secret) = lookup("TWITTER_ACCESS_TOKEN_SECRET") {
        config.social.access_token_secret = secret;
    }
    if let Some(addr) = lookup("POSTER_BIND_ADDR") {
        let trimmed = addr.trim();
        if !trimmed.is_empty() {
            config.server.bind_addr = trimmed.to_string();
        }
    }
    if let Some(raw) = lookup("POSTER_STAGE_TIMEOUT_SECS") {
        config.timing.stage_timeout_secs = parse_positive_u64(&raw, "POSTER_STAGE_TIMEOUT_SECS")?;
    }
    if let Some(raw) = lookup("POSTER_RATE_LIMIT_PER_MINUTE") {
        config.rate_limit.max_calls = parse_positive_u32(&raw, "POSTER_RATE_LIMIT_PER_MINUTE")?;
        config.rate_limit.window_secs = 60;
    }
    Ok(())
}

/// Check every setting and report all problems at once. Social
/// credentials are only needed when something will be posted.
pub fn validate_config(config: &PosterConfig, require_social: bool) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.weather_api_key.trim().is_empty() {
        issues.push("WEATHER_API_KEY is required (set in .env or environment)".into());
    }
    if require_social && !config.social.is_complete() {
        issues.push(
            "TWITTER_API_KEY, TWITTER_API_KEY_SECRET, TWITTER_ACCESS_TOKEN and \
             TWITTER_ACCESS_TOKEN_SECRET are required"
                .into(),
        );
    }

    if config.cache.coordinates_ttl_secs == 0 {
        issues.push("cache.coordinates_ttl_secs must be > 0".into());
    }
    if config.cache.current_weather_ttl_secs == 0 {
        issues.push("cache.current_weather_ttl_secs must be > 0".into());
    }
    if config.cache.forecast_ttl_secs == 0 {
        issues.push("cache.forecast_ttl_secs must be > 0".into());
    }
    if config.cache.published_report_ttl_secs == 0 {
        issues.push("cache.published_report_ttl_secs must be > 0".into());
    }

    if config.rate_limit.max_calls == 0 {
        issues.push("rate_limit.max_calls must be > 0".into());
    }
    if config.rate_limit.window_secs == 0 {
        issues.push("rate_limit.window_secs must be > 0".into());
    }

    if config.timing.stage_timeout_secs == 0 {
        issues.push("timing.stage_timeout_secs must be > 0".into());
    }
    if config.timing.http_timeout_secs == 0 {
        issues.push("timing.http_timeout_secs must be > 0".into());
    }

    for (name, url) in [
        ("endpoints.geocoding_base_url", &config.endpoints.geocoding_base_url),
        ("endpoints.weather_base_url", &config.endpoints.weather_base_url),
        ("endpoints.social_base_url", &config.endpoints.social_base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            issues.push(format!("{name} must be an http(s) URL"));
        }
    }

    if config.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        issues.push("server.bind_addr must be HOST:PORT".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load poster configuration from environment and optional config file.
pub fn load_config(require_social: bool) -> Result<PosterConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, then config.toml if it exists.
    let mut config = PosterConfig::default();
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = parse_config_toml(&contents)?;
    }

    // 3. Environment variables win.
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config, require_social)?;

    Ok(config)
}
