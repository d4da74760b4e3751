//! REST client for the X API v2.
//!
//! Only post creation is needed: `POST /2/tweets` with `{"text": ...}`.

use std::time::Duration;

use common::config::SocialCredentials;
use common::{Error, PublishResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::OAuth1Signer;

const SERVICE: &str = "X";
const USER_AGENT: &str = "weather-poster/0.1";

/// Async REST client for the X API.
#[derive(Debug, Clone)]
pub struct XClient {
    client: reqwest::Client,
    signer: OAuth1Signer,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    data: CreatedPost,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
    text: String,
}

impl XClient {
    pub fn new(creds: &SocialCredentials, base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let signer = OAuth1Signer::new(creds)?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build X HTTP client: {e}")))?;

        Ok(Self {
            client,
            signer,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a post. Not idempotent: every successful call is a new post.
    pub async fn post_tweet(&self, text: &str) -> Result<PublishResult, Error> {
        let url = self.url("/2/tweets");
        let auth = self.signer.authorization_header("POST", &url)?;

        debug!("Creating post ({} chars)", text.chars().count());

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&CreatePostRequest { text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("{SERVICE} API timed out"))
                } else {
                    Error::Http(e.to_string())
                }
            })?;

        let status_code = resp.status().as_u16();
        if status_code == 429 {
            warn!("Rate limited on post creation");
            return Err(Error::RateLimited { retry_after_ms: 15 * 60 * 1000 });
        }
        if !(200..300).contains(&status_code) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: SERVICE.to_string(),
                status: status_code,
                message: body.chars().take(500).collect(),
            });
        }

        let created: CreatePostResponse = resp
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Invalid JSON response from {SERVICE} API: {e}")))?;

        info!("Post created: id={}", created.data.id);

        Ok(PublishResult {
            post_id: created.data.id,
            text: created.data.text,
        })
    }
}
