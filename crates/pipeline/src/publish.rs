//! Publisher stage: hands report text to the social feed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use common::{ErrorCode, ErrorEnvelope, PublishResult};

use crate::api::SocialFeed;
use crate::stages::StageResult;

pub const PUBLISHER: &str = "Publisher";

const LOG_PREVIEW_CHARS: usize = 50;

pub struct Publisher {
    feed: Arc<dyn SocialFeed>,
    timeout: Duration,
}

impl Publisher {
    pub fn new(feed: Arc<dyn SocialFeed>, timeout: Duration) -> Self {
        Self { feed, timeout }
    }

    /// Not idempotent: a success is a new, externally visible post.
    pub async fn publish(&self, text: &str) -> StageResult<PublishResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ErrorEnvelope::validation(PUBLISHER, "Post text is required"));
        }

        let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        info!("Posting: {}...", preview);

        let outcome = match tokio::time::timeout(self.timeout, self.feed.post(text)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("X API timed out after {}s", self.timeout.as_secs())),
        };

        match outcome {
            Ok(result) => {
                info!("Post published: id={}", result.post_id);
                Ok(result)
            }
            Err(detail) => {
                error!("Publishing failed: {}", detail);
                Err(ErrorEnvelope::new(
                    ErrorCode::ServiceError,
                    format!("Unable to post tweet: {detail}"),
                    PUBLISHER,
                    true,
                ))
            }
        }
    }
}
