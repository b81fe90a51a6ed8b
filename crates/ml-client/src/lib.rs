pub mod error;
pub mod sentiment;

pub use error::{MLError, MLResult};
pub use sentiment::SentimentClient;

use std::time::Duration;

/// Configuration for the ML sentiment service
#[derive(Debug, Clone)]
pub struct MLConfig {
    /// `None` disables the service; callers fall back to the word-list model.
    pub sentiment_url: Option<String>,
    pub timeout: Duration,
}

impl MLConfig {
    pub fn from_env() -> Self {
        let sentiment_url = std::env::var("ML_SENTIMENT_URL")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        let timeout_secs = std::env::var("ML_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Self {
            sentiment_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Client for the configured service, if any.
    pub fn sentiment_client(&self) -> Option<SentimentClient> {
        self.sentiment_url
            .as_ref()
            .map(|url| SentimentClient::new(url.clone(), self.timeout))
    }
}

impl Default for MLConfig {
    fn default() -> Self {
        Self {
            sentiment_url: None,
            timeout: Duration::from_secs(5),
        }
    }
}
