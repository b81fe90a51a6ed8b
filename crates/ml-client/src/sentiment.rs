use analysis_core::{AnalysisError, PolarityModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{MLError, MLResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPrediction {
    pub label: String,
    pub confidence: f64,
    pub score: f64,
}

impl SentimentPrediction {
    /// Signed polarity in [-1, 1]: the score carries the sign of the label.
    pub fn polarity(&self) -> f64 {
        let sign = match self.label.to_lowercase().as_str() {
            "positive" => 1.0,
            "negative" => -1.0,
            _ => 0.0,
        };
        (self.score.abs() * sign).clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub predictions: Vec<SentimentPrediction>,
    #[serde(default)]
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
struct SentimentRequest<'a> {
    texts: &'a [String],
    use_cache: bool,
}

/// Client for the HTTP text-sentiment service
#[derive(Clone)]
pub struct SentimentClient {
    client: reqwest::Client,
    base_url: String,
}

impl SentimentClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Predict sentiment for text(s)
    pub async fn predict(&self, texts: &[String]) -> MLResult<SentimentResponse> {
        let request = SentimentRequest {
            texts,
            use_cache: true,
        };

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MLError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let result = response.json::<SentimentResponse>().await?;
        if result.predictions.len() != texts.len() {
            return Err(MLError::InvalidResponse(format!(
                "expected {} predictions, got {}",
                texts.len(),
                result.predictions.len()
            )));
        }
        Ok(result)
    }
}

#[async_trait]
impl PolarityModel for SentimentClient {
    async fn polarity(&self, texts: &[String]) -> Result<Vec<f64>, AnalysisError> {
        let response = self.predict(texts).await?;
        tracing::debug!(
            "Sentiment service scored {} texts in {:.1}ms",
            response.predictions.len(),
            response.processing_time_ms
        );
        Ok(response.predictions.iter().map(SentimentPrediction::polarity).collect())
    }
}
