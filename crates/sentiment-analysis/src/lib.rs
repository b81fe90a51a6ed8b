use analysis_core::{
    AnalysisError, NewsHeadline, NewsItem, PolarityModel, SentimentBucket, SentimentReport,
};
use std::collections::HashSet;
use std::sync::Arc;

pub mod lexicon;
pub use lexicon::LexiconPolarity;

/// Headlines scored per request.
pub const MAX_HEADLINES: usize = 5;
/// Polarity above this is positive, below its negation negative.
pub const POLARITY_THRESHOLD: f64 = 0.1;

/// Map a polarity score to its bucket.
pub fn bucket_for(polarity: f64) -> SentimentBucket {
    if polarity > POLARITY_THRESHOLD {
        SentimentBucket::Positive
    } else if polarity < -POLARITY_THRESHOLD {
        SentimentBucket::Negative
    } else {
        SentimentBucket::Neutral
    }
}

/// Keep the first occurrence of each exact headline, in order, up to `limit`.
pub fn dedup_headlines(headlines: &[NewsHeadline], limit: usize) -> Vec<&NewsHeadline> {
    let mut seen = HashSet::new();
    headlines
        .iter()
        .filter(|h| seen.insert(h.headline.as_str()))
        .take(limit)
        .collect()
}

/// Scores recent headlines through a pluggable polarity model.
pub struct SentimentScorer {
    model: Arc<dyn PolarityModel>,
    max_headlines: usize,
}

impl SentimentScorer {
    pub fn new(model: Arc<dyn PolarityModel>) -> Self {
        Self {
            model,
            max_headlines: MAX_HEADLINES,
        }
    }

    /// Scorer backed by the built-in word list.
    pub fn with_lexicon() -> Self {
        Self::new(Arc::new(LexiconPolarity::new()))
    }

    /// Score the headlines of a news fetch. A failed fetch or a failed model
    /// call yields `SentimentReport::Unavailable`.
    pub async fn score_fetch(
        &self,
        fetched: Result<Vec<NewsHeadline>, AnalysisError>,
    ) -> SentimentReport {
        match fetched {
            Ok(headlines) => self.score(&headlines).await,
            Err(e) => {
                tracing::warn!("News source unavailable: {}", e);
                SentimentReport::Unavailable {
                    reason: format!("news source unavailable: {}", e),
                }
            }
        }
    }

    pub async fn score(&self, headlines: &[NewsHeadline]) -> SentimentReport {
        let selected = dedup_headlines(headlines, self.max_headlines);
        if selected.is_empty() {
            return SentimentReport::Scored { items: Vec::new() };
        }

        let texts: Vec<String> = selected.iter().map(|h| h.headline.clone()).collect();
        let scores = match self.polarities(&texts).await {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!("Polarity model unavailable: {}", e);
                return SentimentReport::Unavailable {
                    reason: format!("sentiment unavailable: {}", e),
                };
            }
        };

        let items: Vec<NewsItem> = selected
            .into_iter()
            .zip(scores)
            .map(|(headline, polarity)| NewsItem {
                headline: headline.headline.clone(),
                publisher: headline.publisher.clone(),
                polarity,
                bucket: bucket_for(polarity),
            })
            .collect();

        tracing::info!("Scored {} headlines", items.len());
        SentimentReport::Scored { items }
    }

    async fn polarities(&self, texts: &[String]) -> Result<Vec<f64>, AnalysisError> {
        let scores = self.model.polarity(texts).await?;
        if scores.len() != texts.len() {
            return Err(AnalysisError::CalculationError(format!(
                "polarity model returned {} scores for {} headlines",
                scores.len(),
                texts.len()
            )));
        }
        scores
            .into_iter()
            .map(|s| {
                if s.is_nan() {
                    Err(AnalysisError::CalculationError("polarity model returned NaN".to_string()))
                } else {
                    Ok(s.clamp(-1.0, 1.0))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Polarity model returning canned scores and recording its inputs
    struct FixedPolarity {
        scores: HashMap<String, f64>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FixedPolarity {
        fn new(pairs: &[(&str, f64)]) -> Self {
            Self {
                scores: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PolarityModel for FixedPolarity {
        async fn polarity(&self, texts: &[String]) -> Result<Vec<f64>, AnalysisError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            Ok(texts.iter().map(|t| self.scores.get(t).copied().unwrap_or(0.0)).collect())
        }
    }

    struct FailingPolarity;

    #[async_trait]
    impl PolarityModel for FailingPolarity {
        async fn polarity(&self, _texts: &[String]) -> Result<Vec<f64>, AnalysisError> {
            Err(AnalysisError::ApiError("connection refused".to_string()))
        }
    }

    struct ShortPolarity;

    #[async_trait]
    impl PolarityModel for ShortPolarity {
        async fn polarity(&self, _texts: &[String]) -> Result<Vec<f64>, AnalysisError> {
            Ok(vec![0.5])
        }
    }

    fn headline(text: &str) -> NewsHeadline {
        NewsHeadline {
            headline: text.to_string(),
            publisher: Some("Wire".to_string()),
            published_utc: None,
        }
    }

    #[test]
    fn test_bucket_thresholds() {
        assert_eq!(bucket_for(0.5), SentimentBucket::Positive);
        assert_eq!(bucket_for(0.1), SentimentBucket::Neutral);
        assert_eq!(bucket_for(0.0), SentimentBucket::Neutral);
        assert_eq!(bucket_for(-0.1), SentimentBucket::Neutral);
        assert_eq!(bucket_for(-0.11), SentimentBucket::Negative);
    }

    #[tokio::test]
    async fn test_duplicates_scored_once() {
        let model = Arc::new(FixedPolarity::new(&[("X", 0.4), ("Y", -0.6)]));
        let scorer = SentimentScorer::new(model.clone());

        let report = scorer.score(&[headline("X"), headline("X"), headline("Y")]).await;

        let items = report.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].headline, "X");
        assert_eq!(items[0].bucket, SentimentBucket::Positive);
        assert_eq!(items[1].bucket, SentimentBucket::Negative);
        assert_eq!(model.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_keeps_first_five_distinct() {
        let model = Arc::new(FixedPolarity::new(&[]));
        let scorer = SentimentScorer::new(model.clone());
        let headlines: Vec<NewsHeadline> = ["a", "b", "a", "c", "d", "e", "f", "g"]
            .iter()
            .map(|t| headline(t))
            .collect();

        let report = scorer.score(&headlines).await;

        let texts: Vec<&str> = report.items().iter().map(|i| i.headline.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(model.calls.lock().unwrap()[0].len(), 5);
    }

    #[tokio::test]
    async fn test_no_headlines_is_empty_success() {
        let scorer = SentimentScorer::new(Arc::new(FixedPolarity::new(&[])));
        let report = scorer.score(&[]).await;
        assert_eq!(report, SentimentReport::Scored { items: vec![] });
    }

    #[tokio::test]
    async fn test_model_failure_is_unavailable() {
        let scorer = SentimentScorer::new(Arc::new(FailingPolarity));
        let report = scorer.score(&[headline("X")]).await;
        assert!(!report.is_available());
    }

    #[tokio::test]
    async fn test_wrong_score_count_is_unavailable() {
        let scorer = SentimentScorer::new(Arc::new(ShortPolarity));
        let report = scorer.score(&[headline("X"), headline("Y")]).await;
        assert!(matches!(report, SentimentReport::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_news_failure_is_unavailable() {
        let scorer = SentimentScorer::with_lexicon();
        let report = scorer
            .score_fetch(Err(AnalysisError::ApiError("HTTP 503".to_string())))
            .await;
        match report {
            SentimentReport::Unavailable { reason } => assert!(reason.contains("HTTP 503")),
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scores_clamped() {
        let scorer = SentimentScorer::new(Arc::new(FixedPolarity::new(&[("X", 3.0)])));
        let report = scorer.score(&[headline("X")]).await;
        assert_eq!(report.items()[0].polarity, 1.0);
    }
}
