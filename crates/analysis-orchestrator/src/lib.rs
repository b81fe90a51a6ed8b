use analysis_core::{
    AnalysisError, FundamentalsSnapshot, NewsSource, PriceMetrics, PriceSeries, SentimentReport,
    SeriesLoader,
};
use chrono::{Duration, NaiveDate};
use fundamental_analysis::FundamentalAnalysisEngine;
use polygon_client::PolygonClient;
use sentiment_analysis::SentimentScorer;
use serde::Serialize;
use std::sync::Arc;
use technical_analysis::{IndicatorEngine, IndicatorKind, IndicatorSet, SignalClassifier, SignalSummary};

pub mod cache;
pub mod config;

pub use cache::{CacheKey, DataCache, LoadedData};
pub use config::DashboardConfig;

/// One dashboard view: a ticker, a date range and the indicators to draw.
#[derive(Debug, Clone)]
pub struct DashboardRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub indicators: Vec<IndicatorKind>,
}

impl DashboardRequest {
    /// Request with the default indicator selection (SMA (20) and RSI).
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            indicators: IndicatorKind::default_selection(),
        }
    }

    pub fn with_indicators(mut self, indicators: Vec<IndicatorKind>) -> Self {
        self.indicators = indicators;
        self
    }

    /// Normalized ticker, or `InvalidData` for an unusable request.
    fn validate(&self) -> Result<String, AnalysisError> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidData("ticker must not be empty".to_string()));
        }
        if self.start > self.end {
            return Err(AnalysisError::InvalidData(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        Ok(symbol)
    }
}

/// Everything the dashboard renders for one request.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub ticker: String,
    pub company_name: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub prices: PriceSeries,
    pub indicators: IndicatorSet,
    pub signals: SignalSummary,
    pub sentiment: SentimentReport,
    pub metrics: PriceMetrics,
    pub fundamentals: FundamentalsSnapshot,
}

impl DashboardReport {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.indicators.dates
    }
}

/// Runs the load, indicator, signal and sentiment pipeline for a request.
pub struct AnalysisOrchestrator {
    loader: Arc<dyn SeriesLoader>,
    news: Arc<dyn NewsSource>,
    scorer: SentimentScorer,
    cache: DataCache,
    indicator_engine: IndicatorEngine,
    classifier: SignalClassifier,
    fundamental_engine: FundamentalAnalysisEngine,
    news_limit: u32,
}

impl AnalysisOrchestrator {
    pub fn new(
        loader: Arc<dyn SeriesLoader>,
        news: Arc<dyn NewsSource>,
        scorer: SentimentScorer,
        cache: DataCache,
    ) -> Self {
        Self {
            loader,
            news,
            scorer,
            cache,
            indicator_engine: IndicatorEngine::new(),
            classifier: SignalClassifier::new(),
            fundamental_engine: FundamentalAnalysisEngine::new(),
            news_limit: config::DEFAULT_NEWS_LIMIT,
        }
    }

    pub fn with_news_limit(mut self, limit: u32) -> Self {
        self.news_limit = limit.max(1);
        self
    }

    /// Polygon for prices, profile and news. Headlines are scored by the ML
    /// sentiment service when one is configured, otherwise by the word list.
    pub fn from_config(config: &DashboardConfig) -> Self {
        let polygon = Arc::new(PolygonClient::new(
            config.polygon_api_key.clone(),
            config.polygon_rate_limit,
        ));

        let scorer = match config.ml.sentiment_client() {
            Some(client) => {
                tracing::info!("Scoring headlines with sentiment service at {}", client.base_url());
                SentimentScorer::new(Arc::new(client))
            }
            None => {
                tracing::info!("ML_SENTIMENT_URL not set, scoring headlines with the word list");
                SentimentScorer::with_lexicon()
            }
        };

        let cache = DataCache::new(config.cache_ttl(), config.cache_max_entries);

        Self::new(polygon.clone(), polygon, scorer, cache).with_news_limit(config.news_limit)
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub async fn run(&self, request: &DashboardRequest) -> Result<DashboardReport, AnalysisError> {
        let symbol = request.validate()?;
        tracing::info!(
            "Building dashboard for {} ({} to {}, indicators: {})",
            symbol,
            request.start,
            request.end,
            request.indicators.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
        );

        // Prices and headlines come from independent sources; fetch both at once.
        let (loaded, headlines) = tokio::join!(
            self.load(&symbol, request.start, request.end),
            self.news.fetch_headlines(&symbol, self.news_limit),
        );

        let LoadedData { bars, profile } = loaded?;
        let series = PriceSeries::from_bars(bars)?;
        tracing::info!("Loaded {} rows for {}", series.len(), symbol);

        let indicators = self.indicator_engine.compute(&series, &request.indicators);
        let signals = self.classifier.summarize(&indicators);
        let sentiment = self.scorer.score_fetch(headlines).await;

        let metrics = PriceMetrics::from_series(&series);
        let fundamentals = self.fundamental_engine.snapshot(&profile, metrics.latest_close);

        Ok(DashboardReport {
            ticker: symbol,
            company_name: profile.name,
            start: request.start,
            end: request.end,
            prices: series,
            indicators,
            signals,
            sentiment,
            metrics,
            fundamentals,
        })
    }

    /// Bars and profile for a key, served from the cache while fresh.
    async fn load(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<LoadedData, AnalysisError> {
        let key = CacheKey::new(symbol, start, end);
        if let Some(data) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {} ({} to {})", symbol, start, end);
            return Ok(data);
        }

        let (bars, profile) = tokio::join!(
            self.loader.load_bars(symbol, start, end),
            self.loader.load_profile(symbol),
        );

        let bars = bars?;
        let profile = profile.unwrap_or_else(|e| {
            tracing::warn!("Company profile unavailable for {}: {}", symbol, e);
            Default::default()
        });

        let data = LoadedData { bars, profile };
        // An empty table is a failed load, not a result worth keeping.
        if !data.bars.is_empty() {
            self.cache.insert(key, data.clone());
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{
        Bar, CompanyProfile, CrossoverSignal, NewsHeadline, OscillatorSignal,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn rising_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i * i) as f64 * 0.1;
                Bar::from_raw(day(i as i64), close, close + 1.0, close - 1.0, close, 1_000.0)
            })
            .collect()
    }

    struct MockLoader {
        bars: Result<Vec<Bar>, AnalysisError>,
        profile: Result<CompanyProfile, AnalysisError>,
        bar_calls: AtomicUsize,
    }

    impl MockLoader {
        fn with_bars(bars: Vec<Bar>) -> Self {
            Self {
                bars: Ok(bars),
                profile: Ok(CompanyProfile {
                    name: Some("Test Corp".to_string()),
                    ..Default::default()
                }),
                bar_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.bar_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SeriesLoader for MockLoader {
        async fn load_bars(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, AnalysisError> {
            self.bar_calls.fetch_add(1, Ordering::SeqCst);
            self.bars.clone()
        }

        async fn load_profile(&self, _symbol: &str) -> Result<CompanyProfile, AnalysisError> {
            self.profile.clone()
        }
    }

    struct MockNews(Result<Vec<String>, AnalysisError>);

    #[async_trait]
    impl NewsSource for MockNews {
        async fn fetch_headlines(&self, _symbol: &str, _limit: u32) -> Result<Vec<NewsHeadline>, AnalysisError> {
            self.0.clone().map(|texts| {
                texts
                    .into_iter()
                    .map(|headline| NewsHeadline {
                        headline,
                        publisher: Some("Wire".to_string()),
                        published_utc: None,
                    })
                    .collect()
            })
        }
    }

    fn orchestrator(loader: Arc<MockLoader>, news: MockNews) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(
            loader,
            Arc::new(news),
            SentimentScorer::with_lexicon(),
            DataCache::new(Duration::seconds(300), 8),
        )
    }

    fn headlines(texts: &[&str]) -> MockNews {
        MockNews(Ok(texts.iter().map(|t| t.to_string()).collect()))
    }

    fn request(symbol: &str) -> DashboardRequest {
        DashboardRequest::new(symbol, day(0), day(90))
    }

    #[tokio::test]
    async fn test_run_builds_full_report() {
        let loader = Arc::new(MockLoader::with_bars(rising_bars(60)));
        let orch = orchestrator(loader.clone(), headlines(&["X", "X", "Y"]));
        let req = request(" aapl ").with_indicators(vec![
            IndicatorKind::SMA_20,
            IndicatorKind::RSI_14,
            IndicatorKind::MACD_12_26_9,
        ]);

        let report = orch.run(&req).await.unwrap();

        assert_eq!(report.ticker, "AAPL");
        assert_eq!(report.company_name.as_deref(), Some("Test Corp"));
        assert_eq!(report.dates().len(), 60);
        assert!(report.indicators.line(&IndicatorKind::SMA_20).is_some());
        // Strictly rising closes have no losses.
        assert_eq!(report.signals.oscillator, Some(OscillatorSignal::SustainedOverbought));
        assert!(matches!(report.signals.crossover, Some(s) if s != CrossoverSignal::Unavailable));
        assert_eq!(report.sentiment.items().len(), 2);
        assert_eq!(report.metrics.latest_close, Some(100.0 + 59.0 * 59.0 * 0.1));
    }

    #[tokio::test]
    async fn test_unrequested_indicators_have_no_signals() {
        let loader = Arc::new(MockLoader::with_bars(rising_bars(30)));
        let orch = orchestrator(loader, headlines(&[]));
        let req = request("MSFT").with_indicators(vec![IndicatorKind::EMA_20]);

        let report = orch.run(&req).await.unwrap();
        assert_eq!(report.signals, SignalSummary::default());
        assert_eq!(report.sentiment, SentimentReport::Scored { items: Vec::new() });
    }

    #[tokio::test]
    async fn test_empty_table_is_missing_data() {
        let loader = Arc::new(MockLoader::with_bars(Vec::new()));
        let orch = orchestrator(loader.clone(), headlines(&["X"]));

        let err = orch.run(&request("AAPL")).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MissingData(_)));

        // Not cached: the next run asks the loader again.
        let _ = orch.run(&request("AAPL")).await;
        assert_eq!(loader.calls(), 2);
        assert!(orch.cache().is_empty());
    }

    #[tokio::test]
    async fn test_loader_error_is_fatal() {
        let loader = Arc::new(MockLoader {
            bars: Err(AnalysisError::ApiError("HTTP 500".to_string())),
            ..MockLoader::with_bars(Vec::new())
        });
        let orch = orchestrator(loader, headlines(&["X"]));

        let err = orch.run(&request("AAPL")).await.unwrap_err();
        assert_eq!(err, AnalysisError::ApiError("HTTP 500".to_string()));
    }

    #[tokio::test]
    async fn test_repeat_requests_hit_cache() {
        let loader = Arc::new(MockLoader::with_bars(rising_bars(40)));
        let orch = orchestrator(loader.clone(), headlines(&["X"]));

        let first = orch.run(&request("aapl")).await.unwrap();
        let second = orch.run(&request("AAPL")).await.unwrap();

        assert_eq!(loader.calls(), 1);
        assert_eq!(first.signals, second.signals);
        assert_eq!(first.indicators, second.indicators);

        let other_range = DashboardRequest::new("AAPL", day(0), day(30));
        orch.run(&other_range).await.unwrap();
        assert_eq!(loader.calls(), 2);
    }

    #[tokio::test]
    async fn test_news_failure_does_not_fail_request() {
        let loader = Arc::new(MockLoader::with_bars(rising_bars(40)));
        let news = MockNews(Err(AnalysisError::ApiError("timeout".to_string())));
        let orch = orchestrator(loader, news);

        let report = orch.run(&request("TSLA")).await.unwrap();
        assert!(!report.sentiment.is_available());
        assert!(report.metrics.latest_close.is_some());
    }

    #[tokio::test]
    async fn test_profile_failure_leaves_fundamentals_empty() {
        let loader = Arc::new(MockLoader {
            profile: Err(AnalysisError::ApiError("HTTP 403".to_string())),
            ..MockLoader::with_bars(rising_bars(40))
        });
        let orch = orchestrator(loader, headlines(&[]));

        let report = orch.run(&request("TCS.NS")).await.unwrap();
        assert_eq!(report.company_name, None);
        assert_eq!(report.fundamentals, FundamentalsSnapshot::default());
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_loader() {
        let loader = Arc::new(MockLoader::with_bars(rising_bars(40)));
        let orch = orchestrator(loader.clone(), headlines(&[]));

        let blank = request("   ");
        assert!(matches!(orch.run(&blank).await, Err(AnalysisError::InvalidData(_))));

        let reversed = DashboardRequest::new("AAPL", day(10), day(0));
        assert!(matches!(orch.run(&reversed).await, Err(AnalysisError::InvalidData(_))));

        assert_eq!(loader.calls(), 0);
    }

    #[tokio::test]
    async fn test_report_serializes_with_indicator_labels() {
        let loader = Arc::new(MockLoader::with_bars(rising_bars(25)));
        let orch = orchestrator(loader, headlines(&["Profit jumps"]));

        let report = orch.run(&request("GOOGL")).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["ticker"], "GOOGL");
        assert!(json["indicators"]["entries"]["SMA (20)"].is_object());
        assert!(json["indicators"]["entries"]["RSI"].is_object());
        assert_eq!(json["sentiment"]["status"], "scored");
    }
}
