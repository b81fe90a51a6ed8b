use analysis_core::{
    AnalysisError, Bar, CompanyProfile, Financials, NewsHeadline, NewsSource, SeriesLoader,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let Some(&oldest) = ts.front() else { continue };
            let sleep_dur = (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    /// `rate_limit` is requests per minute. Free tier users should pass 5.
    pub fn new(api_key: String, rate_limit: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Point the client at another host (proxies, recorded fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self.client.execute(req_clone).await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!("Polygon 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AnalysisError::ApiError("Rate limited by Polygon after 3 retries".to_string()))
    }

    async fn error_for_status(response: reqwest::Response) -> AnalysisError {
        AnalysisError::ApiError(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        ))
    }

    /// Daily bars for a symbol between two dates, inclusive
    pub async fn get_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ])
        ).await?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(agg_response.into_bars())
    }

    /// Get company financials, most recent period first
    pub async fn get_financials(&self, symbol: &str) -> Result<Vec<Financials>, AnalysisError> {
        let url = format!("{}/vX/reference/financials", self.base_url);

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("ticker", symbol),
                ("apiKey", self.api_key.as_str()),
                ("limit", "8"),
                ("order", "desc"),
            ])
        ).await?;

        if !response.status().is_success() {
            if response.status().as_u16() == 403 || response.status().as_u16() == 401 {
                tracing::warn!("Financials not included in Polygon plan for {}", symbol);
                return Ok(Vec::new());
            }
            return Err(Self::error_for_status(response).await);
        }

        let fin_response: FinancialsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(fin_response.into_financials(symbol))
    }

    /// Get news articles, most recent first
    pub async fn get_news(&self, symbol: &str, limit: u32) -> Result<Vec<NewsHeadline>, AnalysisError> {
        let url = format!("{}/v2/reference/news", self.base_url);

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.clone()),
                ("ticker", symbol.to_string()),
                ("limit", limit.to_string()),
                ("order", "desc".to_string()),
            ])
        ).await?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let news_response: NewsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(news_response.into_headlines())
    }

    /// Get ticker details
    pub async fn get_ticker_details(&self, symbol: &str) -> Result<TickerDetails, AnalysisError> {
        let url = format!("{}/v3/reference/tickers/{}", self.base_url, symbol);

        let response = self.send_request(
            self.client.get(&url).query(&[("apiKey", &self.api_key)])
        ).await?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let details_response: TickerDetailsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(details_response.results)
    }
}

#[async_trait]
impl SeriesLoader for PolygonClient {
    async fn load_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, AnalysisError> {
        self.get_daily_bars(symbol, start, end).await
    }

    async fn load_profile(&self, symbol: &str) -> Result<CompanyProfile, AnalysisError> {
        let (financials, details) = tokio::join!(
            self.get_financials(symbol),
            self.get_ticker_details(symbol),
        );

        // Both halves are optional extras; prices still render without them.
        let financials = financials.unwrap_or_else(|e| {
            tracing::warn!("Financials unavailable for {}: {}", symbol, e);
            Vec::new()
        });
        let details = details
            .map_err(|e| tracing::warn!("Ticker details unavailable for {}: {}", symbol, e))
            .ok();

        Ok(CompanyProfile {
            name: details.as_ref().map(|d| d.name.clone()),
            financials,
            market_cap: details.and_then(|d| d.market_cap),
        })
    }
}

#[async_trait]
impl NewsSource for PolygonClient {
    async fn fetch_headlines(&self, symbol: &str, limit: u32) -> Result<Vec<NewsHeadline>, AnalysisError> {
        self.get_news(symbol, limit).await
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    #[serde(default)]
    o: Option<f64>, // open
    #[serde(default)]
    h: Option<f64>, // high
    #[serde(default)]
    l: Option<f64>, // low
    #[serde(default)]
    c: Option<f64>, // close
    #[serde(default)]
    v: Option<f64>, // volume
}

impl AggregateResponse {
    fn into_bars(self) -> Vec<Bar> {
        self.results
            .into_iter()
            .filter_map(|r| {
                let Some(ts) = DateTime::from_timestamp_millis(r.t) else {
                    tracing::warn!("Dropping bar with invalid timestamp {}", r.t);
                    return None;
                };
                let nan = f64::NAN;
                Some(Bar::from_raw(
                    ts.date_naive(),
                    r.o.unwrap_or(nan),
                    r.h.unwrap_or(nan),
                    r.l.unwrap_or(nan),
                    r.c.unwrap_or(nan),
                    r.v.unwrap_or(nan),
                ))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct FinancialsResponse {
    #[serde(default)]
    results: Vec<FinancialResult>,
}

#[derive(Debug, Deserialize)]
struct FinancialResult {
    fiscal_period: String,
    fiscal_year: String,
    financials: FinancialStatements,
}

#[derive(Debug, Default, Deserialize)]
struct FinancialStatements {
    #[serde(default)]
    income_statement: HashMap<String, serde_json::Value>,
    #[serde(default)]
    balance_sheet: HashMap<String, serde_json::Value>,
}

fn statement_value(statement: &HashMap<String, serde_json::Value>, key: &str) -> Option<f64> {
    statement
        .get(key)
        .and_then(|v| v.get("value"))
        .and_then(analysis_core::coerce::to_finite)
}

impl FinancialsResponse {
    fn into_financials(self, symbol: &str) -> Vec<Financials> {
        self.results
            .into_iter()
            .map(|r| {
                let income = &r.financials.income_statement;
                let balance = &r.financials.balance_sheet;

                Financials {
                    symbol: symbol.to_string(),
                    fiscal_period: r.fiscal_period,
                    fiscal_year: r.fiscal_year.parse().unwrap_or(0),
                    revenue: statement_value(income, "revenues"),
                    net_income: statement_value(income, "net_income_loss"),
                    eps: statement_value(income, "diluted_earnings_per_share")
                        .or_else(|| statement_value(income, "basic_earnings_per_share")),
                    total_assets: statement_value(balance, "assets"),
                    total_liabilities: statement_value(balance, "liabilities"),
                    shareholders_equity: statement_value(balance, "equity"),
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsResult>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    title: String,
    #[serde(default)]
    published_utc: Option<String>,
    #[serde(default)]
    publisher: Option<NewsPublisher>,
}

#[derive(Debug, Deserialize)]
struct NewsPublisher {
    name: Option<String>,
}

impl NewsResponse {
    fn into_headlines(self) -> Vec<NewsHeadline> {
        self.results
            .into_iter()
            .map(|r| NewsHeadline {
                headline: r.title,
                publisher: r.publisher.and_then(|p| p.name),
                published_utc: r
                    .published_utc
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: TickerDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerDetails {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub currency_name: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub weighted_shares_outstanding: Option<f64>,
}
