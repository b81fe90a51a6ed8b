use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AnalysisError, Bar, CompanyProfile, NewsHeadline};

/// Source of historical prices and company data for a ticker
#[async_trait]
pub trait SeriesLoader: Send + Sync {
    /// Daily bars between `start` and `end`, inclusive.
    async fn load_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, AnalysisError>;

    async fn load_profile(&self, symbol: &str) -> Result<CompanyProfile, AnalysisError>;
}

/// Source of recent headlines, most recent first
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_headlines(&self, symbol: &str, limit: u32) -> Result<Vec<NewsHeadline>, AnalysisError>;
}

/// Text polarity model returning one score in [-1, 1] per input text
#[async_trait]
pub trait PolarityModel: Send + Sync {
    async fn polarity(&self, texts: &[String]) -> Result<Vec<f64>, AnalysisError>;
}
