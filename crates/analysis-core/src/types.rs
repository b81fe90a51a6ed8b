use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coerce::lenient_f64;
use crate::AnalysisError;

/// One trading day of OHLCV data as delivered by a loader.
///
/// Numeric columns are optional: providers occasionally hand back nulls,
/// strings or non-finite numbers, and those are coerced to `None` on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
}

impl Bar {
    /// Build a bar from raw provider numbers, dropping anything non-finite.
    pub fn from_raw(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            date,
            open: finite(open),
            high: finite(high),
            low: finite(low),
            close: finite(close),
            volume: finite(volume),
        }
    }
}

/// Date-ascending price table with strictly increasing dates and at least one
/// finite close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Normalize loader output into a series.
    ///
    /// Rows are sorted by date and a duplicated date keeps its last row. Fails
    /// with [`AnalysisError::MissingData`] when there is nothing to analyze.
    pub fn from_bars(mut bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        if bars.is_empty() {
            return Err(AnalysisError::MissingData("price table has no rows".to_string()));
        }

        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }

        if deduped.iter().all(|b| b.close.is_none()) {
            return Err(AnalysisError::MissingData(
                "close column contains no numeric values".to_string(),
            ));
        }

        Ok(Self { bars: deduped })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<Option<f64>> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Last defined close in the table.
    pub fn latest_close(&self) -> Option<f64> {
        self.bars.iter().rev().find_map(|b| b.close)
    }

    /// Highest `high` over the whole period.
    pub fn period_high(&self) -> Option<f64> {
        self.bars.iter().filter_map(|b| b.high).reduce(f64::max)
    }

    /// Lowest `low` over the whole period.
    pub fn period_low(&self) -> Option<f64> {
        self.bars.iter().filter_map(|b| b.low).reduce(f64::min)
    }
}

/// Headline as supplied by a news source, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub headline: String,
    pub publisher: Option<String>,
    #[serde(default)]
    pub published_utc: Option<DateTime<Utc>>,
}

/// Company financials for one fiscal period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Financials {
    pub symbol: String,
    pub fiscal_period: String,
    pub fiscal_year: i32,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shareholders_equity: Option<f64>,
}

impl Financials {
    pub fn is_quarterly(&self) -> bool {
        self.fiscal_period.starts_with('Q')
    }
}

/// What a loader knows about the company besides prices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    /// Most recent period first.
    pub financials: Vec<Financials>,
    pub market_cap: Option<f64>,
}

/// Headline ratios shown next to the chart. Every field is optional and
/// renders as `N/A` when the provider could not supply its inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub trailing_pe: Option<f64>,
    pub trailing_eps: Option<f64>,
    /// Return on equity as a fraction (0.25 == 25%).
    pub return_on_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub price_to_book: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Latest close, period high and period low.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceMetrics {
    pub latest_close: Option<f64>,
    pub period_high: Option<f64>,
    pub period_low: Option<f64>,
}

impl PriceMetrics {
    pub fn from_series(series: &PriceSeries) -> Self {
        Self {
            latest_close: series.latest_close(),
            period_high: series.period_high(),
            period_low: series.period_low(),
        }
    }
}

/// Momentum oscillator reading. Entering a zone is reported separately from
/// staying in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorSignal {
    EnteredOverbought,
    SustainedOverbought,
    EnteredOversold,
    SustainedOversold,
    Neutral,
    Unavailable,
}

/// Coarse zone of an oscillator reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorZone {
    Overbought,
    Oversold,
    Neutral,
}

impl OscillatorSignal {
    /// `None` when the signal is unavailable.
    pub fn zone(&self) -> Option<OscillatorZone> {
        match self {
            OscillatorSignal::EnteredOverbought | OscillatorSignal::SustainedOverbought => {
                Some(OscillatorZone::Overbought)
            }
            OscillatorSignal::EnteredOversold | OscillatorSignal::SustainedOversold => {
                Some(OscillatorZone::Oversold)
            }
            OscillatorSignal::Neutral => Some(OscillatorZone::Neutral),
            OscillatorSignal::Unavailable => None,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            OscillatorSignal::EnteredOverbought => "RSI just entered overbought zone, caution advised",
            OscillatorSignal::SustainedOverbought => "RSI remains overbought",
            OscillatorSignal::EnteredOversold => "RSI just entered oversold zone, potential buying opportunity",
            OscillatorSignal::SustainedOversold => "RSI remains oversold",
            OscillatorSignal::Neutral => "RSI indicates neutral market condition",
            OscillatorSignal::Unavailable => "RSI unavailable (insufficient history)",
        }
    }
}

/// Primary/signal line crossover between the previous and latest points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverSignal {
    BullishCrossover,
    BearishCrossover,
    NoCrossover,
    Unavailable,
}

impl CrossoverSignal {
    pub fn to_label(&self) -> &'static str {
        match self {
            CrossoverSignal::BullishCrossover => "Bullish MACD crossover detected, trend reversal likely upward",
            CrossoverSignal::BearishCrossover => "Bearish MACD crossover detected, possible downward trend",
            CrossoverSignal::NoCrossover => "MACD trend stable, no crossover detected",
            CrossoverSignal::Unavailable => "MACD unavailable",
        }
    }
}

/// Sentiment bucket of a single headline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBucket {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentBucket::Positive => "positive",
            SentimentBucket::Neutral => "neutral",
            SentimentBucket::Negative => "negative",
        };
        f.pad(s)
    }
}

/// A scored headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub publisher: Option<String>,
    pub polarity: f64,
    pub bucket: SentimentBucket,
}

/// Outcome of the sentiment section. `Unavailable` never fails the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SentimentReport {
    Scored { items: Vec<NewsItem> },
    Unavailable { reason: String },
}

impl SentimentReport {
    pub fn items(&self) -> &[NewsItem] {
        match self {
            SentimentReport::Scored { items } => items,
            SentimentReport::Unavailable { .. } => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SentimentReport::Scored { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bar(d: u32, close: Option<f64>) -> Bar {
        Bar { date: day(d), open: close, high: close.map(|c| c + 1.0), low: close.map(|c| c - 1.0), close, volume: Some(1000.0) }
    }

    #[test]
    fn test_empty_series_is_missing_data() {
        let err = PriceSeries::from_bars(vec![]).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingData(_)));
    }

    #[test]
    fn test_all_missing_closes_is_missing_data() {
        let err = PriceSeries::from_bars(vec![bar(1, None), bar(2, None)]).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingData(_)));
    }

    #[test]
    fn test_rows_sorted_and_deduplicated() {
        let series = PriceSeries::from_bars(vec![
            bar(3, Some(13.0)),
            bar(1, Some(11.0)),
            bar(2, Some(12.0)),
            bar(2, Some(12.5)),
        ])
        .unwrap();

        assert_eq!(series.dates(), vec![day(1), day(2), day(3)]);
        assert_eq!(series.closes(), vec![Some(11.0), Some(12.5), Some(13.0)]);
    }

    #[test]
    fn test_price_metrics() {
        let series = PriceSeries::from_bars(vec![
            bar(1, Some(10.0)),
            bar(2, Some(14.0)),
            bar(3, Some(12.0)),
            bar(4, None),
        ])
        .unwrap();
        let metrics = PriceMetrics::from_series(&series);

        assert_eq!(metrics.latest_close, Some(12.0));
        assert_eq!(metrics.period_high, Some(15.0));
        assert_eq!(metrics.period_low, Some(9.0));
    }

    #[test]
    fn test_from_raw_drops_non_finite() {
        let b = Bar::from_raw(day(1), 1.0, f64::NAN, 0.5, f64::INFINITY, 10.0);
        assert_eq!(b.high, None);
        assert_eq!(b.close, None);
        assert_eq!(b.open, Some(1.0));
    }

    #[test]
    fn test_oscillator_zone() {
        assert_eq!(OscillatorSignal::EnteredOverbought.zone(), Some(OscillatorZone::Overbought));
        assert_eq!(OscillatorSignal::SustainedOversold.zone(), Some(OscillatorZone::Oversold));
        assert_eq!(OscillatorSignal::Unavailable.zone(), None);
    }

    #[test]
    fn test_sentiment_report_serializes_with_status_tag() {
        let report = SentimentReport::Unavailable { reason: "news source down".to_string() };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "unavailable");
        assert!(report.items().is_empty());
    }
}
