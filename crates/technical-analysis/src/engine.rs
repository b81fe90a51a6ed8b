use analysis_core::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::indicators::{self, Series};

/// Indicators the dashboard can overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma { window: usize },
    Ema { window: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
}

impl IndicatorKind {
    pub const SMA_20: IndicatorKind = IndicatorKind::Sma { window: 20 };
    pub const EMA_20: IndicatorKind = IndicatorKind::Ema { window: 20 };
    pub const RSI_14: IndicatorKind = IndicatorKind::Rsi { period: 14 };
    pub const MACD_12_26_9: IndicatorKind = IndicatorKind::Macd { fast: 12, slow: 26, signal: 9 };

    /// Selection used when the user picks nothing.
    pub fn default_selection() -> Vec<IndicatorKind> {
        vec![Self::SMA_20, Self::RSI_14]
    }

    pub fn all() -> Vec<IndicatorKind> {
        vec![Self::SMA_20, Self::EMA_20, Self::RSI_14, Self::MACD_12_26_9]
    }

    /// Parse a comma separated list such as `"SMA (20),RSI"`.
    pub fn parse_list(input: &str) -> Result<Vec<IndicatorKind>, String> {
        let mut kinds = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind: IndicatorKind = part.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma { window } => write!(f, "SMA ({})", window),
            IndicatorKind::Ema { window } => write!(f, "EMA ({})", window),
            IndicatorKind::Rsi { .. } => write!(f, "RSI"),
            IndicatorKind::Macd { .. } => write!(f, "MACD"),
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "sma20" | "sma" => Ok(Self::SMA_20),
            "ema20" | "ema" => Ok(Self::EMA_20),
            "rsi" | "rsi14" => Ok(Self::RSI_14),
            "macd" => Ok(Self::MACD_12_26_9),
            _ => Err(format!("Unknown indicator '{}' (expected SMA (20), EMA (20), RSI or MACD)", s)),
        }
    }
}

/// Output for one requested indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorValues {
    Line { values: Series },
    Convergence { primary: Series, signal: Series },
    /// The indicator was requested but could not be computed.
    Unavailable { reason: String },
}

/// Derived series aligned with the price axis. A kind missing from
/// `entries` was never requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub dates: Vec<NaiveDate>,
    #[serde(serialize_with = "entries_by_label")]
    pub entries: BTreeMap<IndicatorKind, IndicatorValues>,
}

// JSON object keys must be strings, so entries are keyed by their label.
fn entries_by_label<S>(entries: &BTreeMap<IndicatorKind, IndicatorValues>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(entries.iter().map(|(kind, values)| (kind.to_string(), values)))
}

impl IndicatorSet {
    pub fn get(&self, kind: &IndicatorKind) -> Option<&IndicatorValues> {
        self.entries.get(kind)
    }

    /// Single-line series for `kind`, if requested and computed.
    pub fn line(&self, kind: &IndicatorKind) -> Option<&Series> {
        match self.entries.get(kind)? {
            IndicatorValues::Line { values } => Some(values),
            _ => None,
        }
    }

    /// First requested oscillator entry.
    pub fn oscillator(&self) -> Option<&IndicatorValues> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, IndicatorKind::Rsi { .. }))
            .map(|(_, v)| v)
    }

    /// First requested convergence entry.
    pub fn convergence(&self) -> Option<&IndicatorValues> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, IndicatorKind::Macd { .. }))
            .map(|(_, v)| v)
    }
}

/// Computes requested indicators over the close column.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, series: &PriceSeries, kinds: &[IndicatorKind]) -> IndicatorSet {
        let closes = series.closes();
        let mut entries = BTreeMap::new();

        for kind in kinds {
            let values = Self::compute_one(&closes, *kind);
            if let IndicatorValues::Unavailable { reason } = &values {
                tracing::warn!("{} unavailable: {}", kind, reason);
            }
            entries.insert(*kind, values);
        }

        tracing::debug!("Computed {} indicators over {} rows", entries.len(), closes.len());

        IndicatorSet {
            dates: series.dates(),
            entries,
        }
    }

    fn compute_one(closes: &[Option<f64>], kind: IndicatorKind) -> IndicatorValues {
        match kind {
            IndicatorKind::Sma { window } if window > 0 => IndicatorValues::Line {
                values: indicators::sma(closes, window),
            },
            IndicatorKind::Ema { window } if window > 0 => IndicatorValues::Line {
                values: indicators::ema(closes, window),
            },
            IndicatorKind::Rsi { period } if period > 0 => IndicatorValues::Line {
                values: indicators::rsi(closes, period),
            },
            IndicatorKind::Macd { fast, slow, signal } => match indicators::macd(closes, fast, slow, signal) {
                Some(result) => IndicatorValues::Convergence {
                    primary: result.macd_line,
                    signal: result.signal_line,
                },
                None => IndicatorValues::Unavailable {
                    reason: format!("invalid MACD periods ({}, {}, {})", fast, slow, signal),
                },
            },
            other => IndicatorValues::Unavailable {
                reason: format!("{} requires a non-zero window", other),
            },
        }
    }
}
