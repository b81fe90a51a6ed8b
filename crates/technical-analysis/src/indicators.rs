//! Indicator math over close-price series.
//!
//! Every function returns a series aligned index-for-index with its input;
//! `None` marks positions without enough history (or without a close). The
//! value at `i` only ever depends on `data[..=i]`.

/// Aligned derived series
pub type Series = Vec<Option<f64>>;

/// Simple Moving Average. Defined only where the whole window is defined.
pub fn sma(data: &[Option<f64>], period: usize) -> Series {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    for i in period - 1..data.len() {
        let window = &data[i + 1 - period..=i];
        let sum: Option<f64> = window.iter().copied().sum();
        result[i] = sum.map(|s| s / period as f64);
    }
    result
}

/// Exponential Moving Average with smoothing factor 2/(period+1), seeded by
/// the simple average of the first `period` defined values.
///
/// A missing value yields `None` at its position and leaves the running
/// average untouched.
pub fn ema(data: &[Option<f64>], period: usize) -> Series {
    let mut result = vec![None; data.len()];
    if period == 0 {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut seed_sum = 0.0;
    let mut seen = 0usize;
    let mut current: Option<f64> = None;

    for (i, value) in data.iter().enumerate() {
        let Some(v) = *value else { continue };
        current = match current {
            Some(prev) => Some((v - prev) * multiplier + prev),
            None => {
                seed_sum += v;
                seen += 1;
                (seen == period).then(|| seed_sum / period as f64)
            }
        };
        result[i] = current;
    }
    result
}

/// Relative Strength Index with Wilder smoothing, bounded to [0, 100].
///
/// Changes are taken between consecutive defined closes. The first value
/// appears once `period` changes are available; a flat stretch with neither
/// gains nor losses reads 50. Points whose averages cannot be represented
/// stay undefined.
pub fn rsi(data: &[Option<f64>], period: usize) -> Series {
    let mut result = vec![None; data.len()];
    if period == 0 {
        return result;
    }

    let n = period as f64;
    let mut prev_close: Option<f64> = None;
    let mut changes = 0usize;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, value) in data.iter().enumerate() {
        let Some(close) = *value else { continue };
        let Some(prev) = prev_close.replace(close) else { continue };

        // RSI is scale-free; halving keeps the difference of any two finite closes finite.
        let change = close / 2.0 - prev / 2.0;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        changes += 1;

        if changes <= period {
            avg_gain += gain / n;
            avg_loss += loss / n;
            if changes < period {
                continue;
            }
        } else {
            // Same as (avg * (n - 1) + x) / n without the overflowing product.
            avg_gain += (gain - avg_gain) / n;
            avg_loss += (loss - avg_loss) / n;
        }

        result[i] = rsi_from_averages(avg_gain, avg_loss);
    }
    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }
    if avg_loss <= 0.0 {
        return Some(if avg_gain <= 0.0 { 50.0 } else { 100.0 });
    }
    // 100 - 100 / (1 + g/l) == 100 * g / (g + l); normalize so g + l cannot overflow.
    let scale = avg_gain.max(avg_loss);
    let (g, l) = (avg_gain / scale, avg_loss / scale);
    let value = 100.0 * g / (g + l);
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

/// MACD (Moving Average Convergence Divergence)
#[derive(Debug, Clone, PartialEq)]
pub struct MacdResult {
    pub macd_line: Series,
    pub signal_line: Series,
}

impl MacdResult {
    /// Primary minus signal, where both are defined.
    pub fn histogram(&self) -> Series {
        self.macd_line
            .iter()
            .zip(&self.signal_line)
            .map(|(m, s)| Some((*m)? - (*s)?))
            .collect()
    }
}

/// Returns `None` when the periods cannot form a MACD (zero period or
/// `fast_period >= slow_period`).
pub fn macd(
    data: &[Option<f64>],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Option<MacdResult> {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || fast_period >= slow_period {
        return None;
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    let macd_line: Series = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let signal_line = ema(&macd_line, signal_period);

    Some(MacdResult { macd_line, signal_line })
}

/// Last two points of a series as (previous, latest).
pub fn last_pair(series: &[Option<f64>]) -> Option<(f64, f64)> {
    match series {
        [.., previous, latest] => Some(((*previous)?, (*latest)?)),
        _ => None,
    }
}
