use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use technical_analysis::IndicatorKind;

pub const POPULAR_TICKERS: &[&str] = &["AAPL", "MSFT", "GOOGL", "TSLA", "INFY.NS", "TCS.NS"];

/// Exit status when no ticker was supplied.
pub const EXIT_NO_TICKER: i32 = 2;

const DEFAULT_START: &str = "2022-01-01";
const DEFAULT_END: &str = "2024-12-31";

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// `None` when neither `--symbol` nor `--popular` was given.
    pub symbol: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub indicators: Vec<IndicatorKind>,
    pub json: bool,
}

fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .filter(|v| !v.starts_with("--"))
}

fn parse_date(value: &str, flag: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("{} expects YYYY-MM-DD, got {:?}", flag, value))
}

/// Parse everything after the program name.
pub fn parse(args: &[String]) -> anyhow::Result<CliArgs> {
    let popular = match value_of(args, "--popular") {
        Some(choice) => {
            let choice = choice.trim().to_uppercase();
            if !POPULAR_TICKERS.contains(&choice.as_str()) {
                bail!("--popular must be one of {}", POPULAR_TICKERS.join(", "));
            }
            Some(choice)
        }
        None => None,
    };

    // A popular pick wins over a typed ticker.
    let symbol = popular.or_else(|| {
        value_of(args, "--symbol")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
    });

    let start = parse_date(value_of(args, "--start").unwrap_or(DEFAULT_START), "--start")?;
    let end = parse_date(value_of(args, "--end").unwrap_or(DEFAULT_END), "--end")?;

    let indicators = match value_of(args, "--indicators") {
        Some(list) => IndicatorKind::parse_list(list).map_err(|e| anyhow!(e))?,
        None => IndicatorKind::default_selection(),
    };

    Ok(CliArgs {
        symbol,
        start,
        end,
        indicators,
        json: args.iter().any(|a| a == "--json"),
    })
}

/// The ticker to analyze, or the exit status to stop with when there is none.
pub fn ticker_or_exit_code(symbol: Option<String>) -> Result<String, i32> {
    symbol.ok_or_else(|| {
        tracing::warn!("Please enter a ticker symbol or pick one with --popular");
        EXIT_NO_TICKER
    })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  dashboard-cli --symbol AAPL                  Analyze a ticker");
    eprintln!("  dashboard-cli --popular TSLA                 Pick from {}", POPULAR_TICKERS.join(", "));
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --start YYYY-MM-DD     Start date (default: {})", DEFAULT_START);
    eprintln!("  --end YYYY-MM-DD       End date (default: {})", DEFAULT_END);
    eprintln!("  --indicators LIST      Comma separated: \"SMA (20)\", \"EMA (20)\", RSI, MACD");
    eprintln!("                         (default: \"SMA (20),RSI\")");
    eprintln!("  --json                 Print the full report as JSON");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&argv(&["--symbol", "aapl"])).unwrap();
        assert_eq!(args.symbol.as_deref(), Some("AAPL"));
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(args.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(args.indicators, IndicatorKind::default_selection());
        assert!(!args.json);
    }

    #[test]
    fn test_popular_overrides_symbol() {
        let args = parse(&argv(&["--symbol", "IBM", "--popular", "infy.ns", "--json"])).unwrap();
        assert_eq!(args.symbol.as_deref(), Some("INFY.NS"));
        assert!(args.json);
    }

    #[test]
    fn test_unknown_popular_is_rejected() {
        assert!(parse(&argv(&["--popular", "IBM"])).is_err());
    }

    #[test]
    fn test_missing_ticker_is_none() {
        assert_eq!(parse(&argv(&[])).unwrap().symbol, None);
        assert_eq!(parse(&argv(&["--symbol", "  "])).unwrap().symbol, None);
        assert_eq!(parse(&argv(&["--symbol", "--json"])).unwrap().symbol, None);
    }

    #[test]
    fn test_no_ticker_exits_with_code_two() {
        let args = parse(&argv(&["--json"])).unwrap();
        assert_eq!(ticker_or_exit_code(args.symbol), Err(2));

        let args = parse(&argv(&["--popular", "tcs.ns"])).unwrap();
        assert_eq!(ticker_or_exit_code(args.symbol), Ok("TCS.NS".to_string()));
    }

    #[test]
    fn test_indicator_list_and_dates() {
        let args = parse(&argv(&[
            "--symbol", "MSFT",
            "--indicators", "MACD, SMA (20)",
            "--start", "2023-03-01",
            "--end", "2023-06-30",
        ]))
        .unwrap();
        assert_eq!(args.indicators, vec![IndicatorKind::MACD_12_26_9, IndicatorKind::SMA_20]);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());

        assert!(parse(&argv(&["--indicators", "VWAP"])).is_err());
        assert!(parse(&argv(&["--start", "03/01/2023"])).is_err());
    }
}
