use analysis_core::SentimentReport;
use analysis_orchestrator::DashboardReport;
use fundamental_analysis::FundamentalsDisplay;
use std::fmt::Write;
use technical_analysis::IndicatorValues;

/// Trailing rows shown in the price table.
const TABLE_ROWS: usize = 5;

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Plain-text dashboard for a terminal.
pub fn summary(report: &DashboardReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, report: &DashboardReport) -> std::fmt::Result {
    match &report.company_name {
        Some(name) => writeln!(out, "{} ({})  {} to {}", report.ticker, name, report.start, report.end)?,
        None => writeln!(out, "{}  {} to {}", report.ticker, report.start, report.end)?,
    }
    if let (Some(first), Some(last)) = (report.prices.first_date(), report.prices.last_date()) {
        writeln!(out, "{} trading days, {} to {}", report.prices.len(), first, last)?;
    }
    writeln!(
        out,
        "Latest close: {} | Period high: {} | Period low: {}",
        num(report.metrics.latest_close),
        num(report.metrics.period_high),
        num(report.metrics.period_low)
    )?;

    writeln!(out, "\nFundamentals")?;
    for (label, value) in report.fundamentals.display_rows() {
        writeln!(out, "  {:<12} {}", label, value)?;
    }

    writeln!(out, "\nSignals")?;
    if let Some(signal) = report.signals.oscillator {
        writeln!(out, "  {}", signal.to_label())?;
    }
    if let Some(signal) = report.signals.crossover {
        writeln!(out, "  {}", signal.to_label())?;
    }
    if report.signals.oscillator.is_none() && report.signals.crossover.is_none() {
        writeln!(out, "  Add RSI or MACD to see signals")?;
    }

    writeln!(out, "\nNews sentiment")?;
    match &report.sentiment {
        SentimentReport::Unavailable { reason } => writeln!(out, "  Unavailable: {}", reason)?,
        SentimentReport::Scored { items } if items.is_empty() => writeln!(out, "  No recent headlines")?,
        SentimentReport::Scored { items } => {
            for item in items {
                write!(out, "  [{:<8} {:+.2}] {}", item.bucket, item.polarity, item.headline)?;
                if let Some(publisher) = &item.publisher {
                    write!(out, " ({})", publisher)?;
                }
                writeln!(out)?;
            }
        }
    }

    write_table(out, report)
}

fn write_table(out: &mut String, report: &DashboardReport) -> std::fmt::Result {
    let dates = report.prices.dates();
    let closes = report.prices.closes();

    let mut columns: Vec<(String, &[Option<f64>])> = Vec::new();
    for (kind, values) in &report.indicators.entries {
        match values {
            IndicatorValues::Line { values } => columns.push((kind.to_string(), values.as_slice())),
            IndicatorValues::Convergence { primary, signal } => {
                columns.push((kind.to_string(), primary.as_slice()));
                columns.push((format!("{} signal", kind), signal.as_slice()));
            }
            IndicatorValues::Unavailable { .. } => {}
        }
    }

    writeln!(out, "\nRecent rows")?;
    write!(out, "  {:<10} {:>10}", "Date", "Close")?;
    for (label, _) in &columns {
        write!(out, " {:>12}", label)?;
    }
    writeln!(out)?;

    let first = dates.len().saturating_sub(TABLE_ROWS);
    for i in first..dates.len() {
        write!(out, "  {:<10} {:>10}", dates[i], num(closes[i]))?;
        for (_, values) in &columns {
            write!(out, " {:>12}", num(values.get(i).copied().flatten()))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
