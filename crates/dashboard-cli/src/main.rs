//! dashboard-cli: price, indicator, signal and headline sentiment report for one ticker.
//!
//! Usage:
//!   cargo run -p dashboard-cli -- --symbol AAPL
//!   cargo run -p dashboard-cli -- --popular TSLA --indicators "SMA (20),RSI,MACD"
//!   cargo run -p dashboard-cli -- --symbol MSFT --start 2023-01-01 --end 2023-12-31 --json

mod args;
mod render;

use analysis_orchestrator::{AnalysisOrchestrator, DashboardConfig, DashboardRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    let json_logging = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "dashboard_cli=info,analysis_orchestrator=info,polygon_client=warn".into()
    });

    // Logs go to stderr so `--json` output stays parseable.
    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        args::print_usage();
        return Ok(());
    }

    let cli = args::parse(&argv)?;
    let symbol = match args::ticker_or_exit_code(cli.symbol) {
        Ok(symbol) => symbol,
        Err(code) => {
            args::print_usage();
            std::process::exit(code);
        }
    };

    let config = DashboardConfig::from_env()?;
    let orchestrator = AnalysisOrchestrator::from_config(&config);

    let request = DashboardRequest::new(symbol, cli.start, cli.end).with_indicators(cli.indicators);
    let report = orchestrator.run(&request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::summary(&report));
    }

    Ok(())
}
