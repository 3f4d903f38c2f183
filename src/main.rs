//! Stockcast CLI
//!
//! Forecast a single stock, rank the candidate universe for an investment,
//! and review saved predictions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stockcast::application::client::ForecastClient;
use stockcast::config::Config;
use stockcast::domain::history::PredictionRecord;
use stockcast::domain::repositories::PredictionRepository;
use stockcast::infrastructure::ServiceFactory;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Stock price forecasting and recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast the next closes for one symbol
    Predict {
        /// Exchange-qualified symbol, e.g. TCS.NS
        symbol: String,

        /// Save the outcome under this user
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Rank candidate symbols by expected profit
    Recommend {
        /// Amount to invest
        #[arg(short, long)]
        amount: f64,

        /// Holding period in days
        #[arg(short, long, default_value = "30")]
        days: u32,

        /// Save the top pick under this user
        #[arg(short, long)]
        user: Option<String>,

        /// Number of ranked entries to display
        #[arg(short, long, default_value = "5")]
        top: usize,
    },
    /// Show saved predictions for a user
    History {
        #[arg(short, long)]
        user: String,

        /// Records per kind (defaults to HISTORY_LIMIT)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List the candidate universe
    Symbols,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load config")?;

    let provider = ServiceFactory::create_provider(&config);
    let client = ForecastClient::from_config(provider, &config);

    match cli.command {
        Commands::Predict { symbol, user } => {
            let symbol = symbol.trim().to_uppercase();
            info!("Forecasting {}...", symbol);

            let forecast = match client.forecast(&symbol).await {
                Ok(forecast) => forecast,
                Err(e) => {
                    eprintln!("❌ No forecast for {} ({}): {}", symbol, e.tag(), e);
                    return Ok(());
                }
            };

            println!("{}", "=".repeat(60));
            println!("📈 {} - next {} closes", symbol, forecast.horizon_days());
            println!("{}", "=".repeat(60));
            for (day, price) in forecast.predicted.iter().enumerate() {
                let actual = forecast
                    .actual
                    .get(day)
                    .map(|a| format!("{:>12.2}", a))
                    .unwrap_or_default();
                println!("Day {:>3}: {:>12.2}   recent {}", day + 1, price, actual);
            }
            println!("Projected change: {:+.2}", forecast.projected_change());
            println!("Calibration: {:?}", forecast.calibration);

            if let Some(user) = user {
                let repository = ServiceFactory::create_repository(&config).await?;
                let record = PredictionRecord::single(
                    &user,
                    forecast.ticker(),
                    forecast.horizon_days(),
                    forecast.projected_change(),
                );
                save_record(repository.as_ref(), &record).await;
            }
        }
        Commands::Recommend {
            amount,
            days,
            user,
            top,
        } => {
            let ranked = match client.recommend(amount, days).await {
                Ok(ranked) => ranked,
                Err(e) => {
                    eprintln!("❌ {}", e);
                    return Ok(());
                }
            };

            println!("{}", "=".repeat(60));
            println!("💰 Investing {:.2} for {} days", amount, days);
            println!("{}", "=".repeat(60));
            if ranked.is_empty() {
                println!("No candidate had usable price history.");
                return Ok(());
            }

            println!(
                "{:<4} {:<12} {:>12} {:>12} {:>12} {:>8}",
                "#", "Ticker", "Current", "Predicted", "Profit", "Return"
            );
            for (rank, entry) in ranked.iter().take(top).enumerate() {
                println!(
                    "{:<4} {:<12} {:>12.2} {:>12.2} {:>12.2} {:>7.2}%",
                    rank + 1,
                    entry.ticker(),
                    entry.current_price,
                    entry.predicted_price,
                    entry.profit,
                    entry.return_pct(amount)
                );
            }

            if let (Some(user), Some(best)) = (user, ranked.first()) {
                let repository = ServiceFactory::create_repository(&config).await?;
                let record =
                    PredictionRecord::recommendation(&user, best.ticker(), amount, days, best.profit);
                save_record(repository.as_ref(), &record).await;
            }
        }
        Commands::History { user, limit } => {
            let repository: Arc<dyn PredictionRepository> =
                ServiceFactory::create_repository(&config).await?;
            let limit = limit.unwrap_or(config.persistence.history_limit);
            let records = repository.history(&user, limit).await?;

            if records.is_empty() {
                println!("No saved predictions for {}.", user);
                return Ok(());
            }

            println!(
                "{:<20} {:<15} {:<12} {:>6} {:>12} {:>12}",
                "When", "Kind", "Symbol", "Days", "Invested", "Profit"
            );
            for record in records {
                let invested = record
                    .kind
                    .investment_amount()
                    .map(|a| format!("{:.2}", a))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<20} {:<15} {:<12} {:>6} {:>12} {:>12.2}",
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.kind.as_str(),
                    record.symbol,
                    record.kind.horizon_days(),
                    invested,
                    record.predicted_profit
                );
            }
        }
        Commands::Symbols => {
            for symbol in client.candidates() {
                println!("{}", symbol);
            }
        }
    }

    Ok(())
}

/// A failed save never fails the command; the prediction was already shown.
async fn save_record(repository: &dyn PredictionRepository, record: &PredictionRecord) {
    match repository.save(record).await {
        Ok(()) => info!("Saved {} prediction for {}", record.kind.as_str(), record.user_id),
        Err(e) => warn!("Failed to save prediction: {:#}", e),
    }
}
