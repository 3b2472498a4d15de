//! RateCompare CLI
//!
//! Compares currency conversion offers from the configured providers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ratecompare_common::CurrencyRequest;
use ratecompare_engine::{ComparisonEngine, EngineError};
use ratecompare_providers::ProviderFactory;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod report;

use config::AppConfig;
use report::OutputFormat;

/// RateCompare CLI
#[derive(Parser, Debug)]
#[command(name = "ratecompare")]
#[command(about = "Compare currency conversion offers across providers")]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json", global = true)]
    format: OutputFormat,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask every enabled provider and report the best offer
    Compare {
        /// Source currency, e.g. USD
        #[arg(long)]
        from: String,

        /// Target currency, e.g. EUR
        #[arg(long)]
        to: String,

        /// Amount in the source currency
        #[arg(long)]
        amount: Decimal,

        /// Fail instead of returning an empty result when no provider is enabled
        #[arg(long)]
        fail_on_no_providers: bool,

        /// Overall comparison timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Check every provider's health endpoint
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let mut config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Compare {
            from,
            to,
            amount,
            fail_on_no_providers,
            timeout_ms,
        } => {
            if fail_on_no_providers {
                config.engine.fail_on_no_providers = true;
            }
            if let Some(ms) = timeout_ms {
                config.engine.overall_timeout = std::time::Duration::from_millis(ms);
            }

            let request = CurrencyRequest::parse(&from, &to, amount)
                .with_context(|| format!("invalid request {amount} {from}/{to}"))?;
            let engine = build_engine(config)?;
            compare(&engine, request, args.format).await
        }
        Command::Health => {
            let engine = build_engine(config)?;
            let report = engine.check_health().await;
            println!("{}", report::render_health(&report, args.format)?);

            if report.values().all(|healthy| *healthy) {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn build_engine(config: AppConfig) -> anyhow::Result<ComparisonEngine> {
    let providers = ProviderFactory::build(&config.providers);
    let engine = ComparisonEngine::try_new(providers, config.engine)?;
    info!(providers = engine.providers().len(), "Engine ready");
    Ok(engine)
}

async fn compare(
    engine: &ComparisonEngine,
    request: CurrencyRequest,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling comparison");
            on_signal.cancel();
        }
    });

    let result = engine
        .compare_with_cancel(request, cancel)
        .await
        .map_err(|e: EngineError| {
            error!(code = e.error_code(), "{e}");
            e
        })?;

    println!("{}", report::render_comparison(&result, format)?);

    if result.is_completed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
