//! Command-line entry point.

use clap::{Parser, Subcommand};
use marketdata_sync::{
    Connection, IndicatorSource, Pipeline, PipelineConfig, Stage, StoreDescriptor,
    TradingEconomicsSource, UpsertStrategy, YahooChartSource,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "marketdata-sync")]
#[command(about = "Daily market and economic-indicator sync into DuckDB and CSV", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// DuckDB file, or `:memory:`
    #[arg(long, global = true)]
    database: Option<String>,

    /// Directory for CSV exports
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Days of history to fetch
    #[arg(long, global = true)]
    lookback_days: Option<i64>,

    /// Use a single INSERT ... ON CONFLICT statement per row
    #[arg(long, global = true)]
    merge: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Indices, currencies and indicators, in that order
    Run,
    /// Index and commodity series only
    Indices,
    /// Currency pairs only
    Currencies,
    /// Scraped economic indicators only
    Indicators,
    /// List tables in the store
    Tables,
    /// Print stored rows of a table
    Show {
        table: String,
        /// Only rows with this series name
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn load_config(cli: &Cli) -> marketdata_sync::Result<PipelineConfig> {
    let base = PipelineConfig::from_env()?;
    PipelineConfig::builder()
        .lookback_days(cli.lookback_days.unwrap_or(base.lookback_days))
        .output_dir(cli.output_dir.clone().unwrap_or(base.output_dir))
        .store(
            cli.database
                .as_deref()
                .map(StoreDescriptor::parse)
                .unwrap_or(base.store),
        )
        .indicator_url(&base.indicator_url)
        .http_timeout(base.http_timeout)
        .upsert_strategy(if cli.merge {
            UpsertStrategy::Merge
        } else {
            base.upsert_strategy
        })
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("marketdata_sync={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli)?;
    tracing::debug!(store = %config.store, output_dir = %config.output_dir.display(), "configuration loaded");

    let stages: &[Stage] = match &cli.command {
        Commands::Run => &Stage::ALL,
        Commands::Indices => &[Stage::Indices],
        Commands::Currencies => &[Stage::Currencies],
        Commands::Indicators => &[Stage::Indicators],
        Commands::Tables => {
            let conn = Connection::open(&config.store)?;
            for table in conn.tables()? {
                println!("{}", table);
            }
            return Ok(());
        }
        Commands::Show { table, name, limit } => {
            let conn = Connection::open(&config.store)?;
            for row in conn.series_rows(table, name.as_deref(), Some(*limit))? {
                println!("{}", serde_json::to_string(&row)?);
            }
            return Ok(());
        }
    };

    let market = YahooChartSource::new(config.http_timeout)?;
    let indicator_source = TradingEconomicsSource::new(
        &config.indicator_url,
        config.indicator_rows.clone(),
        config.http_timeout,
    )?;
    let pipeline = Pipeline::new(config)?;

    let today = chrono::Local::now().date_naive();
    let summary = pipeline.run_stages(
        stages,
        &market,
        Some(&indicator_source as &dyn IndicatorSource),
        today,
    );
    summary.log_summary("marketdata sync");

    // Series-level failures are already logged and do not change the exit code.
    Ok(())
}
