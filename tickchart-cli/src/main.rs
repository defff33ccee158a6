//! tickchart CLI: serve the chart API, or render and inspect charts locally.
//!
//! Commands:
//! - `serve`: run the HTTP server (`GET /`, `GET /chart?symbol=…`)
//! - `chart`: render one symbol's candlestick chart to a PNG file
//! - `inspect`: print the cleaned bars for a symbol as JSON

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tickchart_core::config::ProviderKind;
use tickchart_core::{AppConfig, ChartParams, ChartRequest, StatusPolicy};
use tickchart_server::{bind_and_serve, init_logging, AppState};

#[derive(Parser)]
#[command(
    name = "tickchart",
    about = "tickchart: daily candlestick charts over HTTP"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chart API server.
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Interface to bind. Defaults to 0.0.0.0.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on. Defaults to 10000.
        #[arg(long)]
        port: Option<u16>,

        /// Always answer 200 and report failures only in the JSON body.
        #[arg(long, default_value_t = false)]
        envelope_status: bool,
    },
    /// Render a chart for one symbol and write it as PNG.
    Chart {
        /// Ticker symbol (e.g., AAPL, ^GSPC, BTC-USD).
        symbol: String,

        /// Output file.
        #[arg(long, short, default_value = "chart.png")]
        out: PathBuf,

        #[command(flatten)]
        chart: ChartArgs,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the cleaned bars for a symbol as JSON.
    Inspect {
        /// Ticker symbol.
        symbol: String,

        #[command(flatten)]
        chart: ChartArgs,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data provider: yahoo or csv.
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Directory of <SYMBOL>.csv exports (implies --provider csv).
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

impl ConfigArgs {
    /// File config (or defaults) with command-line overrides applied.
    fn load(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AppConfig::default(),
        };
        if let Some(dir) = &self.csv_dir {
            config.provider.csv_dir = dir.clone();
            config.provider.kind = ProviderKind::Csv;
        }
        if let Some(kind) = self.provider {
            config.provider.kind = kind;
        }
        Ok(config)
    }
}

#[derive(Args)]
struct ChartArgs {
    /// History window: 1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max.
    #[arg(long)]
    period: Option<String>,

    /// Bar size: 1d 5d 1wk 1mo 3mo.
    #[arg(long)]
    interval: Option<String>,

    /// Chart style: charles classic yahoo nightclouds binance.
    #[arg(long)]
    style: Option<String>,

    /// Draw the volume pane.
    #[arg(long, default_value_t = false)]
    volume: bool,
}

impl ChartArgs {
    fn params(&self, symbol: &str) -> ChartParams {
        ChartParams {
            symbol: Some(symbol.to_string()),
            period: self.period.clone(),
            interval: self.interval.clone(),
            style: self.style.clone(),
            volume: self.volume.then(|| "true".to_string()),
        }
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            port,
            envelope_status,
        } => {
            let mut config = config.load()?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if envelope_status {
                config.server.status_policy = StatusPolicy::Envelope;
            }
            cmd_serve(config)
        }
        Commands::Chart {
            symbol,
            out,
            chart,
            config,
        } => cmd_chart(&config.load()?, chart.params(&symbol), &out),
        Commands::Inspect {
            symbol,
            chart,
            config,
        } => cmd_inspect(&config.load()?, chart.params(&symbol)),
    }
}

fn cmd_serve(config: AppConfig) -> Result<()> {
    // The Yahoo provider's blocking client must be built outside the runtime.
    let provider = config.provider.build().context("building data provider")?;
    let state = AppState::from_config(&config, provider)?;
    let addr = config.server.address();

    tracing::info!(
        %addr,
        provider = %config.provider.kind,
        status_policy = ?config.server.status_policy,
        cleaning = %config.cleaning.policy,
        "starting chart server"
    );

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(bind_and_serve(&addr, state))?;
    Ok(())
}

fn cmd_chart(config: &AppConfig, params: ChartParams, out: &Path) -> Result<()> {
    let request = ChartRequest::from_params(params, &config.chart.defaults())?;
    let pipeline = config.pipeline()?;
    let image = pipeline.run(&request)?;

    std::fs::write(out, &image.png).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "{}: {} bars ({} received, {} dropped) -> {} ({} bytes)",
        image.symbol,
        image.bars,
        image.report.rows_received,
        image.report.invalid_rows,
        out.display(),
        image.png.len()
    );
    Ok(())
}

fn cmd_inspect(config: &AppConfig, params: ChartParams) -> Result<()> {
    let request = ChartRequest::from_params(params, &config.chart.defaults())?;
    let pipeline = config.pipeline()?;
    let normalized = pipeline.series(&request)?;

    let output = serde_json::json!({
        "symbol": normalized.series.symbol,
        "report": normalized.report,
        "bars": normalized.series.bars,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
