//! Command-line retrieval client for the GHRSST query service.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use sst_client::{
    BboxRequest, ClientConfig, FallbackMethod, PointRequest, RetrievalClient,
};
use sst_common::{parse_append, parse_date};

/// GHRSST retrieval client
#[derive(Parser, Debug)]
#[command(name = "sst-client")]
#[command(about = "Resilient client for the daily sea-surface field service")]
struct Args {
    /// Query service base URL
    #[arg(long, default_value = "http://localhost:8080", env = "GHRSST_API_URL")]
    api_url: String,

    /// Log level
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Field values at the grid cell nearest a point
    PointValue {
        #[arg(long)]
        lon: f64,

        #[arg(long)]
        lat: f64,

        /// Day to query, YYYY-MM-DD; defaults to the latest published day
        #[arg(long)]
        date: Option<String>,

        /// Comma-separated fields
        #[arg(long, default_value = "sst")]
        append: String,

        /// Substitute the nearest published day when the requested one is missing
        #[arg(long)]
        nearest: bool,
    },

    /// Mean of each field over a lon/lat rectangle
    BboxMean {
        #[arg(long)]
        lon0: f64,

        #[arg(long)]
        lat0: f64,

        #[arg(long)]
        lon1: f64,

        #[arg(long)]
        lat1: f64,

        /// Day to query, YYYY-MM-DD; defaults to the latest published day
        #[arg(long)]
        date: Option<String>,

        /// Comma-separated fields
        #[arg(long, default_value = "sst")]
        append: String,

        /// Substitute the nearest published day when the requested one is missing
        #[arg(long)]
        nearest: bool,
    },
}

fn method(nearest: bool) -> FallbackMethod {
    if nearest {
        FallbackMethod::Nearest
    } else {
        FallbackMethod::Exact
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).init();

    let mut config = ClientConfig::from_env();
    config.base_url = args.api_url.clone();
    let client = RetrievalClient::new(config).context("failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    match args.command {
        Command::PointValue {
            lon,
            lat,
            date,
            append,
            nearest,
        } => {
            let request = PointRequest {
                lon,
                lat,
                date: date.as_deref().map(parse_date).transpose()?,
                fields: parse_append(Some(&append))?,
                method: method(nearest),
            };
            let value = client.point_value(&request, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::BboxMean {
            lon0,
            lat0,
            lon1,
            lat1,
            date,
            append,
            nearest,
        } => {
            let request = BboxRequest {
                lon0,
                lat0,
                lon1,
                lat1,
                date: date.as_deref().map(parse_date).transpose()?,
                fields: parse_append(Some(&append))?,
                method: method(nearest),
            };
            let mean = client.bbox_mean(&request, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&mean)?);
        }
    }

    Ok(())
}
