//! CLI entry point for the vacation rater.
//!
//! Provides subcommands for rating every configured city, reducing a single
//! forecast document, and listing the configured cities.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use vacation_rater::{
    config::CitiesConfig,
    error::RaterError,
    fetch::{BasicClient, HttpClient, UrlSource, auth::ApiKey, load_forecast},
    output::{ReportFormat, print_json, write_report},
    pipeline::rate_cities,
    stats::reduce,
};

#[derive(Parser)]
#[command(name = "vacation_rater")]
#[command(about = "Rank cities by how pleasant their forecast weather is", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every city's forecast, rank the cities and write the report
    Rank {
        /// JSON city list (falls back to $CITIES_CONFIG, then the built-in list)
        #[arg(short, long)]
        cities: Option<String>,

        /// Report file to write [default: report.<format extension>]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report encoding
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
        format: ReportFormat,

        /// Maximum number of concurrent forecast downloads
        #[arg(short = 'n', long, default_value_t = 5)]
        concurrency: usize,

        /// Gzip compress the report (appends .gz to the file name)
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Reduce a single forecast document from a file or URL and log its daily stats
    Reduce {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
    /// List the configured cities
    ListCities {
        /// JSON city list (falls back to $CITIES_CONFIG, then the built-in list)
        #[arg(short, long)]
        cities: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/vacation_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vacation_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            cities,
            output,
            format,
            concurrency,
            gzip,
        } => {
            let cities = load_cities(cities)?;
            let output =
                output.unwrap_or_else(|| PathBuf::from(format!("report.{}", format.extension())));
            let client = BasicClient::new()?;

            match std::env::var("WEATHER_API_KEY") {
                Ok(key) if !key.is_empty() => {
                    info!("Sending API key with forecast requests");
                    let client = ApiKey::weather(client, &key)?;
                    rank(client, cities, &output, format, concurrency, gzip).await?;
                }
                _ => rank(client, cities, &output, format, concurrency, gzip).await?,
            }
        }
        Commands::Reduce { source } => {
            let client = BasicClient::new()?;
            let doc = load_forecast(&client, &source).await?;
            let stats = reduce(&doc);

            info!(
                city = %doc.city_display_name,
                days = doc.days.len(),
                complete_days = stats.len(),
                "Forecast reduced"
            );
            print_json(&stats)?;
        }
        Commands::ListCities { cities } => {
            let cities = load_cities(cities)?;

            info!(total = cities.len(), "City list loaded");
            for city in cities.iter() {
                info!(city = %city.name, location = %city.location, "City");
            }
        }
    }

    Ok(())
}

fn load_cities(path: Option<String>) -> Result<CitiesConfig> {
    let path = path.or_else(|| std::env::var("CITIES_CONFIG").ok());
    CitiesConfig::load_or_builtin(path.as_deref())
}

/// Runs the pipeline over every configured city and writes the report.
///
/// No report is written when any city fails.
#[tracing::instrument(skip(client, cities))]
async fn rank<C: HttpClient + 'static>(
    client: C,
    cities: CitiesConfig,
    output: &Path,
    format: ReportFormat,
    concurrency: usize,
    gzip: bool,
) -> Result<()> {
    let names = cities.names();
    let source = Arc::new(UrlSource::new(client, cities));

    info!(cities = names.len(), "Starting rating run");

    let report = match rate_cities(source, &names, concurrency).await {
        Ok(report) => report,
        Err(e) => {
            report_failure(&e);
            return Err(e.into());
        }
    };

    if let Some((rank, score, leaders)) = report.rated.ranking.ranked().next() {
        info!(rank, score, leaders = ?leaders, "Most attractive");
    }

    write_report(output, &report.rows, &report.fields, format, gzip)?;
    Ok(())
}

fn report_failure(e: &RaterError) {
    error!(
        city = %e.city(),
        stage = %e.stage(),
        error = %e,
        "Rating run failed, no report written"
    );
}
