//! FLUX: electricity balance probe
//!
//! Entry point. Loads configuration, initialises logging on stderr, runs
//! the probe once and prints the metric line on stdout. Any failure
//! prints a single `FATAL:` line on stderr and exits with status 1.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::info;

use flux_probe::config::AppConfig;
use flux_probe::transport::ReqwestTransport;
use flux_probe::{probe_once, MetricLine};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Scrape the dormitory electricity balance and print it as a
/// line-protocol metric.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FLUX_PROBE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Log each step and the scraped reading on stderr
    #[arg(short, long)]
    debug: bool,

    /// Override the measurement name from the config file
    #[arg(long)]
    metric_name: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args = Args::parse();
    init_logging(args.debug);

    match run(args).await {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("FATAL: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<MetricLine> {
    // Config path: CLI arg > FLUX_PROBE_CONFIG env var > default
    let (config_path, explicit) = match args
        .config
        .or_else(|| std::env::var("FLUX_PROBE_CONFIG").ok())
    {
        Some(path) => (path, true),
        None => (DEFAULT_CONFIG_PATH.to_string(), false),
    };

    let mut cfg = AppConfig::load_or_default(&config_path, explicit)?;
    if let Some(name) = args.metric_name {
        cfg.probe.metric_name = name;
    }

    info!(
        config_path = %config_path,
        login_url = %cfg.portal.login_url,
        metric = %cfg.probe.metric_name,
        "Configuration loaded"
    );

    let transport = ReqwestTransport::from_config(&cfg.probe)?;
    let line = probe_once(&cfg, transport, |name| std::env::var(name).ok()).await?;
    Ok(line)
}

/// Initialise the `tracing` subscriber. Logs go to stderr; stdout is
/// reserved for the metric line.
fn init_logging(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if debug { "flux_probe=debug" } else { "flux_probe=warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_logging = std::env::var("FLUX_PROBE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    }
}
