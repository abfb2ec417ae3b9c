//! nf-desktop: run the neurofeedback loop against a synthetic headset
//!
//! Events go to the HTTP actuation endpoint, or to the log with `--dry-run`.

use anyhow::{Context, Result};
use clap::Parser;
use neurofeedback_core::acquisition::{SyntheticConfig, SyntheticSource};
use neurofeedback_core::actuation::{EventSink, HttpEventSink, LogSink};
use neurofeedback_core::{ConfigLoader, NeurofeedbackConfig, Runtime, VERSION};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nf-desktop")]
#[command(version = VERSION)]
#[command(about = "Real-time EEG neurofeedback loop", long_about = None)]
struct Cli {
    /// Configuration file (layered over defaults, below NF__* variables)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log events instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Override the actuation endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Synthetic source sample rate in Hz
    #[arg(long, default_value = "256")]
    sample_rate: f32,

    /// Stop after this many seconds of signal
    #[arg(long)]
    duration: Option<f32>,

    /// Synthetic noise seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<NeurofeedbackConfig> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_required_file(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load_validated(cli.sample_rate).context("loading configuration")?;
    if let Some(endpoint) = &cli.endpoint {
        config.actuation.endpoint = endpoint.clone();
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!(summary = ?config.get_summary(cli.sample_rate), "configuration loaded");

    let mut source = SyntheticSource::new(SyntheticConfig {
        sample_rate_hz: cli.sample_rate,
        chunk_len: config.acquisition.max_chunk_len,
        seed: cli.seed,
        duration_s: cli.duration,
        ..SyntheticConfig::default()
    })?;

    let sink: Box<dyn EventSink> = if cli.dry_run {
        Box::new(LogSink)
    } else {
        Box::new(HttpEventSink::from_config(&config.actuation)?)
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop requested");
            let _ = stop_tx.send(true);
        }
    });

    let summary = Runtime::new(config).run(&mut source, sink.as_ref(), stop_rx).await?;
    info!(?summary, "session finished");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
