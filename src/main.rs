use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cobol_lens::config::{Config, RuntimeConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cobol-lens")]
#[command(about = "Turn COBOL sources into pseudocode, explanations and flowcharts", long_about = None)]
struct Cli {
    /// TOML config file (defaults to $COBOL_LENS_CONFIG or cobol_lens.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address, overrides config and COBOL_LENS_BIND
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG may come from .env
    Config::load_env();
    tracing_subscriber::fmt()
        .with_env_filter(RuntimeConfig::load_from_env().log_level.as_str())
        .with_ansi(false)
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_from_path(&config_path).map_err(|e| {
        error!("Failed to load configuration from {}: {:#}", config_path.display(), e);
        e
    })?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    info!(
        "Starting cobol-lens (model={}, dot={}, cache_max={})",
        config.model.name, config.flowchart.dot_command, config.cache.max_entries
    );

    let converter = cobol_lens::build_converter(&config)?;
    cobol_lens::http::start_http_server(&config, converter).await
}
