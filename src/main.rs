use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use podcast_site::config::Config;
use podcast_site::server;

/// Default config location (~/.config/podcast-site/config.toml).
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("podcast-site")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "podcast-site", about = "Podcast site backend: episode API and audio proxy")]
struct Args {
    /// Config file (defaults to ~/.config/podcast-site/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen address from the config file
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Override the upstream RSS feed URL
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(feed_url) = args.feed_url {
        config.feed_url = feed_url;
    }

    server::run(&config).await
}
