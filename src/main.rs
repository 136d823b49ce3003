use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedmerge::config::Config;
use feedmerge::feed::{Aggregator, Resolver};

/// Default config file path (~/.config/feedmerge/config.toml)
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("feedmerge")
            .join("config.toml"),
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "feedmerge",
    about = "Merge RSS/Atom feeds, or pages advertising them, into one RSS 2.0 feed"
)]
struct Args {
    /// Source URLs (overrides the configured list)
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Output file for the combined feed
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file (default: ~/.config/feedmerge/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of sources resolved at once
    #[arg(short = 'j', long, value_name = "N")]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match args.config.clone().or_else(default_config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let urls = if args.urls.is_empty() {
        config.sources.clone()
    } else {
        args.urls
    };
    let output = args.output.unwrap_or_else(|| config.output.clone());
    let concurrency = args
        .concurrency
        .unwrap_or(config.max_concurrent_requests);

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .context("Failed to build HTTP client")?;
    let resolver = Resolver::new(client, config.fetch_limits());
    let mut aggregator = Aggregator::new(resolver, config.channel()).with_concurrency(concurrency);

    println!("Processing URLs...");
    aggregator
        .register_all(&urls, |registration| {
            let status = if registration.is_success() {
                "Success"
            } else {
                "Failed"
            };
            println!("{}: {}", registration.url, status);
        })
        .await;

    let written = aggregator
        .build(&output)
        .with_context(|| format!("Failed to write combined feed to {}", output.display()))?;
    println!("\nCombined feed generated: {}", written.display());

    Ok(())
}
