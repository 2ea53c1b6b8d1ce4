use anyhow::Context;
use clap::Parser;
use colored::*;
use repo_stars::cli::Cli;
use repo_stars::flow::{show_stars, Flow};
use repo_stars::github::{GitHubClient, ReqwestTransport};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let repos = cli.repositories()?;

    println!("{}", "GitHub Repository Stars".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let transport = ReqwestTransport::new(cli.timeout())
        .context("Failed to build HTTP client")?;
    let client = GitHubClient::with_transport(Arc::new(transport), cli.api_url.clone());

    let flow = Flow::new(client, cli.flow_config())
        .await
        .context("Failed to start flow")?;

    if cli.clear_cache {
        flow.clear_cache().await.context("Failed to clear cache")?;
        println!("{}", "Cleared cached results".yellow());
    }

    let result = show_stars(&flow, &repos).await;
    flow.shutdown();

    let report = result.context("show_stars failed")?;
    for item in &report {
        println!(
            "{}: {} stars",
            item.repo.to_string().bold(),
            item.stars.to_string().yellow()
        );
    }

    Ok(())
}
