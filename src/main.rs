use crawler::CrawlOrchestrator;
use reddit_client::{ContentApi, RedditApiClient};
use snoocrawl_core::CrawlConfig;
use std::sync::Arc;

// Crawl parameters; edit and rebuild.
const SUBREDDITS: &[&str] = &["books", "ucr"];
const POST_LIMIT: u32 = 10;
const COMMENT_DEPTH: u32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("snoocrawl=info,crawler=info,reddit_client=info")
        .init();

    tracing::info!("Starting snoocrawl");

    let api = Arc::new(RedditApiClient::new(
        "snoocrawl/0.1 (bulk subreddit crawler)".to_string(),
    ));
    let orchestrator =
        CrawlOrchestrator::new(api.clone() as Arc<dyn ContentApi>, CrawlConfig::default());

    let subreddits: Vec<String> = SUBREDDITS.iter().map(|s| s.to_string()).collect();
    let data = orchestrator
        .crawl_all(&subreddits, POST_LIMIT, COMMENT_DEPTH)
        .await?;

    let submissions: usize = data.values().map(|m| m.len()).sum();
    let metrics = api.metrics().await;
    tracing::info!(
        "Crawl finished: {} submissions across {} subreddits ({} API calls, {} quota hits)",
        submissions,
        data.len(),
        metrics.total_requests,
        metrics.quota_hits
    );

    Ok(())
}
